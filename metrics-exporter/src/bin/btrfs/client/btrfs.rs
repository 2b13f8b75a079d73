use crate::error::{ParseValue, ReadPath, StatsError};
use snafu::ResultExt;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

/// Sysfs reports device sizes in 512-byte sectors.
const SECTOR_SIZE: u64 = 512;

/// Statistics of one btrfs filesystem.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stats {
    pub(crate) label: String,
    pub(crate) uuid: String,
    pub(crate) devices: Vec<Device>,
    pub(crate) allocation: Allocation,
}

/// A device that is part of a btrfs filesystem.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Device {
    pub(crate) name: String,
    /// Device size in bytes.
    pub(crate) size: u64,
}

/// Space allocation of a filesystem, per block group type.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Allocation {
    pub(crate) global_rsv_size: u64,
    pub(crate) data: AllocationStats,
    pub(crate) metadata: AllocationStats,
    pub(crate) system: AllocationStats,
}

impl Allocation {
    /// Get the allocation stats of the given type.
    pub(crate) fn stats(&self, allocation_type: AllocationType) -> &AllocationStats {
        match allocation_type {
            AllocationType::Data => &self.data,
            AllocationType::Metadata => &self.metadata,
            AllocationType::System => &self.system,
        }
    }

    fn stats_mut(&mut self, allocation_type: AllocationType) -> &mut AllocationStats {
        match allocation_type {
            AllocationType::Data => &mut self.data,
            AllocationType::Metadata => &mut self.metadata,
            AllocationType::System => &mut self.system,
        }
    }
}

/// Allocation stats of one block group type.
/// A layout is `None` when the filesystem holds no chunks with that profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AllocationStats {
    pub(crate) reserved_bytes: u64,
    pub(crate) single: Option<LayoutUsage>,
    pub(crate) dup: Option<LayoutUsage>,
    pub(crate) raid0: Option<LayoutUsage>,
    pub(crate) raid1: Option<LayoutUsage>,
    pub(crate) raid5: Option<LayoutUsage>,
    pub(crate) raid6: Option<LayoutUsage>,
    pub(crate) raid10: Option<LayoutUsage>,
}

impl AllocationStats {
    /// Get the usage of the given layout, if the filesystem uses it.
    pub(crate) fn layout(&self, layout: Layout) -> Option<&LayoutUsage> {
        match layout {
            Layout::Single => self.single.as_ref(),
            Layout::Dup => self.dup.as_ref(),
            Layout::Raid0 => self.raid0.as_ref(),
            Layout::Raid1 => self.raid1.as_ref(),
            Layout::Raid5 => self.raid5.as_ref(),
            Layout::Raid6 => self.raid6.as_ref(),
            Layout::Raid10 => self.raid10.as_ref(),
        }
    }

    fn layout_mut(&mut self, layout: Layout) -> &mut Option<LayoutUsage> {
        match layout {
            Layout::Single => &mut self.single,
            Layout::Dup => &mut self.dup,
            Layout::Raid0 => &mut self.raid0,
            Layout::Raid1 => &mut self.raid1,
            Layout::Raid5 => &mut self.raid5,
            Layout::Raid6 => &mut self.raid6,
            Layout::Raid10 => &mut self.raid10,
        }
    }
}

/// Space usage of one layout within a block group type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LayoutUsage {
    pub(crate) used_bytes: u64,
    pub(crate) total_bytes: u64,
    pub(crate) ratio: f64,
}

/// Block group types, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum AllocationType {
    Data,
    Metadata,
    System,
}

/// Redundancy profiles, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Layout {
    Single,
    Dup,
    Raid0,
    Raid1,
    Raid5,
    Raid6,
    Raid10,
}

impl Layout {
    /// Ratio between raw disk space and usable space for this layout.
    pub(crate) fn ratio(&self, device_count: usize) -> f64 {
        let devices = device_count as f64;
        match self {
            Layout::Single | Layout::Raid0 => 1.0,
            Layout::Dup | Layout::Raid1 | Layout::Raid10 => 2.0,
            Layout::Raid5 => devices / (devices - 1.0),
            Layout::Raid6 => devices / (devices - 2.0),
        }
    }
}

/// Reads the statistics of the filesystem exposed under `fs_path`,
/// i.e. `<sysfs>/fs/btrfs/<uuid>`.
pub(crate) fn read_stats(fs_path: &Path) -> Result<Stats, StatsError> {
    let devices = read_devices(&fs_path.join("devices"))?;

    let uuid = match read_optional_file(&fs_path.join("metadata_uuid"))? {
        Some(uuid) if !uuid.is_empty() => uuid,
        _ => fs_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let allocation_path = fs_path.join("allocation");
    let mut allocation = Allocation {
        global_rsv_size: read_value(&allocation_path.join("global_rsv_size"))?,
        ..Default::default()
    };
    for allocation_type in AllocationType::iter() {
        *allocation.stats_mut(allocation_type) = read_allocation_stats(
            &allocation_path.join(allocation_type.as_ref()),
            devices.len(),
        )?;
    }

    Ok(Stats {
        label: read_file(&fs_path.join("label"))?,
        uuid,
        devices,
        allocation,
    })
}

fn read_devices(path: &Path) -> Result<Vec<Device>, StatsError> {
    list_dir(path)?
        .into_iter()
        .map(|name| {
            let size = read_value(&path.join(&name).join("size"))?;
            Ok(Device {
                name,
                size: size.saturating_mul(SECTOR_SIZE),
            })
        })
        .collect()
}

fn read_allocation_stats(path: &Path, device_count: usize) -> Result<AllocationStats, StatsError> {
    let mut stats = AllocationStats {
        reserved_bytes: read_value(&path.join("bytes_reserved"))?,
        ..Default::default()
    };

    for entry in list_dir(path)? {
        let layout_path = path.join(&entry);
        if !layout_path.is_dir() {
            continue;
        }
        let Ok(layout) = Layout::from_str(&entry) else {
            debug!(path = %layout_path.display(), "Skipping unsupported btrfs layout");
            continue;
        };
        *stats.layout_mut(layout) = Some(LayoutUsage {
            used_bytes: read_value(&layout_path.join("used_bytes"))?,
            total_bytes: read_value(&layout_path.join("total_bytes"))?,
            ratio: layout.ratio(device_count),
        });
    }
    Ok(stats)
}

/// Lists the entry names of a directory, sorted.
pub(crate) fn list_dir(path: &Path) -> Result<Vec<String>, StatsError> {
    let mut names = fs::read_dir(path)
        .context(ReadPath { path })?
        .map(|entry| {
            entry
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .context(ReadPath { path })
        })
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

fn read_file(path: &Path) -> Result<String, StatsError> {
    fs::read_to_string(path)
        .map(|contents| contents.trim().to_string())
        .context(ReadPath { path })
}

fn read_optional_file(path: &Path) -> Result<Option<String>, StatsError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StatsError::ReadPath {
            path: PathBuf::from(path),
            source,
        }),
    }
}

fn read_value(path: &Path) -> Result<u64, StatsError> {
    let value = read_file(path)?;
    value.parse::<u64>().context(ParseValue { path, value })
}
