use super::{
    btrfs::{list_dir, read_stats, Stats},
    StatsSource,
};
use crate::error::{MountPoint, NotADirectory, StatsError};
use snafu::{ensure, ResultExt};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Location of the btrfs filesystems below the sysfs mount point.
const BTRFS_PATH: &str = "fs/btrfs";

/// Handle to a sysfs mount point.
#[derive(Debug, Clone)]
pub(crate) struct SysFs {
    root: PathBuf,
}

impl SysFs {
    /// Opens the sysfs mounted at `root`.
    pub(crate) fn new(root: impl Into<PathBuf>) -> Result<Self, StatsError> {
        let root = root.into();
        let metadata = fs::metadata(&root).context(MountPoint { path: &root })?;
        ensure!(metadata.is_dir(), NotADirectory { path: &root });
        Ok(Self { root })
    }

    /// Get the sysfs mount point.
    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the statistics of every mounted btrfs filesystem, ordered by uuid.
    pub(crate) fn btrfs_stats(&self) -> Result<Vec<Stats>, StatsError> {
        let btrfs_path = self.root.join(BTRFS_PATH);
        if !btrfs_path.exists() {
            debug!(path = %btrfs_path.display(), "No btrfs filesystems registered in sysfs");
            return Ok(Vec::new());
        }

        list_dir(&btrfs_path)?
            .into_iter()
            .filter(|name| name.contains('-'))
            .map(|uuid| read_stats(&btrfs_path.join(uuid)))
            .collect()
    }
}

impl StatsSource for SysFs {
    fn stats(&self) -> Result<Vec<Stats>, StatsError> {
        self.btrfs_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::btrfs::tests::{fixture_fs, write, FS_UUID};
    use tempfile::TempDir;

    #[test]
    fn open_missing_mount_point() {
        let error = SysFs::new("/nonexistent/sysfs").unwrap_err();
        assert!(matches!(error, StatsError::MountPoint { .. }));
        assert!(error.to_string().starts_with("could not read /nonexistent/sysfs"));
    }

    #[test]
    fn open_file_as_mount_point() {
        let sysfs = TempDir::new().unwrap();
        write(sysfs.path(), "not-a-dir", "");

        let error = SysFs::new(sysfs.path().join("not-a-dir")).unwrap_err();
        assert!(matches!(error, StatsError::NotADirectory { .. }));
    }

    #[test]
    fn no_btrfs_module() {
        let sysfs = TempDir::new().unwrap();
        let fs = SysFs::new(sysfs.path()).unwrap();
        assert_eq!(fs.root(), sysfs.path());
        assert!(fs.btrfs_stats().unwrap().is_empty());
    }

    #[test]
    fn lists_filesystems_by_uuid() {
        let sysfs = TempDir::new().unwrap();
        fixture_fs(sysfs.path());
        // Not a filesystem uuid.
        write(sysfs.path(), "fs/btrfs/features/raid56", "0\n");
        let second = sysfs
            .path()
            .join("fs/btrfs/00000000-0000-0000-0000-000000000001");
        for (relative, contents) in [
            ("label", "\n"),
            ("allocation/global_rsv_size", "0\n"),
            ("allocation/data/bytes_reserved", "0\n"),
            ("allocation/metadata/bytes_reserved", "0\n"),
            ("allocation/system/bytes_reserved", "0\n"),
        ] {
            write(&second, relative, contents);
        }
        fs::create_dir_all(second.join("devices")).unwrap();

        let stats = SysFs::new(sysfs.path()).unwrap().stats().unwrap();
        let uuids = stats.iter().map(|s| s.uuid.as_str()).collect::<Vec<_>>();
        assert_eq!(uuids, vec!["00000000-0000-0000-0000-000000000001", FS_UUID]);
        assert!(stats[0].devices.is_empty());
        assert_eq!(stats[0].label, "");
    }

    #[test]
    fn one_broken_filesystem_fails_all() {
        let sysfs = TempDir::new().unwrap();
        let fs_path = fixture_fs(sysfs.path());
        fs::remove_file(fs_path.join("label")).unwrap();

        assert!(SysFs::new(sysfs.path()).unwrap().stats().is_err());
    }
}
