use crate::error::StatsError;

/// Btrfs statistics model and sysfs parsing.
pub(crate) mod btrfs;
/// Sysfs handle.
pub(crate) mod sysfs;

/// A source of btrfs filesystem statistics.
pub(crate) trait StatsSource: Send + Sync {
    /// Returns the statistics of every btrfs filesystem, or fails as a whole.
    fn stats(&self) -> Result<Vec<btrfs::Stats>, StatsError>;
}
