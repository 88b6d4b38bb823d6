//! Space usage of a mounted filesystem.

use std::path::Path;

use sysinfo::Disks;

use crate::FilesystemUsage;

const BYTES_PER_KIB: u64 = 1024;

/// Pick the mount that holds `target`: the longest mount point that is a
/// prefix of it. Sizes are given in bytes.
pub fn best_mount<'a, I>(entries: I, target: &Path) -> Option<FilesystemUsage>
where
    I: IntoIterator<Item = (&'a Path, u64, u64)>,
{
    entries
        .into_iter()
        .filter(|(mount, _, _)| target.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
        .map(|(_, total, available)| FilesystemUsage {
            total_kib: total / BYTES_PER_KIB,
            available_kib: available / BYTES_PER_KIB,
        })
}

/// Space of the filesystem mounted at (or containing) `target`.
pub fn filesystem_usage(disks: &Disks, target: &Path) -> Option<FilesystemUsage> {
    best_mount(
        disks
            .iter()
            .map(|disk| (disk.mount_point(), disk.total_space(), disk.available_space())),
        target,
    )
}
