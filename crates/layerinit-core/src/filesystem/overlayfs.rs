//! `OverlayFS` layout for in-place writable directories.
//!
//! Each directory is overlaid onto itself: the original contents form the
//! read-only lower layer, and writes land in an upper directory under the
//! data store. For `/var/lib` with the store at `/mnt/data`:
//!
//! - upper: `/mnt/data/var/lib`
//! - work: `/mnt/data/.var/lib-work`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use layerinit_common::constants::WORK_DIR_SUFFIX;

use super::mount::MountRequest;

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Read-only lower layer (the original directory).
    pub lower_dir: PathBuf,
    /// Writable upper layer directory.
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Mountpoint; the original directory itself.
    pub target: PathBuf,
}

impl OverlayConfig {
    /// Lays out the overlay for `dir` with layers rooted at `data_root`.
    #[must_use]
    pub fn for_dir(data_root: &Path, dir: &Path) -> Self {
        let relative = dir.strip_prefix("/").unwrap_or(dir);

        let mut work_name = OsString::from(".");
        work_name.push(relative.as_os_str());
        work_name.push(WORK_DIR_SUFFIX);

        Self {
            lower_dir: dir.to_path_buf(),
            upper_dir: data_root.join(relative),
            work_dir: data_root.join(work_name),
            target: dir.to_path_buf(),
        }
    }

    /// Overlay mount options string.
    #[must_use]
    pub fn options(&self) -> String {
        format!(
            "lowerdir={},upperdir={},workdir={}",
            self.lower_dir.display(),
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }

    /// The `mount(2)` call that activates this overlay.
    #[must_use]
    pub fn mount_request(&self) -> MountRequest {
        MountRequest {
            device: "overlay".into(),
            target: self.target.clone(),
            fstype: "overlay".into(),
            data: Some(self.options()),
        }
    }
}
