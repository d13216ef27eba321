//! Mount requests and the `mount(2)` wrapper.

use std::path::PathBuf;

use layerinit_common::constants::PROC_DIR;
use layerinit_common::error::{LayerInitError, Result};

/// A single `mount(2)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Mount source: a device path or a pseudo-filesystem name.
    pub device: String,
    /// Mountpoint.
    pub target: PathBuf,
    /// Filesystem type.
    pub fstype: String,
    /// Filesystem-specific options.
    pub data: Option<String>,
}

impl MountRequest {
    /// Process information filesystem on `/proc`.
    #[must_use]
    pub fn procfs() -> Self {
        Self {
            device: "proc".into(),
            target: PathBuf::from(PROC_DIR),
            fstype: "proc".into(),
            data: None,
        }
    }

    /// Memory-backed tmpfs at `target`.
    #[must_use]
    pub fn tmpfs(target: impl Into<PathBuf>) -> Self {
        Self {
            device: "tmpfs".into(),
            target: target.into(),
            fstype: "tmpfs".into(),
            data: None,
        }
    }

    /// Block device `device` formatted as `fstype`, mounted at `target`.
    #[must_use]
    pub fn device(device: &str, fstype: &str, target: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            target: target.into(),
            fstype: fstype.into(),
            data: None,
        }
    }

    fn error(&self, source: std::io::Error) -> LayerInitError {
        LayerInitError::Mount {
            device: self.device.clone(),
            target: self.target.clone(),
            fstype: self.fstype.clone(),
            source,
        }
    }
}

/// Issues the `mount(2)` syscall described by `request`.
///
/// # Errors
///
/// Returns [`LayerInitError::Mount`] if the syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_filesystem(request: &MountRequest) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        Some(request.device.as_str()),
        request.target.as_path(),
        Some(request.fstype.as_str()),
        MsFlags::empty(),
        request.data.as_deref(),
    )
    .map_err(|errno| request.error(errno.into()))?;

    tracing::info!(
        device = %request.device,
        target = %request.target.display(),
        fstype = %request.fstype,
        "mounted"
    );
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_filesystem(request: &MountRequest) -> Result<()> {
    Err(request.error(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Linux required for mount operations",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procfs_targets_proc() {
        let request = MountRequest::procfs();
        assert_eq!(request.target, PathBuf::from("/proc"));
        assert_eq!(request.fstype, "proc");
        assert!(request.data.is_none());
    }

    #[test]
    fn device_keeps_source_and_type() {
        let request = MountRequest::device("/dev/sda2", "ext4", "/mnt/data");
        assert_eq!(request.device, "/dev/sda2");
        assert_eq!(request.fstype, "ext4");
        assert_eq!(request.target, PathBuf::from("/mnt/data"));
    }

    #[test]
    fn mount_error_carries_context() {
        let request = MountRequest::tmpfs("/tmp");
        let err = request.error(std::io::Error::from_raw_os_error(1));
        let message = err.to_string();
        assert!(message.contains("tmpfs"));
        assert!(message.contains("/tmp"));
    }
}
