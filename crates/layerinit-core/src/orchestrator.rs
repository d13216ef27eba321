//! Mount orchestration.
//!
//! Each stage is a single pass over the system through a [`Host`]. Stages
//! never retry and never undo earlier mounts; the caller aborts the boot on
//! the first error. [`crate::boot`] fixes the order in which they run.

use std::path::Path;

use layerinit_common::config::{DataSource, Options};
use layerinit_common::constants::{OVERLAY_DIR_MODE, PROC_CMDLINE, TMP_DIR};
use layerinit_common::error::Result;
use layerinit_common::types::BootParams;

use crate::cmdline;
use crate::filesystem::mount::MountRequest;
use crate::filesystem::overlayfs::OverlayConfig;
use crate::host::Host;

/// Runs the individual mount stages against a [`Host`].
#[derive(Debug)]
pub struct Orchestrator<'a, H: Host + ?Sized> {
    host: &'a H,
}

impl<'a, H: Host + ?Sized> Orchestrator<'a, H> {
    /// Creates an orchestrator over `host`.
    pub const fn new(host: &'a H) -> Self {
        Self { host }
    }

    /// Mounts `/proc` unless the kernel command line is already visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    pub fn ensure_proc(&self) -> Result<()> {
        if self.host.exists(Path::new(PROC_CMDLINE)) {
            tracing::debug!("/proc already mounted");
            return Ok(());
        }
        tracing::info!("mounting /proc");
        self.host.mount(&MountRequest::procfs())
    }

    /// Reads the kernel command line. Requires [`Self::ensure_proc`].
    ///
    /// # Errors
    ///
    /// Returns an error if `/proc/cmdline` cannot be read or parsed.
    pub fn read_boot_params(&self) -> Result<BootParams> {
        let content = self.host.read_to_string(Path::new(PROC_CMDLINE))?;
        cmdline::parse(&content)
    }

    /// Resolves options from the kernel command line, then applies
    /// `overrides` on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the command line cannot be read or any value
    /// fails to decode.
    pub fn resolve_options(&self, overrides: &BootParams) -> Result<Options> {
        tracing::info!("reading kernel command line");
        let mut options = Options::resolve(&self.read_boot_params()?)?;
        options.apply(overrides)?;
        tracing::debug!(options = ?options, "resolved options");
        Ok(options)
    }

    /// Mounts a tmpfs on `/tmp` unless it is already writable.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    pub fn ensure_tmp(&self) -> Result<()> {
        let tmp = Path::new(TMP_DIR);
        if self.host.is_writable(tmp) {
            tracing::debug!("/tmp already writable");
            return Ok(());
        }
        tracing::info!("mounting /tmp");
        self.host.mount(&MountRequest::tmpfs(tmp))
    }

    /// Mounts the data store at `options.mount`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, before any syscall, when not volatile
    /// and the device or its filesystem type is missing. Returns a mount
    /// error if the syscall fails.
    pub fn mount_data(&self, options: &Options) -> Result<()> {
        let request = match options.data_source()? {
            DataSource::Volatile => {
                tracing::info!(mount = %options.mount.display(), "using volatile data mount");
                MountRequest::tmpfs(&options.mount)
            }
            DataSource::Device { device, fstype } => {
                tracing::info!(
                    device,
                    fstype,
                    mount = %options.mount.display(),
                    "using persistent data mount"
                );
                MountRequest::device(device, fstype, &options.mount)
            }
        };
        self.host.mount(&request)
    }

    /// Overlays every existing directory in `options.dirs`, in order.
    ///
    /// Absent directories are skipped. Returns the number of overlays
    /// mounted.
    ///
    /// # Errors
    ///
    /// Returns the first directory-creation or mount failure. Overlays
    /// mounted before it stay in place.
    pub fn overlay_dirs(&self, options: &Options) -> Result<usize> {
        let mut mounted = 0;
        for dir in &options.dirs {
            if self.overlay_dir(&options.mount, dir)? {
                mounted += 1;
            }
        }
        Ok(mounted)
    }

    fn overlay_dir(&self, data_root: &Path, dir: &Path) -> Result<bool> {
        if !self.host.exists(dir) {
            tracing::info!(dir = %dir.display(), "skipping missing directory");
            return Ok(false);
        }

        let overlay = OverlayConfig::for_dir(data_root, dir);
        tracing::info!(
            dir = %dir.display(),
            upper = %overlay.upper_dir.display(),
            work = %overlay.work_dir.display(),
            "mounting overlay filesystem"
        );
        self.host.create_dir_all(&overlay.upper_dir, OVERLAY_DIR_MODE)?;
        self.host.create_dir_all(&overlay.work_dir, OVERLAY_DIR_MODE)?;
        self.host.mount(&overlay.mount_request())?;
        Ok(true)
    }
}
