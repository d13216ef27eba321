//! System call seam for the boot sequence.
//!
//! [`Host`] is the only way the orchestrator touches the filesystem or the
//! process image. [`LinuxHost`] is the real implementation; tests supply a
//! recording one.

use std::convert::Infallible;
use std::ffi::{CString, OsString};
use std::fs::{self, DirBuilder, OpenOptions};
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use layerinit_common::constants::WRITE_PROBE_NAME;
use layerinit_common::error::{LayerInitError, Result};

use crate::filesystem::mount::{MountRequest, mount_filesystem};

/// Operations the boot sequence performs against the running system.
pub trait Host {
    /// Returns whether `path` exists. Errors other than "not found" count as
    /// existing so that the following operation reports them.
    fn exists(&self, path: &Path) -> bool;

    /// Returns whether a file can be created and removed inside `dir`.
    fn is_writable(&self, dir: &Path) -> bool;

    /// Reads a text file.
    ///
    /// # Errors
    ///
    /// Returns [`LayerInitError::Io`] if the file cannot be read.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Recursively creates `path` with permission bits `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerInitError::Io`] if any component cannot be created.
    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()>;

    /// Performs a mount.
    ///
    /// # Errors
    ///
    /// Returns [`LayerInitError::Mount`] if the syscall fails.
    fn mount(&self, request: &MountRequest) -> Result<()>;

    /// Replaces the process image with `cmd`, passing `argv` and the current
    /// environment. Only returns on failure.
    ///
    /// # Errors
    ///
    /// Returns [`LayerInitError::Exec`] if the image could not be replaced.
    fn exec(&self, cmd: &Path, argv: &[OsString]) -> Result<Infallible>;
}

/// [`Host`] backed by real system calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxHost;

impl Host for LinuxHost {
    fn exists(&self, path: &Path) -> bool {
        !matches!(fs::metadata(path), Err(ref e) if e.kind() == io::ErrorKind::NotFound)
    }

    fn is_writable(&self, dir: &Path) -> bool {
        let probe = dir.join(WRITE_PROBE_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&probe) {
            Ok(file) => {
                drop(file);
                fs::remove_file(&probe).is_ok()
            }
            // A stale marker from an earlier boot; removing it proves write access.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => fs::remove_file(&probe).is_ok(),
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "write probe failed");
                false
            }
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| LayerInitError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()> {
        DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
            .map_err(|e| LayerInitError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    fn mount(&self, request: &MountRequest) -> Result<()> {
        mount_filesystem(request)
    }

    fn exec(&self, cmd: &Path, argv: &[OsString]) -> Result<Infallible> {
        let exec_error = |source: io::Error| LayerInitError::Exec {
            cmd: cmd.to_path_buf(),
            source,
        };
        let to_cstring = |bytes: Vec<u8>| {
            CString::new(bytes).map_err(|e| exec_error(io::Error::new(io::ErrorKind::InvalidInput, e)))
        };

        let path = to_cstring(cmd.as_os_str().as_bytes().to_vec())?;
        let args = argv
            .iter()
            .map(|arg| to_cstring(arg.as_bytes().to_vec()))
            .collect::<Result<Vec<_>>>()?;
        let env = std::env::vars_os()
            .map(|(key, value)| {
                let mut entry = key.into_vec();
                entry.push(b'=');
                entry.extend_from_slice(value.as_bytes());
                to_cstring(entry)
            })
            .collect::<Result<Vec<_>>>()?;

        nix::unistd::execve(&path, &args, &env).map_err(|errno| exec_error(errno.into()))
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn exists_reports_missing_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(LinuxHost.exists(dir.path()));
        assert!(!LinuxHost.exists(&dir.path().join("absent")));
    }

    #[test]
    fn writable_probe_leaves_no_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(LinuxHost.is_writable(dir.path()));
        assert!(!dir.path().join(WRITE_PROBE_NAME).exists());
    }

    #[test]
    fn writable_probe_clears_stale_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(WRITE_PROBE_NAME), b"").expect("write marker");
        assert!(LinuxHost.is_writable(dir.path()));
        assert!(!dir.path().join(WRITE_PROBE_NAME).exists());
    }

    #[test]
    fn missing_dir_is_not_writable() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!LinuxHost.is_writable(&dir.path().join("absent")));
    }

    #[test]
    fn create_dir_all_applies_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a/b/c");
        LinuxHost.create_dir_all(&nested, 0o755).expect("mkdir");
        let mode = fs::metadata(&nested).expect("metadata").permissions().mode();
        // umask may only clear bits.
        assert_eq!(mode & 0o700, 0o700);
        assert_eq!(mode & 0o022, 0);
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = LinuxHost.read_to_string(&dir.path().join("cmdline")).unwrap_err();
        assert!(matches!(err, LayerInitError::Io { .. }));
    }

    #[test]
    fn exec_missing_binary_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cmd = dir.path().join("no-such-init");
        let argv = vec![cmd.clone().into_os_string()];
        let err = LinuxHost.exec(&cmd, &argv).unwrap_err();
        assert!(matches!(err, LayerInitError::Exec { .. }));
    }

    #[test]
    fn exec_rejects_interior_nul() {
        let cmd = Path::new("/sbin/init");
        let argv = vec![OsString::from("a\0b")];
        let err = LinuxHost.exec(cmd, &argv).unwrap_err();
        assert!(matches!(err, LayerInitError::Exec { .. }));
    }
}
