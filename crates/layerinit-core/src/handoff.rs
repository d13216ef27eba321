//! Terminal transfer of control to the real init.
//!
//! On success the process image is replaced and nothing here returns; the
//! new program inherits PID 1 together with reaping and signal duties. There
//! is no fallback init and no spawn-and-wait substitute.

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::Path;

use layerinit_common::error::Result;

use crate::host::Host;

/// Builds the argument vector: `cmd` followed by the forwarded arguments.
#[must_use]
pub fn init_argv(cmd: &Path, args: &[OsString]) -> Vec<OsString> {
    std::iter::once(cmd.as_os_str().to_os_string())
        .chain(args.iter().cloned())
        .collect()
}

/// Replaces the current process with `cmd`, forwarding `args` unchanged and
/// inheriting the environment.
///
/// # Errors
///
/// Returns [`LayerInitError::Exec`](layerinit_common::error::LayerInitError::Exec)
/// if the image could not be replaced. The caller must treat this as fatal.
pub fn exec_init<H: Host + ?Sized>(host: &H, cmd: &Path, args: &[OsString]) -> Result<Infallible> {
    tracing::info!(cmd = %cmd.display(), args = args.len(), "executing init");
    host.exec(cmd, &init_argv(cmd, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_starts_with_cmd() {
        let argv = init_argv(Path::new("/sbin/init"), &["single".into(), "--log-level=debug".into()]);
        assert_eq!(argv, vec![
            OsString::from("/sbin/init"),
            OsString::from("single"),
            OsString::from("--log-level=debug"),
        ]);
    }

    #[test]
    fn argv_without_forwarded_args() {
        let argv = init_argv(Path::new("/lib/systemd/systemd"), &[]);
        assert_eq!(argv, vec![OsString::from("/lib/systemd/systemd")]);
    }
}
