//! System-wide constants and default paths.

/// Namespace prefix for kernel command line parameters (`layerinit.data=...`).
pub const PARAM_PREFIX: &str = "layerinit.";

/// Default mountpoint for the data store.
pub const DEFAULT_MOUNT: &str = "/mnt/data";

/// Directories converted to overlays when `dirs` is not set.
pub const DEFAULT_DIRS: &[&str] = &["/etc", "/home", "/root", "/srv", "/var"];

/// Default real init executable.
pub const DEFAULT_CMD: &str = "/lib/systemd/systemd";

/// Process information filesystem mountpoint.
pub const PROC_DIR: &str = "/proc";

/// Kernel command line, only readable once `/proc` is mounted.
pub const PROC_CMDLINE: &str = "/proc/cmdline";

/// Temporary storage area probed for writability.
pub const TMP_DIR: &str = "/tmp";

/// Kernel log device.
pub const KMSG_PATH: &str = "/dev/kmsg";

/// Permission bits for upper and work directories (`rwxr-xr-x`).
pub const OVERLAY_DIR_MODE: u32 = 0o755;

/// Suffix appended to the hidden overlay work directory name.
pub const WORK_DIR_SUFFIX: &str = "-work";

/// Name of the marker file used to probe writability.
pub const WRITE_PROBE_NAME: &str = ".layerinit-probe";

/// Application name used as the log group and in diagnostics.
pub const APP_NAME: &str = "layerinit";
