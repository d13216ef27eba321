//! Local override flags.
//!
//! Mirrors the six boot parameters for runs outside early boot (containers,
//! tests). Values go through the same decoding as the kernel command line.

use std::ffi::OsString;

use clap::Parser;
use clap::error::ErrorKind;
use layerinit_common::constants::PARAM_PREFIX;
use layerinit_common::types::BootParams;
use layerinit_core::boot::Invocation;

/// Makes a read-only root writable with overlays, then execs the real init.
#[derive(Parser, Debug, Default)]
#[command(name = "layerinit", version, about, long_about = None)]
pub struct Cli {
    /// Device backing the persistent data store.
    #[arg(long, env = "LAYERINIT_DATA")]
    pub data: Option<String>,

    /// Filesystem type of the data device.
    #[arg(long, env = "LAYERINIT_DATAFSTYPE")]
    pub datafstype: Option<String>,

    /// Mountpoint of the data store.
    #[arg(long, env = "LAYERINIT_MOUNT")]
    pub mount: Option<String>,

    /// Comma-separated directories to make writable.
    #[arg(long, env = "LAYERINIT_DIRS")]
    pub dirs: Option<String>,

    /// Real init executable.
    #[arg(long, env = "LAYERINIT_CMD")]
    pub cmd: Option<String>,

    /// Back the data store with tmpfs (true/yes/1/on, false/no/0/off).
    #[arg(
        long,
        env = "LAYERINIT_VOLATILE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub volatile: Option<String>,

    /// Print the resolved options as JSON and exit without mounting.
    #[arg(long)]
    pub print_config: bool,

    /// Arguments forwarded unchanged to the real init.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,
}

impl Cli {
    /// Overrides keyed like boot parameters.
    pub fn overrides(&self) -> BootParams {
        let mut params = BootParams::new();
        let flags = [
            ("data", &self.data),
            ("datafstype", &self.datafstype),
            ("mount", &self.mount),
            ("dirs", &self.dirs),
            ("cmd", &self.cmd),
            ("volatile", &self.volatile),
        ];
        for (name, value) in flags {
            if let Some(value) = value {
                params.set(format!("{PARAM_PREFIX}{name}"), value.as_str());
            }
        }
        params
    }

    /// Consumes the flags into a boot invocation.
    pub fn into_invocation(self) -> Invocation {
        Invocation {
            overrides: self.overrides(),
            args: self.args,
        }
    }
}

/// Parses the process arguments.
///
/// The kernel passes unrecognised command line words to init as arguments,
/// so anything that does not parse as flags is forwarded verbatim with no
/// overrides. Help and version requests print and exit, except when running
/// as init: exiting there would panic the kernel, so they are forwarded too.
pub fn parse_invocation(raw_args: Vec<OsString>, as_init: bool) -> Cli {
    match Cli::try_parse_from(&raw_args) {
        Ok(cli) => cli,
        Err(e)
            if !as_init
                && matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) =>
        {
            e.exit()
        }
        Err(e) => {
            tracing::warn!(
                error = %e.kind(),
                "arguments are not layerinit flags, forwarding them unchanged"
            );
            Cli {
                args: raw_args.into_iter().skip(1).collect(),
                ..Cli::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use layerinit_common::types::ParamValue;

    use super::*;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn flags_become_prefixed_overrides() {
        let cli = parse_invocation(
            args(&["layerinit", "--data", "/dev/sda2", "--datafstype=ext4", "--dirs", "/etc,/var"]),
            false,
        );
        let overrides = cli.overrides();
        assert_eq!(overrides.len(), 3);
        assert_eq!(overrides.get("layerinit.data"), Some(ParamValue::from("/dev/sda2")));
        assert_eq!(overrides.get("layerinit.datafstype"), Some(ParamValue::from("ext4")));
        assert_eq!(overrides.get("layerinit.dirs"), Some(ParamValue::from("/etc,/var")));
    }

    #[test]
    fn bare_volatile_means_true() {
        let cli = parse_invocation(args(&["layerinit", "--volatile"]), false);
        assert_eq!(cli.volatile.as_deref(), Some("true"));
    }

    #[test]
    fn volatile_accepts_explicit_token() {
        let cli = parse_invocation(args(&["layerinit", "--volatile=off", "single"]), false);
        assert_eq!(cli.volatile.as_deref(), Some("off"));
        assert_eq!(cli.args, args(&["single"]));
    }

    #[test]
    fn trailing_args_are_forwarded() {
        let invocation = parse_invocation(
            args(&["layerinit", "--cmd", "/sbin/init", "--", "--system", "splash"]),
            false,
        )
        .into_invocation();
        assert_eq!(invocation.args, args(&["--system", "splash"]));
        assert_eq!(
            invocation.overrides.get("layerinit.cmd"),
            Some(ParamValue::from("/sbin/init"))
        );
    }

    #[test]
    fn kernel_arguments_pass_through() {
        let cli = parse_invocation(args(&["layerinit", "single", "splash"]), false);
        assert!(cli.overrides().is_empty());
        assert_eq!(cli.args, args(&["single", "splash"]));
    }

    #[test]
    fn unparseable_arguments_pass_through() {
        let cli = parse_invocation(args(&["layerinit", "--data"]), false);
        assert!(cli.overrides().is_empty());
        assert_eq!(cli.args, args(&["--data"]));
    }

    #[test]
    fn help_and_version_are_forwarded_when_running_as_init() {
        for flag in ["--help", "-h", "--version", "-V"] {
            let cli = parse_invocation(args(&["layerinit", flag]), true);
            assert!(cli.overrides().is_empty());
            assert!(!cli.print_config);
            assert_eq!(cli.args, args(&[flag]), "flag {flag}");
        }
    }
}
