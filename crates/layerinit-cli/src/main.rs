//! # layerinit
//!
//! First user-space process. Layers writable overlays over a read-only root
//! and then replaces itself with the real init. Success never returns:
//! the process image is gone. Any failure is logged and exits non-zero.

mod cli;
mod kmsg;
mod logging;
#[cfg(test)]
mod test_util;

use std::ffi::OsString;
use std::process::ExitCode;

use layerinit_core::boot;
use layerinit_core::detect::SystemdDetectVirt;
use layerinit_core::host::LinuxHost;

fn main() -> ExitCode {
    let dispatch = logging::init();
    tracing::dispatcher::with_default(&dispatch, || match run(std::env::args_os().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "fatal");
            ExitCode::FAILURE
        }
    })
}

fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::parse_invocation(raw_args, std::process::id() == 1);
    let detector = SystemdDetectVirt::default();

    if cli.print_config {
        let options = boot::inspect(&LinuxHost, &detector, &cli.overrides())?;
        print_config(&options.to_json()?);
        return Ok(());
    }

    match boot::run(&LinuxHost, &detector, &cli.into_invocation()) {
        Ok(never) => match never {},
        Err(e) => Err(anyhow::Error::new(e).context("boot failed")),
    }
}

#[allow(clippy::print_stdout)]
fn print_config(json: &str) {
    println!("{json}");
}
