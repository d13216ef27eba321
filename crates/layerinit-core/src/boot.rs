//! The boot sequence: container gate, ordered mount stages, handoff.

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::Path;

use layerinit_common::config::Options;
use layerinit_common::constants::PROC_CMDLINE;
use layerinit_common::error::Result;
use layerinit_common::types::BootParams;

use crate::detect::VirtDetector;
use crate::handoff;
use crate::host::Host;
use crate::orchestrator::Orchestrator;

/// How the process was invoked.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    /// Local overrides, keyed like boot parameters (`layerinit.<name>`).
    pub overrides: BootParams,
    /// Arguments forwarded unchanged to the real init.
    pub args: Vec<OsString>,
}

/// Runs the whole boot sequence and hands off to the real init.
///
/// Only returns on failure; every error is fatal to the boot.
///
/// # Errors
///
/// Returns the first configuration, mount, directory-creation, or exec
/// failure.
pub fn run<H, D>(host: &H, detector: &D, invocation: &Invocation) -> Result<Infallible>
where
    H: Host + ?Sized,
    D: VirtDetector + ?Sized,
{
    let options = if detector.is_container() {
        tracing::info!("running inside a container, skipping mounts");
        Options::resolve(&invocation.overrides)?
    } else {
        prepare(host, &invocation.overrides)?
    };
    handoff::exec_init(host, &options.cmd, &invocation.args)
}

/// Performs every mount stage in dependency order and returns the options
/// they were driven by.
///
/// # Errors
///
/// Returns the first stage failure. Completed mounts are left in place.
pub fn prepare<H: Host + ?Sized>(host: &H, overrides: &BootParams) -> Result<Options> {
    let orchestrator = Orchestrator::new(host);
    orchestrator.ensure_proc()?;
    let options = orchestrator.resolve_options(overrides)?;
    orchestrator.ensure_tmp()?;
    orchestrator.mount_data(&options)?;
    let overlays = orchestrator.overlay_dirs(&options)?;
    tracing::info!(overlays, "filesystem ready");
    Ok(options)
}

/// Resolves options without touching the mount table.
///
/// The kernel command line is consulted only when `/proc` is already
/// mounted and the process is not containerized.
///
/// # Errors
///
/// Returns an error if the command line cannot be read or decoded.
pub fn inspect<H, D>(host: &H, detector: &D, overrides: &BootParams) -> Result<Options>
where
    H: Host + ?Sized,
    D: VirtDetector + ?Sized,
{
    if detector.is_container() || !host.exists(Path::new(PROC_CMDLINE)) {
        return Options::resolve(overrides);
    }
    Orchestrator::new(host).resolve_options(overrides)
}
