//! Container detection.
//!
//! Inside a container the host already owns the mount namespace, so the
//! boot sequence skips every mount stage and goes straight to the handoff.

use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Tool consulted for container detection.
pub const DETECT_VIRT: &str = "systemd-detect-virt";

/// Search path used when `PATH` is unset, as it is for the first process.
const FALLBACK_SEARCH_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Decides whether the process runs nested inside another init system.
pub trait VirtDetector {
    /// Returns `true` when running inside a container.
    fn is_container(&self) -> bool;
}

impl<F: Fn() -> bool> VirtDetector for F {
    fn is_container(&self) -> bool {
        self()
    }
}

/// Detector backed by `systemd-detect-virt --container`.
///
/// A missing or failing tool counts as "not containerized".
#[derive(Debug, Clone)]
pub struct SystemdDetectVirt {
    program: String,
}

impl SystemdDetectVirt {
    /// Creates a detector that runs `program` instead of [`DETECT_VIRT`].
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn locate(&self) -> Option<PathBuf> {
        which::which(&self.program)
            .or_else(|_| which::which_in(&self.program, Some(FALLBACK_SEARCH_PATH), "/"))
            .ok()
    }
}

impl Default for SystemdDetectVirt {
    fn default() -> Self {
        Self::with_program(DETECT_VIRT)
    }
}

impl VirtDetector for SystemdDetectVirt {
    fn is_container(&self) -> bool {
        let Some(path) = self.locate() else {
            tracing::debug!(program = %self.program, "container detection unavailable");
            return false;
        };

        match Command::new(&path)
            .args(["--container", "--quiet"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::warn!(program = %path.display(), error = %e, "container detection failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_means_not_containerized() {
        let detector = SystemdDetectVirt::with_program("layerinit-no-such-detector");
        assert!(!detector.is_container());
    }

    #[test]
    fn zero_exit_status_means_containerized() {
        assert!(SystemdDetectVirt::with_program("true").is_container());
    }

    #[test]
    fn nonzero_exit_status_means_not_containerized() {
        assert!(!SystemdDetectVirt::with_program("false").is_container());
    }

    #[test]
    fn closures_are_detectors() {
        let detector = || true;
        assert!(detector.is_container());
    }
}
