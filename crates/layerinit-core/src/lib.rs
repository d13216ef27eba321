//! # layerinit-core
//!
//! Turns a read-only root filesystem into a writable one and hands control
//! to the real init.
//!
//! The boot sequence is strictly ordered and single-pass:
//! 1. mount `/proc` if absent,
//! 2. resolve [`Options`](layerinit_common::config::Options) from the kernel
//!    command line,
//! 3. mount a tmpfs on `/tmp` unless it is already writable,
//! 4. mount the data store (a device, or tmpfs when volatile),
//! 5. overlay each configured directory onto itself, backed by the store,
//! 6. replace the process image with the configured init.
//!
//! Nothing is retried and nothing is rolled back. All system calls go
//! through the [`host::Host`] trait so the sequence can be exercised
//! without privileges.

pub mod boot;
pub mod cmdline;
pub mod detect;
pub mod filesystem;
pub mod handoff;
pub mod host;
pub mod orchestrator;
