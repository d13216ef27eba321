//! Filesystem primitives used by the boot sequence.
//!
//! Provides mount requests for pseudo, block, and overlay filesystems and
//! the path layout of overlay upper and work directories.

pub mod mount;
pub mod overlayfs;
