//! # layerinit-common
//!
//! Shared types, error definitions, the boot option model, and constants
//! used across the layerinit workspace.
//!
//! This crate is the leaf of the dependency graph. It performs no system
//! calls; everything here is pure data and decoding logic.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
