//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-cache`, `core-runtime`). Host applications can
//! depend on `readahead-workspace` and enable the documented features without
//! needing to wire each crate individually.

#[cfg(feature = "cache")]
pub use core_cache as cache;

#[cfg(feature = "logging")]
pub use core_runtime as runtime;
