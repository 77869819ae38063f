//! GalaxyCheck property-based testing library.
//!
//! This is the main entry point for GalaxyCheck, re-exporting the engine
//! from `galaxycheck-core`.

pub use galaxycheck_core::*;
