//! Core functionality for GalaxyCheck property-based testing.
//!
//! Generators produce values together with a lazily explored *example
//! space*: a tree of simpler candidates, each with an identity and a distance
//! from the simplest value. Checking a property runs a state machine that
//! generates values, explores the space of every counterexample to find the
//! smallest one, and reports a replay token that reproduces it.
//!
//! ```
//! use galaxycheck_core::*;
//!
//! let prop = for_all(Gen::int32().between(0, 100).build(), |&x| x < 50);
//! let result = prop.check(&Config::default().with_seed(0)).unwrap();
//! assert_eq!(result.counterexample.map(|c| c.value), Some(50));
//! ```

pub mod check;
pub mod data;
pub mod error;
pub mod explore;
pub mod gen;
pub mod property;
pub mod replay;
pub mod resolve;
pub mod sample;
pub mod shrink;
pub mod space;

// Re-export the main types
pub use check::*;
pub use data::*;
pub use error::*;
pub use explore::*;
pub use gen::*;
pub use property::*;
pub use replay::*;
pub use resolve::*;
pub use sample::*;
pub use space::*;
