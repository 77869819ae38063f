//! Structural identities for examples.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

const BASE: u64 = 0x0000_0100_0000_01b3;

/// An opaque, combinable identity for an example.
///
/// Identities behave like rolling hashes of a sequence: `combine` is
/// associative (but not commutative) and `EMPTY` is its identity element, so
/// the identity of a composite value is the fold of its parts' identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExampleId {
    hash: u64,
    scale: u64,
}

impl ExampleId {
    pub const EMPTY: ExampleId = ExampleId { hash: 0, scale: 1 };

    /// The identity of a primitive value.
    pub fn primitive<H: Hash + ?Sized>(value: &H) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        ExampleId {
            hash: mix(hasher.finish()),
            scale: BASE,
        }
    }

    pub fn combine(self, other: ExampleId) -> ExampleId {
        ExampleId {
            hash: self.hash.wrapping_mul(other.scale).wrapping_add(other.hash),
            scale: self.scale.wrapping_mul(other.scale),
        }
    }

    /// Fold many identities, left to right.
    pub fn combine_all<I: IntoIterator<Item = ExampleId>>(ids: I) -> ExampleId {
        ids.into_iter().fold(ExampleId::EMPTY, ExampleId::combine)
    }
}

impl fmt::Display for ExampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.hash)
    }
}

fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 33)).wrapping_mul(0xff51afd7ed558ccd);
    z = (z ^ (z >> 33)).wrapping_mul(0xc4ceb9fe1a85ec53);
    z ^ (z >> 33)
}
