#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Errors returned when a table cannot be created or grown.
pub mod error;

/// A HashMap implementation using linear probing.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface with configurable hashers.
pub mod hash_map;

/// A hash set implementation using linear probing.
///
/// This module provides a `HashSet` that wraps the `HashTable` and provides
/// a standard set interface with configurable hashers.
pub mod hash_set;

/// The raw linear-probing table underneath the map and set.
///
/// Callers supply the hash and an equality predicate for every operation.
pub mod hash_table;

/// Default hasher builder selection.
///
/// The choice depends on the enabled features: `foldhash`, then `std`, then
/// `rustc-hash`.
pub mod hasher;

pub use error::ProbeError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::DEFAULT_CAPACITY;
pub use hash_table::HashTable;
pub use hasher::DefaultHashBuilder;
#[cfg(feature = "rustc-hash")]
pub use rustc_hash::FxBuildHasher;
