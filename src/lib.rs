//! Core in-memory engines backing a key-value server's HASH type.
//!
//! [`intset`] is a compact sorted set of integers used for small all-integer
//! hashes. [`dict`] is the general chained, incrementally-rehashing hash
//! table. [`hash_object`] sits on top of [`dict`] and picks between a
//! compact linear representation and a full [`dict::Dict`] depending on
//! how large the hash has grown.

pub mod config;
pub mod dict;
pub mod error;
pub mod hash_object;
pub mod intset;
pub mod packed_list;

pub use dict::Dict;
pub use error::{CoreError, Result};
pub use hash_object::HashObject;
pub use intset::IntSet;
