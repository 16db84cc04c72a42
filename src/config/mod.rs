//! Runtime-settable knobs shared by [`crate::dict`], [`crate::intset`] and
//! [`crate::hash_object`].
//!
//! All of these mirror an embedder's startup configuration: a hash seed that
//! must be set once before the first [`crate::dict::Dict`] mutation, the
//! resize policy, and the thresholds at which a [`crate::hash_object::HashObject`]
//! gives up its packed representation.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// Minimum bucket-array size for a [`crate::dict::Dict`] table, and the floor
/// a shrink will never go below.
pub const INITIAL_SIZE: usize = 4;

/// Default ratio beyond which a resize-disabled dict is still forced to grow.
pub const DEFAULT_FORCE_RESIZE_RATIO: u32 = 5;

/// Default `used / buckets` ratio below which a [`crate::hash_object::HashObject`]
/// requests that its backing dict shrink.
pub const DEFAULT_SHRINK_RATIO: f64 = 1.0 / 10.0;

static HASH_SEED: OnceCell<[u8; 16]> = OnceCell::new();
static DICT_CAN_RESIZE: AtomicBool = AtomicBool::new(true);
static DICT_FORCE_RESIZE_RATIO: AtomicU32 = AtomicU32::new(DEFAULT_FORCE_RESIZE_RATIO);
static MAX_PACKED_ENTRIES: AtomicUsize = AtomicUsize::new(128);
static MAX_PACKED_VALUE: AtomicUsize = AtomicUsize::new(64);

/// Sets the process-wide hash seed.
///
/// One-shot: the first call wins, later calls are silently ignored. This
/// matches the spec's requirement that the seed "must be fully initialized
/// before the first Dict mutation" without introducing a panic path for
/// embedders that call it more than once (e.g. in tests that share a process).
pub fn set_hash_seed(seed: [u8; 16]) {
    let _ = HASH_SEED.set(seed);
}

/// Returns the current hash seed, defaulting to all-zero bytes if never set.
pub fn hash_seed() -> [u8; 16] {
    *HASH_SEED.get_or_init(|| [0u8; 16])
}

/// Enables or disables incremental resize of every [`crate::dict::Dict`] in
/// the process.
pub fn set_dict_can_resize(can_resize: bool) {
    DICT_CAN_RESIZE.store(can_resize, Ordering::Relaxed);
}

pub fn dict_can_resize() -> bool {
    DICT_CAN_RESIZE.load(Ordering::Relaxed)
}

/// Sets the `used / buckets` ratio that forces a grow even when resize is
/// disabled. Must be > 0.
pub fn set_dict_force_resize_ratio(ratio: u32) {
    assert!(ratio > 0, "dict_force_resize_ratio must be positive");
    DICT_FORCE_RESIZE_RATIO.store(ratio, Ordering::Relaxed);
}

pub fn dict_force_resize_ratio() -> u32 {
    DICT_FORCE_RESIZE_RATIO.load(Ordering::Relaxed)
}

/// Sets the entry-count threshold above which a [`crate::hash_object::HashObject`]
/// converts from PACKED to TABLE.
pub fn set_max_packed_entries(n: usize) {
    MAX_PACKED_ENTRIES.store(n, Ordering::Relaxed);
}

pub fn max_packed_entries() -> usize {
    MAX_PACKED_ENTRIES.load(Ordering::Relaxed)
}

/// Sets the byte-length threshold above which any field or value forces a
/// [`crate::hash_object::HashObject`] to convert from PACKED to TABLE.
pub fn set_max_packed_value(n: usize) {
    MAX_PACKED_VALUE.store(n, Ordering::Relaxed);
}

pub fn max_packed_value() -> usize {
    MAX_PACKED_VALUE.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_thresholds_are_runtime_settable() {
        set_max_packed_entries(7);
        set_max_packed_value(13);
        assert_eq!(max_packed_entries(), 7);
        assert_eq!(max_packed_value(), 13);
        // restore defaults so other tests in this process are unaffected
        set_max_packed_entries(128);
        set_max_packed_value(64);
    }

    #[test]
    fn force_resize_ratio_is_runtime_settable() {
        set_dict_force_resize_ratio(9);
        assert_eq!(dict_force_resize_ratio(), 9);
        set_dict_force_resize_ratio(DEFAULT_FORCE_RESIZE_RATIO);
    }
}
