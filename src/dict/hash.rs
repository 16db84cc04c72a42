//! The seeded keyed hash used to place keys into [`super::Dict`] buckets.
//!
//! Uses SipHash (via the `siphasher` crate) keyed from the process-wide seed
//! in [`crate::config`], so that a Dict's bucket layout can't be driven by an
//! attacker who controls key contents but not the seed.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::config;

fn keyed_hasher() -> SipHasher13 {
    let seed = config::hash_seed();
    let k0 = u64::from_le_bytes(seed[0..8].try_into().unwrap());
    let k1 = u64::from_le_bytes(seed[8..16].try_into().unwrap());
    SipHasher13::new_with_keys(k0, k1)
}

/// Case-sensitive keyed hash of `bytes`.
pub fn hash(bytes: &[u8]) -> u64 {
    let mut hasher = keyed_hasher();
    hasher.write(bytes);
    hasher.finish()
}

/// Case-insensitive (ASCII-folded) keyed hash of `bytes`.
pub fn hash_case_insensitive(bytes: &[u8]) -> u64 {
    let mut hasher = keyed_hasher();
    // Hash byte-by-byte rather than allocating a folded copy: SipHasher's
    // `write` accepts any number of calls and only the final digest matters.
    for &b in bytes {
        hasher.write_u8(b.to_ascii_lowercase());
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_folds_ascii() {
        assert_eq!(hash_case_insensitive(b"Field"), hash_case_insensitive(b"field"));
        assert_eq!(hash_case_insensitive(b"FIELD"), hash_case_insensitive(b"field"));
    }

    #[test]
    fn case_sensitive_distinguishes_case() {
        assert_ne!(hash(b"Field"), hash(b"field"));
    }

    #[test]
    fn same_bytes_same_hash() {
        assert_eq!(hash(b"abc"), hash(b"abc"));
    }
}
