//! A compact, sorted, encoding-adaptive set of signed integers.
//!
//! An [`IntSet`] stores its elements contiguously at the narrowest width that
//! fits every element currently in the set (`i16`, `i32`, or `i64`). Inserting
//! a value that needs a wider encoding than the set currently uses widens the
//! whole set in one step; the set never narrows again, even after removals.

use std::cmp::Ordering;

use rand::Rng;

/// The storage width of an [`IntSet`]. Ordered so that `I16 < I32 < I64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Encoding {
    I16,
    I32,
    I64,
}

impl Encoding {
    /// Bytes needed to store one element at this encoding.
    pub fn width(self) -> usize {
        match self {
            Encoding::I16 => 2,
            Encoding::I32 => 4,
            Encoding::I64 => 8,
        }
    }

    /// The narrowest encoding whose signed range contains `v`.
    pub fn required(v: i64) -> Encoding {
        if v >= i16::MIN as i64 && v <= i16::MAX as i64 {
            Encoding::I16
        } else if v >= i32::MIN as i64 && v <= i32::MAX as i64 {
            Encoding::I32
        } else {
            Encoding::I64
        }
    }
}

#[derive(Debug, Clone)]
enum Contents {
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

/// A sorted set of `i64` values stored at the narrowest encoding that fits.
#[derive(Debug, Clone)]
pub struct IntSet {
    contents: Contents,
}

impl Default for IntSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Binary search with the same fast paths as the spec: empty set, past the
/// last element, and before the first element are all handled before the
/// general halving loop. On a miss, returns the position at which `v` would
/// need to be inserted to keep the slice sorted.
fn search_slice<T: Copy + Ord>(slice: &[T], v: T) -> (bool, usize) {
    let len = slice.len();
    if len == 0 {
        return (false, 0);
    }
    if v > slice[len - 1] {
        return (false, len);
    }
    if v < slice[0] {
        return (false, 0);
    }

    let mut lo = 0usize;
    let mut hi = len;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match slice[mid].cmp(&v) {
            Ordering::Equal => return (true, mid),
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
        }
    }
    (false, lo)
}

impl IntSet {
    /// An empty set at the narrowest encoding.
    pub fn new() -> Self {
        Self {
            contents: Contents::I16(Vec::new()),
        }
    }

    /// The set's current storage width.
    pub fn encoding(&self) -> Encoding {
        match &self.contents {
            Contents::I16(_) => Encoding::I16,
            Contents::I32(_) => Encoding::I32,
            Contents::I64(_) => Encoding::I64,
        }
    }

    pub fn len(&self) -> u32 {
        (match &self.contents {
            Contents::I16(v) => v.len(),
            Contents::I32(v) => v.len(),
            Contents::I64(v) => v.len(),
        }) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of the current backing storage, `length × encoding`.
    pub fn blob_size(&self) -> usize {
        self.len() as usize * self.encoding().width()
    }

    /// The element at `pos` in ascending order, if any.
    pub fn get(&self, pos: u32) -> Option<i64> {
        let pos = pos as usize;
        match &self.contents {
            Contents::I16(v) => v.get(pos).map(|&x| x as i64),
            Contents::I32(v) => v.get(pos).map(|&x| x as i64),
            Contents::I64(v) => v.get(pos).copied(),
        }
    }

    pub fn contains(&self, v: i64) -> bool {
        if Encoding::required(v) > self.encoding() {
            return false;
        }
        match &self.contents {
            Contents::I16(slice) => search_slice(slice, v as i16).0,
            Contents::I32(slice) => search_slice(slice, v as i32).0,
            Contents::I64(slice) => search_slice(slice, v).0,
        }
    }

    /// A uniformly-chosen element. Panics on an empty set, matching the
    /// spec's assumption that callers check `len()` first.
    pub fn random(&self) -> i64 {
        assert!(!self.is_empty(), "random() on an empty IntSet");
        let mut rng = rand::thread_rng();
        let idx = rng.gen_range(0, self.len());
        self.get(idx).expect("idx in [0, len) must be present")
    }

    /// Inserts `v`, returning whether it was newly added.
    ///
    /// If `v` requires a wider encoding than the set currently uses, every
    /// existing element is widened and `v` is placed at whichever end
    /// preserves sort order (front if negative, back if positive) without
    /// ever calling `search`.
    pub fn add(&mut self, v: i64) -> bool {
        let required = Encoding::required(v);
        if required > self.encoding() {
            self.upgrade_and_append(required, v);
            return true;
        }

        match &mut self.contents {
            Contents::I16(vec) => {
                let v16 = v as i16;
                let (found, pos) = search_slice(vec, v16);
                if found {
                    false
                } else {
                    vec.insert(pos, v16);
                    true
                }
            }
            Contents::I32(vec) => {
                let v32 = v as i32;
                let (found, pos) = search_slice(vec, v32);
                if found {
                    false
                } else {
                    vec.insert(pos, v32);
                    true
                }
            }
            Contents::I64(vec) => {
                let (found, pos) = search_slice(vec, v);
                if found {
                    false
                } else {
                    vec.insert(pos, v);
                    true
                }
            }
        }
    }

    /// Removes `v`, returning whether it was present. Never narrows the
    /// encoding, even if `v` was the last wide element.
    pub fn remove(&mut self, v: i64) -> bool {
        if Encoding::required(v) > self.encoding() {
            return false;
        }
        match &mut self.contents {
            Contents::I16(vec) => {
                let (found, pos) = search_slice(vec, v as i16);
                if found {
                    vec.remove(pos);
                }
                found
            }
            Contents::I32(vec) => {
                let (found, pos) = search_slice(vec, v as i32);
                if found {
                    vec.remove(pos);
                }
                found
            }
            Contents::I64(vec) => {
                let (found, pos) = search_slice(vec, v);
                if found {
                    vec.remove(pos);
                }
                found
            }
        }
    }

    /// Widens every existing element to `required` and inserts `v` at the
    /// end that keeps the set sorted (`required` is strictly wider than the
    /// current encoding, so `v` is guaranteed to be outside the current
    /// element range).
    fn upgrade_and_append(&mut self, required: Encoding, v: i64) {
        debug_assert!(required > self.encoding());
        let prepend = v < 0;
        let old_len = self.len() as usize;

        let mut widened: Vec<i64> = Vec::with_capacity(old_len + 1);
        for i in 0..old_len {
            widened.push(self.get(i as u32).expect("index within len"));
        }

        if prepend {
            let mut new_values = Vec::with_capacity(old_len + 1);
            new_values.push(v);
            new_values.extend(widened);
            self.contents = Self::pack(required, new_values);
        } else {
            widened.push(v);
            self.contents = Self::pack(required, widened);
        }
    }

    fn pack(encoding: Encoding, values: Vec<i64>) -> Contents {
        match encoding {
            Encoding::I16 => {
                Contents::I16(values.into_iter().map(|x| x as i16).collect())
            }
            Encoding::I32 => {
                Contents::I32(values.into_iter().map(|x| x as i32).collect())
            }
            Encoding::I64 => Contents::I64(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_at_i16() {
        let s = IntSet::new();
        assert_eq!(s.encoding(), Encoding::I16);
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn round_trip_membership() {
        let mut s = IntSet::new();
        assert!(s.add(42));
        assert!(s.contains(42));
        assert!(s.remove(42));
        assert!(!s.contains(42));
    }

    #[test]
    fn idempotent_add() {
        let mut a = IntSet::new();
        assert!(a.add(7));
        assert!(!a.add(7));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn sortedness_holds_across_mixed_ops() {
        let mut s = IntSet::new();
        for v in [5, -3, 100, -100, 0, 42, -42] {
            s.add(v);
        }
        s.remove(0);
        let mut prev = None;
        for i in 0..s.len() {
            let cur = s.get(i).unwrap();
            if let Some(p) = prev {
                assert!(p < cur, "{} should be < {}", p, cur);
            }
            prev = Some(cur);
        }
    }

    #[test]
    fn encoding_never_shrinks() {
        let mut s = IntSet::new();
        s.add(70000); // forces I32
        assert_eq!(s.encoding(), Encoding::I32);
        s.remove(70000);
        assert_eq!(s.len(), 0);
        assert_eq!(s.encoding(), Encoding::I32);
    }

    #[test]
    fn encoding_boundaries() {
        assert_eq!(Encoding::required(-32768), Encoding::I16);
        assert_eq!(Encoding::required(32767), Encoding::I16);
        assert_eq!(Encoding::required(-32769), Encoding::I32);
        assert_eq!(Encoding::required(32768), Encoding::I32);
        assert_eq!(Encoding::required(-2_147_483_649), Encoding::I64);
        assert_eq!(Encoding::required(2_147_483_648), Encoding::I64);
    }

    #[test]
    fn upgrade_on_positive_boundary() {
        let mut s = IntSet::new();
        assert!(s.add(32));
        assert_eq!(s.encoding(), Encoding::I16);
        assert!(s.add(65535));
        assert_eq!(s.encoding(), Encoding::I32);
        assert!(s.contains(32));
        assert!(s.contains(65535));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn upgrade_prepends_negatives() {
        let mut s = IntSet::new();
        s.add(32);
        s.add(-65535);
        assert_eq!(s.encoding(), Encoding::I32);
        assert_eq!(s.get(0), Some(-65535));
        assert_eq!(s.get(1), Some(32));
        assert!(s.contains(32));
        assert!(s.contains(-65535));
    }

    #[test]
    fn upgrade_never_calls_search_and_lands_correctly_for_i64() {
        let mut s = IntSet::new();
        s.add(1);
        s.add(i64::MAX);
        assert_eq!(s.encoding(), Encoding::I64);
        assert_eq!(s.get(0), Some(1));
        assert_eq!(s.get(1), Some(i64::MAX));

        s.add(i64::MIN);
        assert_eq!(s.get(0), Some(i64::MIN));
    }

    #[test]
    fn blob_size_tracks_encoding_and_length() {
        let mut s = IntSet::new();
        s.add(1);
        s.add(2);
        assert_eq!(s.blob_size(), 2 * Encoding::I16.width());
        s.add(100_000);
        assert_eq!(s.blob_size(), 3 * Encoding::I32.width());
    }

    #[test]
    fn random_only_returns_members() {
        let mut s = IntSet::new();
        for v in [1, 2, 3, 4, 5] {
            s.add(v);
        }
        for _ in 0..50 {
            assert!(s.contains(s.random()));
        }
    }
}
