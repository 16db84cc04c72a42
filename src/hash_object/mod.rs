//! The polymorphic field→value map backing the HASH type.
//!
//! A [`HashObject`] starts out holding its pairs directly in a
//! [`PackedPairList`] (`PACKED`), which is cheap for the common case of a
//! hash with a handful of short fields. Once either the entry count or any
//! single field/value crosses a configured threshold, it converts once and
//! for all to a [`Dict`] (`TABLE`), and the conversion never runs in reverse,
//! matching how the reference server treats this exact tradeoff for its
//! small-collection types.

mod iter;

pub use iter::{HashIterator, IterKind};

use crate::config;
use crate::dict::Dict;
use crate::packed_list::{End, PackedPairList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Representation {
    Packed,
    Table,
}

/// A field→value map that transparently switches from a packed list to a
/// full hash table as it grows.
pub struct HashObject {
    representation: Representation,
    packed: Option<PackedPairList>,
    table: Option<Dict<Vec<u8>, Vec<u8>>>,
}

impl Default for HashObject {
    fn default() -> Self {
        Self::new()
    }
}

impl HashObject {
    /// An empty hash, starting out PACKED.
    pub fn new() -> Self {
        Self {
            representation: Representation::Packed,
            packed: Some(PackedPairList::new()),
            table: None,
        }
    }

    pub fn len(&self) -> usize {
        match self.representation {
            Representation::Packed => self.packed.as_ref().expect("packed payload").len(),
            Representation::Table => self.table.as_ref().expect("table payload").len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_packed(&self) -> bool {
        self.representation == Representation::Packed
    }

    /// Converts PACKED → TABLE right now if any byte string in `parts`
    /// exceeds `MAX_PACKED_VALUE`. A no-op once already TABLE (the
    /// conversion never runs in reverse). Exposed so callers can pre-check a
    /// field/value pair before `set` if they want to avoid growing the
    /// packed list with an oversized pair that will be converted away again
    /// on the very next operation.
    pub fn try_conversion(&mut self, parts: &[&[u8]]) {
        if self.representation == Representation::Table {
            return;
        }
        let threshold = config::max_packed_value();
        if parts.iter().any(|p| p.len() > threshold) {
            self.convert_to_table();
        }
    }

    fn convert_to_table(&mut self) {
        if self.representation == Representation::Table {
            return;
        }
        let packed = self.packed.take().expect("packed payload while PACKED");
        let mut table: Dict<Vec<u8>, Vec<u8>> = Dict::new();
        let _ = table.expand(packed.len());
        for (field, value) in packed.iter() {
            table.replace(field.clone(), value.clone());
        }
        self.table = Some(table);
        self.representation = Representation::Table;
    }

    /// The value stored under `field`, if any. Runs a rehash step when
    /// TABLE-backed, matching the spec's "every lookup runs one rehash step"
    /// rule, so `find` is therefore `&mut self` even though it only reads.
    pub fn get(&mut self, field: &[u8]) -> Option<&[u8]> {
        match self.representation {
            Representation::Packed => {
                let packed = self.packed.as_ref().expect("packed payload");
                let pos = packed.find(field)?;
                packed.value_at(pos)
            }
            Representation::Table => self
                .table
                .as_mut()
                .expect("table payload")
                .find(&field.to_vec())
                .map(Vec::as_slice),
        }
    }

    pub fn value_length(&mut self, field: &[u8]) -> usize {
        self.get(field).map(<[u8]>::len).unwrap_or(0)
    }

    pub fn exists(&mut self, field: &[u8]) -> bool {
        self.get(field).is_some()
    }

    /// Sets `field` to `value`, returning whether `field` already existed.
    /// After the write, converts PACKED → TABLE if the threshold from
    /// [`HashObject::try_conversion`] is crossed by this pair, or if the
    /// packed list has grown past `MAX_PACKED_ENTRIES`.
    pub fn set(&mut self, field: Vec<u8>, value: Vec<u8>) -> bool {
        self.try_conversion(&[field.as_slice(), value.as_slice()]);

        match self.representation {
            Representation::Packed => {
                let packed = self.packed.as_mut().expect("packed payload");
                let existed = match packed.find(&field) {
                    Some(pos) => {
                        packed.set_value_at(pos, value);
                        true
                    }
                    None => {
                        packed.push(field, value, End::Tail);
                        false
                    }
                };
                if !existed && packed.len() > config::max_packed_entries() {
                    self.convert_to_table();
                }
                existed
            }
            Representation::Table => !self.table.as_mut().expect("table payload").replace(field, value),
        }
    }

    /// Removes `field`, returning whether it was present. After a TABLE
    /// removal, requests a shrink if the table has fallen well below its
    /// load factor (see [`config::DEFAULT_SHRINK_RATIO`]); PACKED never
    /// shrinks its backing storage beyond the `Vec::remove` it already did.
    pub fn delete(&mut self, field: &[u8]) -> bool {
        match self.representation {
            Representation::Packed => {
                let packed = self.packed.as_mut().expect("packed payload");
                match packed.find(field) {
                    Some(pos) => {
                        packed.delete(pos);
                        true
                    }
                    None => false,
                }
            }
            Representation::Table => {
                let table = self.table.as_mut().expect("table payload");
                let removed = table.delete(&field.to_vec());
                if removed {
                    self.maybe_shrink();
                }
                removed
            }
        }
    }

    fn maybe_shrink(&mut self) {
        let table = self.table.as_mut().expect("table payload");
        let buckets = table.bucket_count();
        if buckets > config::INITIAL_SIZE
            && (table.len() as f64) / (buckets as f64) < config::DEFAULT_SHRINK_RATIO
        {
            let _ = table.shrink();
        }
    }

    /// Starts an iterator over every (field, value) pair. TABLE-backed
    /// iteration pins the underlying dict's rehashing for the iterator's
    /// lifetime (see [`crate::dict::Dict::safe_iter`]); the iterator must be
    /// handed back to [`HashIterator::close`] to release that pin.
    pub fn iter(&mut self) -> HashIterator {
        match self.representation {
            Representation::Packed => HashIterator::packed(),
            Representation::Table => {
                let table = self.table.as_mut().expect("table payload");
                HashIterator::table(table.safe_iter())
            }
        }
    }

    /// A single step of the stateless scan cursor, mirroring
    /// [`crate::dict::Dict::scan`]. PACKED hashes are small enough that the
    /// whole thing is delivered in one call, always returning cursor `0`.
    pub fn scan<FE>(&self, cursor: usize, mut emit: FE) -> usize
    where
        FE: FnMut(&[u8], &[u8]),
    {
        match self.representation {
            Representation::Packed => {
                for (field, value) in self.packed.as_ref().expect("packed payload").iter() {
                    emit(field, value);
                }
                0
            }
            Representation::Table => {
                self.table
                    .as_ref()
                    .expect("table payload")
                    .scan(cursor, |k, v| emit(k.as_slice(), v.as_slice()), |_| {})
            }
        }
    }
}
