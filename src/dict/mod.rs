//! A chained hash table with incremental, two-table rehashing.
//!
//! A [`Dict`] always holds two tables, `tables[0]` and `tables[1]`. Normally
//! only `tables[0]` is live. A grow or shrink allocates `tables[1]` at the
//! new size and flips the dict into "rehashing" mode (`rehash_idx >= 0`);
//! every subsequent lookup or mutation migrates a bounded number of buckets
//! from `tables[0]` into `tables[1]` before doing its own work, so no single
//! call pays for moving the whole table. Once `tables[0]` is empty the
//! tables are swapped back and rehashing ends.
//!
//! Grounded on the generic-over-`BuildHasher` shape of the teacher's
//! `index/hash` table, but the storage itself is separate chaining rather
//! than open addressing. The incremental rehash this spec requires needs
//! two independently-addressable tables live at once, which doesn't fit an
//! open-addressing probe sequence.

mod hash;
mod iter;
mod scan;

pub use iter::{SafeIter, UnsafeIter};

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::config;
use crate::error::{CoreError, Result};

static TABLE_ID_SOURCE: AtomicU64 = AtomicU64::new(1);

fn next_table_id() -> u64 {
    TABLE_ID_SOURCE.fetch_add(1, Ordering::Relaxed)
}

struct Entry<K, V> {
    key: K,
    value: V,
    next: Option<Box<Entry<K, V>>>,
}

struct Table<K, V> {
    /// A monotonically increasing id assigned whenever this table's backing
    /// `Vec` is (re)allocated. Stands in for the raw table address the
    /// fingerprint mixes in C: addresses aren't stable/meaningful in safe
    /// Rust and the allocator can reuse one immediately after a `Vec` drops,
    /// which would silently defeat the fingerprint's whole purpose.
    id: u64,
    buckets: Vec<Option<Box<Entry<K, V>>>>,
    used: usize,
}

impl<K, V> Table<K, V> {
    fn empty() -> Self {
        Self {
            id: 0,
            buckets: Vec::new(),
            used: 0,
        }
    }

    fn with_buckets(n: usize) -> Self {
        let mut buckets = Vec::with_capacity(n);
        buckets.resize_with(n, || None);
        Self {
            id: next_table_id(),
            buckets,
            used: 0,
        }
    }

    fn len(&self) -> usize {
        self.buckets.len()
    }

    fn mask(&self) -> usize {
        debug_assert!(!self.buckets.is_empty());
        self.buckets.len() - 1
    }
}

/// A chained, incrementally-rehashing hash table keyed by anything that can
/// be viewed as bytes.
///
/// The spec's "null dup/destroy callback" forms map onto ordinary Rust move
/// semantics: a `Dict<K, V>` owns its keys and values outright, dropping
/// them when an entry is removed or the dict itself is dropped. A caller
/// that needs shared, non-owning keys (the "null destroy" case) reaches for
/// `Rc`/`Arc` at the `K`/`V` type itself rather than the dict doing anything
/// special.
pub struct Dict<K, V>
where
    K: AsRef<[u8]> + Eq,
{
    tables: [Table<K, V>; 2],
    rehash_idx: isize,
    safe_iterators: usize,
    /// Per-dict override of `config::dict_can_resize()`. `None` means "track
    /// the global live", which is the default; `set_can_resize` pins it.
    can_resize_override: Option<bool>,
    /// Per-dict override of `config::dict_force_resize_ratio()`, same
    /// `None`-tracks-the-global default as `can_resize_override`.
    force_resize_ratio_override: Option<u32>,
    case_insensitive: bool,
}

impl<K, V> Dict<K, V>
where
    K: AsRef<[u8]> + Eq,
{
    pub fn new() -> Self {
        Self::new_with_case_sensitivity(false)
    }

    /// A dict whose keys hash (and therefore look up) ASCII-case-insensitively.
    pub fn new_case_insensitive() -> Self {
        Self::new_with_case_sensitivity(true)
    }

    fn new_with_case_sensitivity(case_insensitive: bool) -> Self {
        Self {
            tables: [Table::empty(), Table::empty()],
            rehash_idx: -1,
            safe_iterators: 0,
            can_resize_override: None,
            force_resize_ratio_override: None,
            case_insensitive,
        }
    }

    /// Pins this dict's resize policy, overriding `config::dict_can_resize()`
    /// for its remaining lifetime. Without a call to this, the dict tracks
    /// the global live (a later `config::set_dict_can_resize` takes effect
    /// on the next grow/shrink check).
    pub fn set_can_resize(&mut self, can_resize: bool) {
        self.can_resize_override = Some(can_resize);
    }

    fn can_resize(&self) -> bool {
        self.can_resize_override.unwrap_or_else(config::dict_can_resize)
    }

    /// Pins this dict's force-resize ratio, overriding
    /// `config::dict_force_resize_ratio()` for its remaining lifetime.
    pub fn set_force_resize_ratio(&mut self, ratio: u32) {
        assert!(ratio > 0);
        self.force_resize_ratio_override = Some(ratio);
    }

    fn force_resize_ratio(&self) -> u32 {
        self.force_resize_ratio_override
            .unwrap_or_else(config::dict_force_resize_ratio)
    }

    /// Key equality under this dict's comparison mode: exact for a
    /// case-sensitive dict, ASCII-fold for a case-insensitive one. Matches
    /// `hash_key`'s own case handling so two keys that hash together under
    /// `new_case_insensitive()` also compare equal.
    fn keys_match(&self, a: &K, b: &K) -> bool {
        if self.case_insensitive {
            a.as_ref().eq_ignore_ascii_case(b.as_ref())
        } else {
            a == b
        }
    }

    pub fn is_rehashing(&self) -> bool {
        self.rehash_idx != -1
    }

    pub fn len(&self) -> usize {
        self.tables[0].used + self.tables[1].used
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets currently allocated across both live tables.
    pub fn bucket_count(&self) -> usize {
        self.tables[0].len() + self.tables[1].len()
    }

    fn hash_key(&self, key: &K) -> u64 {
        if self.case_insensitive {
            hash::hash_case_insensitive(key.as_ref())
        } else {
            hash::hash(key.as_ref())
        }
    }

    fn run_rehash_step_if_unpinned(&mut self) {
        if self.safe_iterators == 0 {
            self.rehash_step(1);
        }
    }

    /// Migrates up to `n` non-empty buckets from `tables[0]` into
    /// `tables[1]`, skipping empty buckets within a budget of `10 * n`
    /// visits so a long run of vacated buckets can't turn one "step" into a
    /// full table scan. Returns whether rehashing is still in progress.
    pub fn rehash_step(&mut self, n: usize) -> bool {
        self.rehash_step_counted(n).0
    }

    /// Same migration loop as [`Dict::rehash_step`], but also reports how
    /// many non-empty buckets were actually migrated (as opposed to `n`,
    /// which is only a request). Used by [`Dict::rehash_milliseconds`] to
    /// report real migration counts rather than the batch size requested.
    fn rehash_step_counted(&mut self, n: usize) -> (bool, usize) {
        if !self.is_rehashing() {
            return (false, 0);
        }
        let n = n.max(1);
        let mut empty_visits_left = (10 * n) as isize;
        let mut moved = 0usize;

        while moved < n {
            if self.tables[0].used == 0 {
                break;
            }
            while self.tables[0].buckets[self.rehash_idx as usize].is_none() {
                self.rehash_idx += 1;
                empty_visits_left -= 1;
                if empty_visits_left <= 0 {
                    return (true, moved);
                }
            }

            let idx = self.rehash_idx as usize;
            let mut chain = self.tables[0].buckets[idx].take();
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                let h = self.hash_key(&entry.key);
                let target = (h as usize) & self.tables[1].mask();
                entry.next = self.tables[1].buckets[target].take();
                self.tables[0].used -= 1;
                self.tables[1].used += 1;
                self.tables[1].buckets[target] = Some(entry);
            }
            self.rehash_idx += 1;
            moved += 1;
        }

        if self.tables[0].used == 0 {
            self.finish_rehash();
            (false, moved)
        } else {
            (true, moved)
        }
    }

    /// Runs rehash steps of 100 bucket migrations each until either
    /// rehashing finishes or `ms` milliseconds have elapsed, whichever comes
    /// first. Unlike [`Dict::rehash_step`], this never checks
    /// `safe_iterators`. Callers that want time-sliced rehashing are
    /// expected to drive it directly rather than have it fire implicitly
    /// from another API call. Returns the number of buckets migrated.
    pub fn rehash_milliseconds(&mut self, ms: u64) -> usize {
        if !self.is_rehashing() {
            return 0;
        }
        let deadline = std::time::Instant::now() + std::time::Duration::from_millis(ms);
        let mut migrated = 0usize;
        loop {
            let (still_rehashing, moved) = self.rehash_step_counted(100);
            migrated += moved;
            if !still_rehashing || std::time::Instant::now() >= deadline {
                break;
            }
        }
        migrated
    }

    fn finish_rehash(&mut self) {
        self.tables[0] = std::mem::replace(&mut self.tables[1], Table::empty());
        self.rehash_idx = -1;
    }

    /// Resizes the table to the smallest power of two `>= target` (and
    /// `>= config::INITIAL_SIZE`, and `>= the number of entries currently
    /// used`). Refused while already rehashing, or if the computed size
    /// wouldn't change anything.
    pub fn expand(&mut self, target: usize) -> Result<()> {
        if self.is_rehashing() {
            return Err(CoreError::InvalidState);
        }
        let min_size = target.max(config::INITIAL_SIZE).max(self.tables[0].used);
        let new_size = min_size.next_power_of_two();

        if self.tables[0].buckets.is_empty() {
            self.tables[0] = Table::with_buckets(new_size);
            return Ok(());
        }
        if new_size == self.tables[0].len() {
            return Err(CoreError::InvalidState);
        }

        self.tables[1] = Table::with_buckets(new_size);
        self.rehash_idx = 0;
        Ok(())
    }

    /// Explicit shrink request: resizes down to the smallest power of two
    /// that still fits the current entry count. Refused while rehashing or
    /// while resize is disabled for this dict.
    pub fn shrink(&mut self) -> Result<()> {
        if !self.can_resize() {
            return Err(CoreError::InvalidState);
        }
        let used = self.tables[0].used;
        self.expand(used)
    }

    fn maybe_grow(&mut self) {
        if self.is_rehashing() {
            return;
        }
        let size = self.tables[0].len();
        if size == 0 {
            let _ = self.expand(config::INITIAL_SIZE);
            return;
        }
        let used = self.tables[0].used;
        if used < size {
            return;
        }
        let should_grow = self.can_resize() || used / size > self.force_resize_ratio() as usize;
        if should_grow {
            let _ = self.expand(used * 2);
        }
    }

    fn locate<'a>(&'a self, key: &K, hash: u64) -> Option<&'a Entry<K, V>> {
        let table_count = if self.is_rehashing() { 2 } else { 1 };
        for t in 0..table_count {
            let table = &self.tables[t];
            if table.buckets.is_empty() {
                continue;
            }
            let idx = (hash as usize) & table.mask();
            let mut cur = table.buckets[idx].as_deref();
            while let Some(entry) = cur {
                if self.keys_match(&entry.key, key) {
                    return Some(entry);
                }
                cur = entry.next.as_deref();
            }
        }
        None
    }

    fn locate_mut<'a>(&'a mut self, key: &K, hash: u64) -> Option<&'a mut Entry<K, V>> {
        let table_count = if self.is_rehashing() { 2 } else { 1 };
        let case_insensitive = self.case_insensitive;
        for t in 0..table_count {
            let table = &mut self.tables[t];
            if table.buckets.is_empty() {
                continue;
            }
            let idx = (hash as usize) & table.mask();
            let mut cur = table.buckets[idx].as_deref_mut();
            while let Some(entry) = cur {
                let matches = if case_insensitive {
                    entry.key.as_ref().eq_ignore_ascii_case(key.as_ref())
                } else {
                    entry.key == *key
                };
                if matches {
                    return Some(entry);
                }
                cur = entry.next.as_deref_mut();
            }
        }
        None
    }

    pub fn find(&mut self, key: &K) -> Option<&V> {
        self.run_rehash_step_if_unpinned();
        let hash = self.hash_key(key);
        self.locate(key, hash).map(|e| &e.value)
    }

    pub fn find_mut(&mut self, key: &K) -> Option<&mut V> {
        self.run_rehash_step_if_unpinned();
        let hash = self.hash_key(key);
        self.locate_mut(key, hash).map(|e| &mut e.value)
    }

    pub fn contains_key(&mut self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Returns a mutable reference to `key`'s slot, creating it with
    /// `make_value` if absent. The bool is true if the entry was newly
    /// created. `make_value` is only called when inserting, matching the
    /// spec's "value left uninitialized for the caller to fill in", a
    /// closure is the natural Rust stand-in for that deferred write.
    pub fn add_raw<F: FnOnce() -> V>(&mut self, key: K, make_value: F) -> (&mut V, bool) {
        self.run_rehash_step_if_unpinned();
        let hash = self.hash_key(&key);

        if self.locate(&key, hash).is_some() {
            let entry = self.locate_mut(&key, hash).expect("just confirmed present");
            return (&mut entry.value, false);
        }

        self.maybe_grow();
        let table_idx = if self.is_rehashing() { 1 } else { 0 };
        let bucket = (hash as usize) & self.tables[table_idx].mask();

        let mut entry = Box::new(Entry {
            key,
            value: make_value(),
            next: None,
        });
        entry.next = self.tables[table_idx].buckets[bucket].take();
        self.tables[table_idx].buckets[bucket] = Some(entry);
        self.tables[table_idx].used += 1;

        let entry = self.tables[table_idx].buckets[bucket]
            .as_mut()
            .expect("just inserted");
        (&mut entry.value, true)
    }

    /// Inserts `value` under `key`, returning whether the key was new. If
    /// the key already existed, its old value is dropped in favor of the
    /// new one (order matters here only in the C original, where the new
    /// and old value could alias the same ref-counted object; owned Rust
    /// values can't alias, so the new value is simply computed up front).
    pub fn replace(&mut self, key: K, value: V) -> bool {
        let mut incoming = Some(value);
        let (slot, inserted) = self.add_raw(key, || incoming.take().unwrap());
        if let Some(value) = incoming {
            *slot = value;
        }
        inserted
    }

    /// Removes `key`, returning its owned key/value pair if present.
    pub fn unlink(&mut self, key: &K) -> Option<(K, V)> {
        self.run_rehash_step_if_unpinned();
        let hash = self.hash_key(key);
        let table_count = if self.is_rehashing() { 2 } else { 1 };
        let case_insensitive = self.case_insensitive;

        for t in 0..table_count {
            if self.tables[t].buckets.is_empty() {
                continue;
            }
            let idx = (hash as usize) & self.tables[t].mask();
            let mut link = &mut self.tables[t].buckets[idx];
            while let Some(entry) = link {
                let matches = if case_insensitive {
                    entry.key.as_ref().eq_ignore_ascii_case(key.as_ref())
                } else {
                    entry.key == *key
                };
                if matches {
                    let mut detached = link.take().unwrap();
                    *link = detached.next.take();
                    self.tables[t].used -= 1;
                    return Some((detached.key, detached.value));
                }
                link = &mut entry.next;
            }
        }
        None
    }

    pub fn delete(&mut self, key: &K) -> bool {
        self.unlink(key).is_some()
    }

    /// A uniformly-chosen live entry, or `None` if the dict is empty.
    /// First picks a uniformly random bucket (across both tables while
    /// rehashing, restricted to the not-yet-migrated suffix of `tables[0]`),
    /// retrying on an empty pick, then picks uniformly within that bucket's
    /// chain by length.
    pub fn random_entry(&self) -> Option<(&K, &V)> {
        if self.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        loop {
            if self.is_rehashing() {
                let t0_remaining = self.tables[0].len() - self.rehash_idx as usize;
                let t1_len = self.tables[1].len();
                let total = t0_remaining + t1_len;
                let pick = rng.gen_range(0, total);
                let (table_idx, bucket_idx) = if pick < t0_remaining {
                    (0, self.rehash_idx as usize + pick)
                } else {
                    (1, pick - t0_remaining)
                };
                if let Some(head) = &self.tables[table_idx].buckets[bucket_idx] {
                    return Some(Self::pick_uniform_in_chain(head, &mut rng));
                }
            } else {
                if self.tables[0].buckets.is_empty() {
                    return None;
                }
                let bucket_idx = rng.gen_range(0, self.tables[0].len());
                if let Some(head) = &self.tables[0].buckets[bucket_idx] {
                    return Some(Self::pick_uniform_in_chain(head, &mut rng));
                }
            }
        }
    }

    fn pick_uniform_in_chain<'a>(
        head: &'a Entry<K, V>,
        rng: &mut impl Rng,
    ) -> (&'a K, &'a V) {
        let mut len = 1u32;
        let mut cur = head;
        while let Some(next) = &cur.next {
            len += 1;
            cur = next;
        }
        let target = rng.gen_range(0, len);
        let mut cur = head;
        for _ in 0..target {
            cur = cur.next.as_ref().expect("target < len");
        }
        (&cur.key, &cur.value)
    }

    /// Samples up to roughly `count` entries by walking forward through
    /// bucket space from a random start, collecting whole buckets as it
    /// goes. Not uniform and may return duplicates under concurrent
    /// rehashing. Callers that need true uniform sampling should use
    /// repeated [`Dict::random_entry`] calls instead.
    pub fn sample(&self, count: usize) -> Vec<(&K, &V)> {
        let mut out: Vec<(&K, &V)> = Vec::new();
        if count == 0 || self.is_empty() {
            return out;
        }

        let rehashing = self.is_rehashing();
        let table_count = if rehashing { 2 } else { 1 };
        let maxsize = self.tables[0].len().max(self.tables[1].len());
        if maxsize == 0 {
            return out;
        }

        let mut rng = rand::thread_rng();
        let mut i = rng.gen_range(0, maxsize);
        let mut empty_run = 0usize;
        let max_steps = 10 * count;

        for _ in 0..max_steps {
            if out.len() >= count {
                break;
            }
            for t in 0..table_count {
                let table = &self.tables[t];
                if table.buckets.is_empty() {
                    continue;
                }
                let idx = i & table.mask();
                if t == 0 && rehashing && idx < self.rehash_idx as usize {
                    continue;
                }
                match &table.buckets[idx] {
                    None => empty_run += 1,
                    Some(head) => {
                        empty_run = 0;
                        let mut cur = Some(head.as_ref());
                        while let Some(entry) = cur {
                            out.push((&entry.key, &entry.value));
                            cur = entry.next.as_deref();
                        }
                    }
                }
            }
            if empty_run >= 5 && empty_run > count {
                i = rng.gen_range(0, maxsize);
                empty_run = 0;
            } else {
                i += 1;
            }
        }

        out
    }

    /// A mixed 64-bit fingerprint of this dict's structural state (both
    /// tables' identity/size/used-count), for [`UnsafeIter::close`] to
    /// detect mutation during unsafe iteration.
    pub(crate) fn fingerprint(&self) -> u64 {
        let numbers = [
            self.tables[0].id,
            self.tables[0].len() as u64,
            self.tables[0].used as u64,
            self.tables[1].id,
            self.tables[1].len() as u64,
            self.tables[1].used as u64,
        ];
        let mut h: u64 = 0;
        for n in numbers {
            h ^= n;
            h = mix64(h);
        }
        h
    }

    /// Starts a safe iterator: pins rehashing (no bucket migrations happen
    /// while any safe iterator is open) so no entry is missed or repeated.
    /// It is safe to delete the entry a safe iterator just returned, but not
    /// to insert new entries while one is open.
    pub fn safe_iter(&mut self) -> SafeIter<K> {
        self.safe_iterators += 1;
        SafeIter::new()
    }

    pub fn close_safe_iter(&mut self, iter: SafeIter<K>) {
        drop(iter);
        self.safe_iterators -= 1;
    }

    /// Starts an unsafe iterator: cheap (doesn't pin rehashing), but the
    /// caller must call [`UnsafeIter::close`] with this same dict when done
    /// it fails if the dict's fingerprint changed, meaning something
    /// mutated the dict while the iterator was live.
    pub fn unsafe_iter(&self) -> UnsafeIter<K> {
        UnsafeIter::new(self.fingerprint())
    }

    /// A single scan step. `cursor` starts and ends at `0`; a non-zero
    /// return value must be fed back in as the next call's cursor, and `0`
    /// means the scan is complete. Entries present for the whole scan are
    /// guaranteed to be emitted at least once; entries added or removed
    /// mid-scan may or may not be. `emit_bucket` is called once per bucket
    /// visited (useful for tests asserting coverage); most callers pass a
    /// no-op.
    pub fn scan<FE, FB>(&self, cursor: usize, emit_entry: FE, emit_bucket: FB) -> usize
    where
        FE: FnMut(&K, &V),
        FB: FnMut(usize),
    {
        scan::scan(self, cursor, emit_entry, emit_bucket)
    }
}

impl<K, V> Default for Dict<K, V>
where
    K: AsRef<[u8]> + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Thomas Wang's 64-bit integer mix, applied once per fingerprint component.
fn mix64(mut x: u64) -> u64 {
    x = (!x).wrapping_add(x << 21);
    x ^= x >> 24;
    x = x.wrapping_add(x << 3).wrapping_add(x << 8);
    x ^= x >> 14;
    x = x.wrapping_add(x << 2).wrapping_add(x << 4);
    x ^= x >> 28;
    x = x.wrapping_add(x << 31);
    x
}
