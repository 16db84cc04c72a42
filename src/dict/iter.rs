//! Safe and unsafe iterators over a [`super::Dict`].
//!
//! Both are cursors that take the dict by reference on every call rather
//! than holding a borrow across the iterator's lifetime, since the spec requires
//! tolerating mutation of the dict in between calls (deleting the
//! just-returned entry for a safe iterator; anything at all for an unsafe
//! one, detected after the fact by fingerprint), which an ordinary borrowed
//! `Iterator` can't express in safe Rust. To resume correctly even if the
//! entry just returned gets deleted, the cursor pre-fetches and clones the
//! *next* entry's key (mirroring the C implementation's pre-fetched `next`
//! pointer) rather than tracking a bucket position by count.

use super::{Dict, Entry};
use crate::error::{CoreError, Result};

struct Cursor<K> {
    table_idx: usize,
    bucket_idx: usize,
    bucket_started: bool,
    pending_key: Option<K>,
}

impl<K> Cursor<K> {
    fn new() -> Self {
        Self {
            table_idx: 0,
            bucket_idx: 0,
            bucket_started: false,
            pending_key: None,
        }
    }
}

fn find_in_bucket<'d, K, V>(
    dict: &'d Dict<K, V>,
    table_idx: usize,
    bucket_idx: usize,
    key: &K,
) -> Option<&'d Entry<K, V>>
where
    K: AsRef<[u8]> + Eq,
{
    let table = &dict.tables[table_idx];
    if bucket_idx >= table.len() {
        return None;
    }
    let mut cur = table.buckets[bucket_idx].as_deref();
    while let Some(entry) = cur {
        if entry.key == *key {
            return Some(entry);
        }
        cur = entry.next.as_deref();
    }
    None
}

impl<K> Cursor<K>
where
    K: AsRef<[u8]> + Eq + Clone,
{
    fn next<'d, V>(&mut self, dict: &'d Dict<K, V>) -> Option<(&'d K, &'d V)> {
        if let Some(key) = self.pending_key.take() {
            if let Some(entry) = find_in_bucket(dict, self.table_idx, self.bucket_idx, &key) {
                self.pending_key = entry.next.as_ref().map(|n| n.key.clone());
                return Some((&entry.key, &entry.value));
            }
            // The pre-fetched entry is gone (it was the one the caller just
            // deleted): treat this bucket as exhausted and move on.
        }

        loop {
            if !self.bucket_started {
                self.bucket_started = true;
            } else {
                self.bucket_idx += 1;
            }

            if self.bucket_idx >= dict.tables[self.table_idx].len() {
                if self.table_idx == 0 && dict.is_rehashing() {
                    self.table_idx = 1;
                    self.bucket_idx = 0;
                } else {
                    return None;
                }
            }
            if dict.tables[self.table_idx].len() == 0 {
                return None;
            }

            if let Some(head) = &dict.tables[self.table_idx].buckets[self.bucket_idx] {
                self.pending_key = head.next.as_ref().map(|n| n.key.clone());
                return Some((&head.key, &head.value));
            }
        }
    }
}

/// An iterator that pins rehashing open for its whole lifetime (see
/// [`Dict::safe_iter`]). It is safe to delete the entry just returned by
/// `next`, but not to insert new entries, while one is open.
pub struct SafeIter<K> {
    cursor: Cursor<K>,
}

impl<K> SafeIter<K> {
    pub(super) fn new() -> Self {
        Self {
            cursor: Cursor::new(),
        }
    }
}

impl<K> SafeIter<K>
where
    K: AsRef<[u8]> + Eq + Clone,
{
    pub fn next<'d, V>(&mut self, dict: &'d Dict<K, V>) -> Option<(&'d K, &'d V)> {
        self.cursor.next(dict)
    }
}

/// A cheap iterator that does not pin rehashing. The caller must call
/// [`UnsafeIter::close`] with the same dict when done; it returns
/// `Err(CoreError::ContractViolation)` if the dict's structural fingerprint
/// changed since the iterator was opened, meaning something mutated the
/// dict while it was live.
pub struct UnsafeIter<K> {
    fingerprint: u64,
    cursor: Cursor<K>,
}

impl<K> UnsafeIter<K> {
    pub(super) fn new(fingerprint: u64) -> Self {
        Self {
            fingerprint,
            cursor: Cursor::new(),
        }
    }

    pub fn close<V>(self, dict: &Dict<K, V>) -> Result<()>
    where
        K: AsRef<[u8]> + Eq,
    {
        if dict.fingerprint() == self.fingerprint {
            Ok(())
        } else {
            Err(CoreError::ContractViolation)
        }
    }
}

impl<K> UnsafeIter<K>
where
    K: AsRef<[u8]> + Eq + Clone,
{
    pub fn next<'d, V>(&mut self, dict: &'d Dict<K, V>) -> Option<(&'d K, &'d V)> {
        self.cursor.next(dict)
    }
}
