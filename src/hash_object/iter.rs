//! Iterator over a [`super::HashObject`]'s (field, value) pairs.
//!
//! Mirrors [`crate::dict::iter`]'s cursor shape: the iterator carries no
//! borrow of the object it walks, so the same `dict`-style pattern of
//! passing the object back into `next`/`close` on every call applies here
//! too. A `HashIterator` over a PACKED hash is just a position; over a
//! TABLE hash it wraps a [`crate::dict::SafeIter`], which pins rehashing for
//! as long as the iterator is open.

use super::{HashObject, Representation};
use crate::dict::SafeIter;

/// Which half of the current pair [`HashIterator::current`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
    Key,
    Value,
}

enum State {
    Packed {
        next_pos: usize,
        current: Option<(Vec<u8>, Vec<u8>)>,
    },
    Table {
        iter: SafeIter<Vec<u8>>,
        current: Option<(Vec<u8>, Vec<u8>)>,
    },
}

/// A single pass over every (field, value) pair in a [`HashObject`].
pub struct HashIterator {
    state: State,
}

impl HashIterator {
    pub(super) fn packed() -> Self {
        Self {
            state: State::Packed {
                next_pos: 0,
                current: None,
            },
        }
    }

    pub(super) fn table(iter: SafeIter<Vec<u8>>) -> Self {
        Self {
            state: State::Table {
                iter,
                current: None,
            },
        }
    }

    /// Advances to the next pair, returning `(field, value)`, or `None` once
    /// exhausted. `object` must be the same [`HashObject`] the iterator was
    /// created from; behavior is unspecified otherwise (same contract as
    /// [`crate::dict::SafeIter::next`]).
    pub fn next<'h>(&mut self, object: &'h HashObject) -> Option<(&'h [u8], &'h [u8])> {
        match (&mut self.state, object.representation) {
            (State::Packed { next_pos, current }, Representation::Packed) => {
                let packed = object.packed.as_ref().expect("packed payload");
                match packed.get(*next_pos) {
                    Some((f, v)) => {
                        *current = Some((f.to_vec(), v.to_vec()));
                        *next_pos += 1;
                        Some((f, v))
                    }
                    None => {
                        *current = None;
                        None
                    }
                }
            }
            (State::Table { iter, current }, Representation::Table) => {
                let table = object.table.as_ref().expect("table payload");
                match iter.next(table) {
                    Some((k, v)) => {
                        *current = Some((k.clone(), v.clone()));
                        Some((k.as_slice(), v.as_slice()))
                    }
                    None => {
                        *current = None;
                        None
                    }
                }
            }
            // The object converted representation mid-iteration (PACKED, whose
            // iterator pins nothing, was converted to TABLE by a `set` call in
            // between `next`s). Treat that as exhaustion rather than panicking.
            _ => None,
        }
    }

    /// The field or value half of the pair most recently returned by
    /// [`HashIterator::next`], or `None` before the first call / after
    /// exhaustion. Reads back from the iterator's own snapshot of the
    /// current pair rather than the object, so it stays valid even if
    /// `object` has since been mutated (matching `next`'s own tolerance of
    /// deletion of the just-returned entry).
    pub fn current(&self, kind: IterKind) -> Option<&[u8]> {
        let (key, value) = match &self.state {
            State::Packed { current, .. } => current.as_ref()?,
            State::Table { current, .. } => current.as_ref()?,
        };
        Some(match kind {
            IterKind::Key => key.as_slice(),
            IterKind::Value => value.as_slice(),
        })
    }

    /// Releases the iterator. Required for TABLE-backed iteration (it
    /// unpins rehashing on the underlying dict); a no-op for PACKED.
    pub fn close(self, object: &mut HashObject) {
        if let State::Table { iter, .. } = self.state {
            if let Some(table) = object.table.as_mut() {
                table.close_safe_iter(iter);
            }
        }
    }
}
