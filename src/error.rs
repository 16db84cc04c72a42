use thiserror::Error;

/// Errors surfaced by the core engines.
///
/// `AllocationFailed` from the spec has no variant here: `Vec`/`Box`
/// allocation failure aborts the process before a `Result` could be
/// constructed, so it is fatal by construction rather than a value.
/// `NotFound`/`Duplicate` likewise aren't errors here, they're plain
/// `Option`/`bool` returns on the affected APIs.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// `expand`/`shrink` refused because a rehash is already in progress, or
    /// `expand` was asked for a size that would not grow the table.
    #[error("dict is mid-rehash or the requested size would not grow the table")]
    InvalidState,
    /// An unsafe iterator's fingerprint changed between open and close,
    /// meaning the dict was mutated while the iterator was live.
    #[error("dict was mutated during unsafe iteration")]
    ContractViolation,
}

pub type Result<T> = std::result::Result<T, CoreError>;
