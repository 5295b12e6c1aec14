//! Error types for directory operations.

use crate::kind::ItemKind;
use std::io;
use std::num::ParseIntError;
use thiserror::Error;

/// Result type for directory operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while cataloging or loading embedded items.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred (open, map, unmap or close).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The operation needs write access, which this backend never has.
    #[error("{operation}: elf directory does not support read-write")]
    Unsupported {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// A section name under the directory prefix carries an identifier
    /// that is not a base-16 u64.
    #[error("invalid {kind} identifier '{text}': {source}")]
    InvalidIdentifier {
        /// Kind named by the section suffix.
        kind: ItemKind,
        /// The identifier text between prefix and suffix.
        text: String,
        /// Underlying parse failure.
        source: ParseIntError,
    },

    /// Two sections map to the same kind and identifier.
    #[error("duplicate {kind} with id {id}")]
    DuplicateItem {
        /// Item kind.
        kind: ItemKind,
        /// Repeated identifier.
        id: u64,
    },

    /// The binary's structure is not usable.
    #[error("malformed binary: {0}")]
    MalformedBinary(String),

    /// No item with this kind and identifier is cataloged.
    #[error("no such {kind} with id {id}")]
    ItemNotFound {
        /// Requested kind.
        kind: ItemKind,
        /// Requested identifier.
        id: u64,
    },

    /// Text did not name a known item kind.
    #[error("unknown item kind: {0}")]
    UnknownKind(String),
}

impl StorageError {
    /// Creates a [`StorageError::MalformedBinary`] from a message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedBinary(message.into())
    }

    /// Returns true for failures caused by the write path.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Returns true if the item was simply absent from the catalog.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ItemNotFound { .. })
    }
}

/// Combines the outcome of two cleanup steps that must both run,
/// preferring the first failure.
pub(crate) fn first_error(first: StorageResult<()>, second: StorageResult<()>) -> StorageResult<()> {
    first.and(second)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_err(msg: &str) -> StorageError {
        StorageError::Io(io::Error::new(io::ErrorKind::Other, msg.to_string()))
    }

    #[test]
    fn first_error_prefers_earlier_failure() {
        let result = first_error(Err(io_err("unmap")), Err(io_err("close")));
        assert!(result.unwrap_err().to_string().contains("unmap"));
    }

    #[test]
    fn first_error_reports_later_failure_alone() {
        let result = first_error(Ok(()), Err(io_err("close")));
        assert!(result.unwrap_err().to_string().contains("close"));
        assert!(first_error(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn error_messages_name_the_item() {
        let err = StorageError::ItemNotFound {
            kind: ItemKind::Segment,
            id: 10,
        };
        assert_eq!(err.to_string(), "no such segment with id 10");
        assert!(err.is_not_found());

        let err = StorageError::Unsupported { operation: "sync" };
        assert!(err.to_string().contains("does not support read-write"));
        assert!(err.is_unsupported());
    }
}
