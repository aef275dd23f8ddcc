//! Error handling for the mmvec library
//!
//! Runtime conditions (I/O failures, corrupted files, lookups outside a
//! table) are reported through [`MmvecError`]. Contract violations such as
//! resizing a read-only vector are not errors: they panic.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for the mmvec library
#[derive(Error, Debug)]
pub enum MmvecError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// On-disk image does not match what its header promises
    #[error("{path} is corrupted ({what}: expected {expected}, found {actual}); delete and rebuild it")]
    Corrupted {
        /// File or directory holding the damaged image
        path: PathBuf,
        /// Which check failed
        what: &'static str,
        /// Value the header or format requires
        expected: u64,
        /// Value actually found
        actual: u64,
    },

    /// Invalid argument or data format
    #[error("Invalid data: {message}")]
    InvalidData {
        /// Error message describing the issue
        message: String,
    },

    /// Index out of bounds access
    #[error("Out of bounds: index {index}, size {size}")]
    OutOfBounds {
        /// The invalid index
        index: usize,
        /// The valid size/length
        size: usize,
    },

    /// Requested element count does not fit the 32-bit count field
    #[error("Capacity overflow: {requested} elements requested, at most {} allowed", u32::MAX)]
    CapacityOverflow {
        /// Number of elements requested
        requested: u64,
    },

    /// Every slot of a fixed-size hash table was probed without a match
    #[error("Intern table full: all {slots} slots are occupied")]
    TableFull {
        /// Number of slots in the table
        slots: usize,
    },

    /// Mutation attempted through a read-only structure
    #[error("Read-only: cannot {operation}")]
    ReadOnly {
        /// Operation that was refused
        operation: &'static str,
    },

    /// Configuration or parameter errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl MmvecError {
    /// Create a corruption error for `path`
    pub fn corrupted<P: AsRef<Path>>(path: P, what: &'static str, expected: u64, actual: u64) -> Self {
        Self::Corrupted {
            path: path.as_ref().to_path_buf(),
            what,
            expected,
            actual,
        }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, size: usize) -> Self {
        Self::OutOfBounds { index, size }
    }

    /// Create a capacity overflow error
    pub fn capacity_overflow(requested: u64) -> Self {
        Self::CapacityOverflow { requested }
    }

    /// Create a table full error
    pub fn table_full(slots: usize) -> Self {
        Self::TableFull { slots }
    }

    /// Create a read-only error
    pub fn read_only(operation: &'static str) -> Self {
        Self::ReadOnly { operation }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Check if this is a recoverable error
    ///
    /// Corruption is never recoverable in place: the remedy is deleting the
    /// file and rebuilding it.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::TableFull { .. } => false,
            Self::Corrupted { .. } => false,
            Self::InvalidData { .. } => false,
            Self::OutOfBounds { .. } => false,
            Self::CapacityOverflow { .. } => false,
            Self::ReadOnly { .. } => false,
            Self::Configuration { .. } => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Corrupted { .. } => "corruption",
            Self::InvalidData { .. } => "data",
            Self::OutOfBounds { .. } => "bounds",
            Self::CapacityOverflow { .. } => "capacity",
            Self::TableFull { .. } => "table",
            Self::ReadOnly { .. } => "read_only",
            Self::Configuration { .. } => "config",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MmvecError>;

/// Assert that an index is within bounds
#[inline]
pub fn check_bounds(index: usize, size: usize) -> Result<()> {
    if index >= size {
        Err(MmvecError::out_of_bounds(index, size))
    } else {
        Ok(())
    }
}
