use std::collections::TryReserveError;

use thiserror::Error;

use crate::allocator::AllocatorError;

/// Error type for array layout operations.
///
/// Every layout operation is all-or-nothing: when one of these errors is returned the
/// target array's shape, strides and flags are exactly what they were before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Malformed input to a layout operation.
    ///
    /// # Common Causes
    /// - A stride sequence whose length differs from the array's dimension count
    /// - Strides that would address bytes outside the owning allocation
    /// - Restriding an array whose root is an externally supplied buffer
    #[error("{0}")]
    InvalidArgument(String),

    /// The requested shape cannot be satisfied without copying or moving data.
    #[error("{0}")]
    IncompatibleLayout(String),

    /// Allocation of dimension storage or of a data buffer failed.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),
}

impl LayoutError {
    /// Creates an `InvalidArgument` error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an `IncompatibleLayout` error.
    pub fn incompatible_layout(message: impl Into<String>) -> Self {
        Self::IncompatibleLayout(message.into())
    }

    /// Creates an `OutOfMemory` error.
    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::OutOfMemory(message.into())
    }

    /// Returns true if this error is recoverable by freeing memory.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory(_))
    }

    /// Returns a user-friendly suggestion for resolving the error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::InvalidArgument(_) => {
                "Pass one stride per dimension and keep every element inside the owning buffer"
            }
            Self::IncompatibleLayout(_) => {
                "Keep the element count unchanged, retry with the other memory order, or copy the array first"
            }
            Self::OutOfMemory(_) => "Free unused arrays to reclaim memory",
        }
    }
}

impl From<AllocatorError> for LayoutError {
    fn from(err: AllocatorError) -> Self {
        Self::OutOfMemory(err.to_string())
    }
}

impl From<TryReserveError> for LayoutError {
    fn from(err: TryReserveError) -> Self {
        Self::OutOfMemory(err.to_string())
    }
}

/// Error type returned by a [`crate::reshape::Reshape`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReshapeError {
    /// The new shape does not hold the same number of elements.
    #[error("total size of new array must be unchanged: cannot reshape {actual} elements into shape {shape:?} ({expected} elements)")]
    SizeMismatch {
        /// The requested shape.
        shape: Vec<usize>,
        /// Number of elements described by the requested shape.
        expected: usize,
        /// Number of elements in the source array.
        actual: usize,
    },

    /// A lower level layout operation failed while building the candidate.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl From<ReshapeError> for LayoutError {
    fn from(err: ReshapeError) -> Self {
        match err {
            ReshapeError::SizeMismatch { .. } => Self::IncompatibleLayout(err.to_string()),
            ReshapeError::Layout(e) => e,
        }
    }
}
