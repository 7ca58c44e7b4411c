use std::alloc;
use std::alloc::Layout;

use thiserror::Error;

/// An error type for array allocator operations.
#[derive(Debug, Error, PartialEq)]
pub enum AllocatorError {
    /// The requested size and alignment do not form a valid layout.
    #[error("Invalid array layout {0}")]
    LayoutError(core::alloc::LayoutError),

    /// The system allocator returned a null pointer.
    #[error("Null pointer")]
    NullPointer,
}

impl AllocatorError {
    /// Returns true if the allocator ran out of memory.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::NullPointer)
    }
}

/// A trait for allocating and deallocating the data buffers of arrays.
///
/// # Safety
///
/// The allocator must be thread-safe, storages holding it are shared across threads.
pub trait ArrayAllocator: Send + Sync + 'static {
    /// Allocates zero-initialized memory for the given layout.
    fn alloc_zeroed(&self, layout: Layout) -> Result<*mut u8, AllocatorError>;

    /// Deallocates memory previously returned by [`ArrayAllocator::alloc_zeroed`].
    fn dealloc(&self, ptr: *mut u8, layout: Layout);
}

/// An array allocator that uses the system allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuAllocator;

impl ArrayAllocator for CpuAllocator {
    /// Allocates zeroed memory for an array buffer.
    ///
    /// Zero-sized layouts are never handed to the system allocator; a dangling, well
    /// aligned pointer is returned instead.
    fn alloc_zeroed(&self, layout: Layout) -> Result<*mut u8, AllocatorError> {
        if layout.size() == 0 {
            return Ok(layout.align() as *mut u8);
        }
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            Err(AllocatorError::NullPointer)?
        }
        Ok(ptr)
    }

    /// Deallocates memory for an array buffer.
    ///
    /// # Safety
    ///
    /// The pointer must come from `alloc_zeroed` with the same layout.
    #[allow(clippy::not_unsafe_ptr_arg_deref)]
    fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if !ptr.is_null() && layout.size() != 0 {
            unsafe { alloc::dealloc(ptr, layout) }
        }
    }
}
