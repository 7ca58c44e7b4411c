//! Arc-based byte storage shared by an array and all of its views.
//!
//! The storage is the allocation that the root of a base chain owns. Views never hold
//! a storage of their own; they reach it through their base, which keeps the
//! allocation alive for as long as any view exists.

use std::{alloc::Layout, ptr::NonNull, sync::Arc};

use crate::allocator::{AllocatorError, ArrayAllocator};

/// Alignment of buffers allocated by the array system, enough for any [`crate::DType`].
pub const DATA_ALIGNMENT: usize = 16;

enum Backing {
    /// Memory allocated, and later freed, through an [`ArrayAllocator`].
    Allocated {
        ptr: NonNull<u8>,
        layout: Layout,
        alloc: Arc<dyn ArrayAllocator>,
    },
    /// Memory owned by some external object that the array system cannot introspect.
    External(Box<dyn AsRef<[u8]> + Send + Sync>),
}

struct StorageImpl {
    backing: Backing,
}

impl StorageImpl {
    fn as_bytes(&self) -> &[u8] {
        match &self.backing {
            // SAFETY: ptr is valid for layout.size() bytes for the lifetime of self
            Backing::Allocated { ptr, layout, .. } => unsafe {
                std::slice::from_raw_parts(ptr.as_ptr(), layout.size())
            },
            Backing::External(buf) => (**buf).as_ref(),
        }
    }
}

impl Drop for StorageImpl {
    fn drop(&mut self) {
        // SAFETY: ptr and layout were created together during allocation and this is the
        // final reference to them
        if let Backing::Allocated { ptr, layout, alloc } = &self.backing {
            alloc.dealloc(ptr.as_ptr(), *layout);
        }
    }
}

// SAFETY: the allocated bytes are only mutated through `as_mut_bytes`, which requires the
// storage to be uniquely owned, and external buffers are `Send + Sync` by bound.
unsafe impl Send for StorageImpl {}
unsafe impl Sync for StorageImpl {}

/// Reference-counted byte buffer holding array elements.
///
/// Cloning is cheap and only increments the reference count. The memory is released by
/// the allocator that produced it when the last clone is dropped.
#[derive(Clone)]
pub struct ArrayStorage {
    inner: Arc<StorageImpl>,
}

impl ArrayStorage {
    /// Allocates `len` zeroed bytes with the given allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is invalid or the allocator fails.
    pub fn zeroed(len: usize, alloc: Arc<dyn ArrayAllocator>) -> Result<Self, AllocatorError> {
        let layout =
            Layout::from_size_align(len, DATA_ALIGNMENT).map_err(AllocatorError::LayoutError)?;
        let ptr = alloc.alloc_zeroed(layout)?;
        let ptr = NonNull::new(ptr).ok_or(AllocatorError::NullPointer)?;
        Ok(Self {
            inner: Arc::new(StorageImpl {
                backing: Backing::Allocated { ptr, layout, alloc },
            }),
        })
    }

    /// Copies a vector of plain values into a new allocation.
    pub fn from_vec<T: bytemuck::Pod>(
        value: Vec<T>,
        alloc: Arc<dyn ArrayAllocator>,
    ) -> Result<Self, AllocatorError> {
        let bytes: &[u8] = bytemuck::cast_slice(&value);
        let mut storage = Self::zeroed(bytes.len(), alloc)?;
        if let Some(dst) = storage.as_mut_bytes() {
            dst.copy_from_slice(bytes);
        }
        Ok(storage)
    }

    /// Wraps an externally owned buffer without copying it.
    pub fn from_external<B>(buffer: B) -> Self
    where
        B: AsRef<[u8]> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(StorageImpl {
                backing: Backing::External(Box::new(buffer)),
            }),
        }
    }

    /// Returns the whole buffer as bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Returns the whole buffer as mutable bytes.
    ///
    /// Returns `None` when the storage is shared or externally owned.
    pub fn as_mut_bytes(&mut self) -> Option<&mut [u8]> {
        let inner = Arc::get_mut(&mut self.inner)?;
        match &mut inner.backing {
            // SAFETY: we hold the only reference to the allocation
            Backing::Allocated { ptr, layout, .. } => Some(unsafe {
                std::slice::from_raw_parts_mut(ptr.as_ptr(), layout.size())
            }),
            Backing::External(_) => None,
        }
    }

    /// Returns the pointer to the first byte of the buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.as_bytes().as_ptr()
    }

    /// Returns the number of bytes in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the buffer was supplied from outside the array system.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.inner.backing, Backing::External(_))
    }

    /// Returns true if this storage is uniquely owned (no other Arc references).
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Returns true if both handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ArrayStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayStorage")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .field("external", &self.is_external())
            .field("is_unique", &self.is_unique())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CpuAllocator;

    #[test]
    fn test_storage_zeroed() -> Result<(), AllocatorError> {
        let storage = ArrayStorage::zeroed(32, Arc::new(CpuAllocator))?;
        assert_eq!(storage.len(), 32);
        assert!(storage.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(storage.as_ptr() as usize % DATA_ALIGNMENT, 0);
        assert!(!storage.is_external());
        Ok(())
    }

    #[test]
    fn test_storage_from_vec() -> Result<(), AllocatorError> {
        let storage = ArrayStorage::from_vec(vec![1u16, 2, 3], Arc::new(CpuAllocator))?;
        assert_eq!(storage.len(), 6);
        let values: Vec<u16> = storage
            .as_bytes()
            .chunks_exact(2)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_storage_empty() -> Result<(), AllocatorError> {
        let storage = ArrayStorage::from_vec(Vec::<f64>::new(), Arc::new(CpuAllocator))?;
        assert!(storage.is_empty());
        Ok(())
    }

    #[test]
    fn test_storage_cheap_clone() -> Result<(), AllocatorError> {
        let mut storage1 = ArrayStorage::zeroed(8, Arc::new(CpuAllocator))?;
        assert!(storage1.is_unique());
        let storage2 = storage1.clone();
        assert!(!storage1.is_unique());
        assert!(storage1.ptr_eq(&storage2));
        assert!(storage1.as_mut_bytes().is_none());
        drop(storage2);
        assert!(storage1.as_mut_bytes().is_some());
        Ok(())
    }

    #[test]
    fn test_storage_external() {
        let mut storage = ArrayStorage::from_external(vec![7u8; 12]);
        assert!(storage.is_external());
        assert_eq!(storage.len(), 12);
        assert_eq!(storage.as_bytes()[11], 7);
        assert!(storage.as_mut_bytes().is_none());
    }
}
