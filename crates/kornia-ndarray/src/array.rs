use std::{
    mem::ManuallyDrop,
    ptr,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard},
};

use crate::{
    allocator::{ArrayAllocator, CpuAllocator},
    descriptor::{Descriptor, Element},
    dims::{checked_numel, DimStorage, Order},
    error::LayoutError,
    flags::{self, ArrayFlags},
    storage::ArrayStorage,
};

/// Where the data of an array lives and who owns it.
///
/// Only the root of a chain, `Owned` or `Foreign`, holds the storage. A view holds a
/// strong reference to its base instead, so the allocation outlives every view of it.
#[derive(Debug)]
pub enum ArrayBase {
    /// Root array whose buffer was allocated by the array system.
    Owned(ArrayStorage),
    /// Root array wrapping an externally supplied buffer.
    Foreign(ArrayStorage),
    /// View sharing the buffer of `base`.
    ViewOf {
        /// The array this view's data pointer is relative to.
        base: NdArray,
        /// Byte distance from the base's data pointer to this view's data pointer.
        offset: isize,
    },
}

impl ArrayBase {
    /// Returns the base array of a view.
    pub fn base_array(&self) -> Option<&NdArray> {
        match self {
            ArrayBase::ViewOf { base, .. } => Some(base),
            ArrayBase::Owned(_) | ArrayBase::Foreign(_) => None,
        }
    }
}

/// Shape, strides and the flags derived from them.
///
/// Replaced as a single value; readers never observe a partially updated layout.
#[derive(Debug, Clone)]
pub(crate) struct ArrayLayout {
    pub(crate) dims: DimStorage,
    pub(crate) flags: ArrayFlags,
}

impl ArrayLayout {
    pub(crate) fn new(dims: DimStorage, itemsize: usize, owns_data: bool) -> Self {
        let mut flags = flags::contiguity_flags(dims.shape(), dims.strides(), itemsize);
        flags.set(ArrayFlags::OWNDATA, owns_data);
        Self { dims, flags }
    }
}

struct ArrayImpl {
    descr: Descriptor,
    /// Taken out only by `Drop`.
    base: ManuallyDrop<ArrayBase>,
    /// Distance in bytes from the start of the root storage to the data pointer.
    data_offset: usize,
    layout: RwLock<ArrayLayout>,
}

impl Drop for ArrayImpl {
    /// Releases the base chain link by link.
    ///
    /// Every base this array held the last reference to is unlinked in a loop, so
    /// dropping a long chain of views does not recurse once per link.
    fn drop(&mut self) {
        // SAFETY: `base` is not touched again once the array is being dropped
        let mut base = unsafe { ManuallyDrop::take(&mut self.base) };
        loop {
            let parent = match base {
                ArrayBase::ViewOf { base: parent, .. } => parent,
                ArrayBase::Owned(_) | ArrayBase::Foreign(_) => return,
            };
            let Some(inner) = Arc::into_inner(parent.inner) else {
                return;
            };
            let mut inner = ManuallyDrop::new(inner);
            // SAFETY: `inner` is never dropped as a whole; its only fields with drop glue,
            // `base` and `layout`, are each moved out or dropped exactly once here
            unsafe {
                base = ManuallyDrop::take(&mut inner.base);
                ptr::drop_in_place(&mut inner.layout);
            }
        }
    }
}

/// A reference-counted N-dimensional strided array.
///
/// `NdArray` is a handle: [`Clone`] increments the reference count and dropping a handle
/// decrements it. The data buffer is freed once no handle to the root or to any view of
/// it remains.
///
/// # Thread Safety
///
/// Metadata reads are safe from any thread. Layout mutators take an internal write lock
/// for the final swap only; callers must still serialize mutations of arrays sharing a
/// base chain, since validation reads the chain before the swap.
///
/// # Examples
///
/// ```rust
/// use kornia_ndarray::{NdArray, Order};
///
/// let a = NdArray::from_shape_vec(&[2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// assert_eq!(a.strides(), vec![24, 8]);
///
/// a.set_shape(&[3, 2], Order::C).unwrap();
/// assert_eq!(a.strides(), vec![16, 8]);
/// assert_eq!(a.get::<f64>(&[2, 1]), Some(6.0));
/// ```
#[derive(Clone)]
pub struct NdArray {
    inner: Arc<ArrayImpl>,
}

impl NdArray {
    fn from_parts(
        descr: Descriptor,
        base: ArrayBase,
        data_offset: usize,
        dims: DimStorage,
    ) -> Self {
        let owns_data = matches!(base, ArrayBase::Owned(_));
        let layout = ArrayLayout::new(dims, descr.itemsize(), owns_data);
        Self {
            inner: Arc::new(ArrayImpl {
                descr,
                base: ManuallyDrop::new(base),
                data_offset,
                layout: RwLock::new(layout),
            }),
        }
    }

    /// Allocates a zero-filled array with the system allocator.
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if the buffer or the dimension storage cannot be allocated.
    pub fn zeros(descr: Descriptor, shape: &[usize], order: Order) -> Result<Self, LayoutError> {
        Self::zeros_in(descr, shape, order, Arc::new(CpuAllocator))
    }

    /// Allocates a zero-filled array with a custom allocator.
    pub fn zeros_in(
        descr: Descriptor,
        shape: &[usize],
        order: Order,
        alloc: Arc<dyn ArrayAllocator>,
    ) -> Result<Self, LayoutError> {
        let dims = DimStorage::contiguous(shape, descr.itemsize(), order)?;
        let storage = ArrayStorage::zeroed(buffer_len(&dims, descr.itemsize())?, alloc)?;
        Ok(Self::from_parts(descr, ArrayBase::Owned(storage), 0, dims))
    }

    /// Creates a row-major array from a vector of elements.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the number of elements does not match the shape.
    ///
    /// # Example
    ///
    /// ```
    /// use kornia_ndarray::{DType, NdArray};
    ///
    /// let a = NdArray::from_shape_vec(&[2, 2], vec![1u8, 2, 3, 4]).unwrap();
    /// assert_eq!(a.descriptor().dtype(), DType::UInt8);
    /// assert_eq!(a.get::<u8>(&[1, 0]), Some(3));
    /// ```
    pub fn from_shape_vec<T: Element>(shape: &[usize], data: Vec<T>) -> Result<Self, LayoutError> {
        let numel = checked_numel(shape).unwrap_or(usize::MAX);
        if numel != data.len() {
            return Err(LayoutError::invalid_argument(format!(
                "Shape mismatch: expected {numel} elements for shape {shape:?}, but got {} elements in data",
                data.len()
            )));
        }
        let descr = Descriptor::from_type(T::DTYPE);
        let dims = DimStorage::contiguous(shape, descr.itemsize(), Order::C)?;
        let storage = ArrayStorage::from_vec(data, Arc::new(CpuAllocator))?;
        Ok(Self::from_parts(descr, ArrayBase::Owned(storage), 0, dims))
    }

    /// Creates an array over an externally owned buffer without copying it.
    ///
    /// When `strides` is `None` the layout is row-major. Such arrays can be viewed and
    /// reshaped but never restrided, since the array system cannot bound-check memory
    /// it does not own.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the layout does not fit in the buffer.
    pub fn from_buffer<B>(
        descr: Descriptor,
        shape: &[usize],
        strides: Option<&[isize]>,
        buffer: B,
    ) -> Result<Self, LayoutError>
    where
        B: AsRef<[u8]> + Send + Sync + 'static,
    {
        let dims = match strides {
            Some(strides) => DimStorage::new(shape, strides)?,
            None => DimStorage::contiguous(shape, descr.itemsize(), Order::C)?,
        };
        let storage = ArrayStorage::from_external(buffer);
        if !flags::check_strides(descr.itemsize(), storage.len(), 0, dims.shape(), dims.strides()) {
            return Err(LayoutError::invalid_argument(
                "buffer is too small for requested array",
            ));
        }
        Ok(Self::from_parts(descr, ArrayBase::Foreign(storage), 0, dims))
    }

    /// Creates a view sharing the buffer of `base`.
    ///
    /// The view starts `offset` bytes after the data pointer of `base`, interprets the
    /// memory with `descr` and records `base` as its base, which keeps the buffer alive.
    /// No data is copied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the shape and strides differ in length or if any
    /// element of the view would lie outside the root buffer.
    pub fn new_view(
        descr: Descriptor,
        shape: &[usize],
        strides: &[isize],
        base: &NdArray,
        offset: isize,
    ) -> Result<Self, LayoutError> {
        let dims = DimStorage::new(shape, strides)?;
        let data_offset = (base.inner.data_offset as isize)
            .checked_add(offset)
            .and_then(|o| usize::try_from(o).ok())
            .ok_or_else(|| {
                LayoutError::invalid_argument("view offset is outside the available memory")
            })?;
        let available = base.root_storage().len();
        if data_offset > available
            || !flags::check_strides(descr.itemsize(), available, data_offset, shape, strides)
        {
            return Err(LayoutError::invalid_argument(
                "view is not compatible with available memory",
            ));
        }
        log::trace!(
            "new view {} shape={:?} strides={:?} offset={}",
            descr,
            shape,
            strides,
            data_offset
        );
        let base = ArrayBase::ViewOf {
            base: base.clone(),
            offset,
        };
        Ok(Self::from_parts(descr, base, data_offset, dims))
    }

    /// Returns a view of the whole array with an identical layout.
    pub fn view(&self) -> Result<Self, LayoutError> {
        let dims = self.dims();
        Self::new_view(self.inner.descr, dims.shape(), dims.strides(), self, 0)
    }

    /// Copies the array into a new contiguous allocation.
    ///
    /// `Order::Any` keeps Fortran order for arrays that are Fortran- but not
    /// C-contiguous. The copy keeps the descriptor, byte order included.
    pub fn new_copy(&self, order: Order) -> Result<Self, LayoutError> {
        let order = self.resolve_order(order);
        let itemsize = self.itemsize();
        let src_dims = self.dims();
        let dst_dims = DimStorage::contiguous(src_dims.shape(), itemsize, order)?;
        let mut storage =
            ArrayStorage::zeroed(buffer_len(&dst_dims, itemsize)?, Arc::new(CpuAllocator))?;

        let src = self.root_storage().as_bytes();
        let src_base = self.inner.data_offset as isize;
        let mut complete = true;
        if let Some(dst) = storage.as_mut_bytes() {
            for_each_index(src_dims.shape(), |index| {
                let src_at = usize::try_from(src_base + linear_offset(index, src_dims.strides()));
                let dst_at = usize::try_from(linear_offset(index, dst_dims.strides()));
                let (Ok(src_at), Ok(dst_at)) = (src_at, dst_at) else {
                    complete = false;
                    return;
                };
                match (
                    src.get(src_at..src_at + itemsize),
                    dst.get_mut(dst_at..dst_at + itemsize),
                ) {
                    (Some(from), Some(to)) => to.copy_from_slice(from),
                    _ => complete = false,
                }
            });
        }
        if !complete {
            return Err(LayoutError::invalid_argument(
                "array is not compatible with available memory",
            ));
        }

        Ok(Self::from_parts(
            self.inner.descr,
            ArrayBase::Owned(storage),
            0,
            dst_dims,
        ))
    }

    pub(crate) fn resolve_order(&self, order: Order) -> Order {
        match order {
            Order::Any => {
                let flags = self.flags();
                if flags.is_f_contiguous() && !flags.is_c_contiguous() {
                    Order::Fortran
                } else {
                    Order::C
                }
            }
            order => order,
        }
    }

    pub(crate) fn read_layout(&self) -> RwLockReadGuard<'_, ArrayLayout> {
        self.inner
            .layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Swaps in a complete new layout and recomputes the flags.
    pub(crate) fn replace_layout(&self, dims: DimStorage) {
        let layout = ArrayLayout::new(dims, self.itemsize(), self.owns_data());
        let mut guard = self
            .inner
            .layout
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = layout;
    }

    /// The element descriptor.
    #[inline]
    pub fn descriptor(&self) -> Descriptor {
        self.inner.descr
    }

    /// Size of one element in bytes.
    #[inline]
    pub fn itemsize(&self) -> usize {
        self.inner.descr.itemsize()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.read_layout().dims.ndim()
    }

    /// A copy of the current shape.
    pub fn shape(&self) -> Vec<usize> {
        self.read_layout().dims.shape().to_vec()
    }

    /// A copy of the current byte strides.
    pub fn strides(&self) -> Vec<isize> {
        self.read_layout().dims.strides().to_vec()
    }

    /// A consistent snapshot of shape and strides.
    pub fn dims(&self) -> DimStorage {
        self.read_layout().dims.clone()
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.read_layout().dims.numel()
    }

    /// The flags derived from the current layout.
    pub fn flags(&self) -> ArrayFlags {
        self.read_layout().flags
    }

    /// Returns true if the layout is row-major contiguous.
    pub fn is_c_contiguous(&self) -> bool {
        self.flags().is_c_contiguous()
    }

    /// Returns true if the layout is column-major contiguous.
    pub fn is_f_contiguous(&self) -> bool {
        self.flags().is_f_contiguous()
    }

    /// Returns true when every stride is a whole number of elements.
    pub fn has_element_strides(&self) -> bool {
        let layout = self.read_layout();
        flags::has_element_strides(layout.dims.strides(), self.itemsize())
    }

    /// The ownership record of this array.
    #[inline]
    pub fn base(&self) -> &ArrayBase {
        &self.inner.base
    }

    /// Returns true if this array owns its buffer.
    #[inline]
    pub fn owns_data(&self) -> bool {
        matches!(*self.inner.base, ArrayBase::Owned(_))
    }

    /// Returns true if this array shares the buffer of a base array.
    #[inline]
    pub fn is_view(&self) -> bool {
        matches!(*self.inner.base, ArrayBase::ViewOf { .. })
    }

    /// Follows the base chain to the array that holds the buffer.
    pub fn root(&self) -> &NdArray {
        let mut current = self;
        while let ArrayBase::ViewOf { base, .. } = &*current.inner.base {
            current = base;
        }
        current
    }

    pub(crate) fn root_storage(&self) -> &ArrayStorage {
        let mut current = self;
        loop {
            match &*current.inner.base {
                ArrayBase::Owned(storage) | ArrayBase::Foreign(storage) => return storage,
                ArrayBase::ViewOf { base, .. } => current = base,
            }
        }
    }

    /// The storage held by the root of the base chain.
    pub fn storage(&self) -> ArrayStorage {
        self.root_storage().clone()
    }

    /// Distance in bytes from the start of the root buffer to the data pointer.
    #[inline]
    pub fn data_offset(&self) -> usize {
        self.inner.data_offset
    }

    /// The data pointer.
    ///
    /// Meant for identity comparisons; element access goes through [`NdArray::get`].
    pub fn as_ptr(&self) -> *const u8 {
        self.root_storage()
            .as_ptr()
            .wrapping_add(self.inner.data_offset)
    }

    /// Number of live handles to this array, views holding it as base included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns true if both handles refer to the same array object.
    pub fn ptr_eq(a: &NdArray, b: &NdArray) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Byte offset of the element at `index` relative to the data pointer.
    ///
    /// Returns `None` if the index has the wrong length or is out of bounds.
    pub fn byte_offset(&self, index: &[usize]) -> Option<isize> {
        let layout = self.read_layout();
        let shape = layout.dims.shape();
        if index.len() != shape.len() || index.iter().zip(shape).any(|(&i, &d)| i >= d) {
            return None;
        }
        Some(linear_offset(index, layout.dims.strides()))
    }

    /// Reads the element at `index`, converting from the stored byte order.
    ///
    /// Returns `None` if the index is out of bounds or `T` does not match the dtype.
    pub fn get<T: Element>(&self, index: &[usize]) -> Option<T> {
        if T::DTYPE != self.inner.descr.dtype() {
            return None;
        }
        let offset = self.byte_offset(index)?;
        let at = usize::try_from(self.inner.data_offset as isize + offset).ok()?;
        let bytes = self
            .root_storage()
            .as_bytes()
            .get(at..at + std::mem::size_of::<T>())?;
        let value: T = bytemuck::pod_read_unaligned(bytes);
        if self.inner.descr.is_native_byteorder() {
            Some(value)
        } else {
            Some(value.swap_bytes())
        }
    }

    /// Collects all elements in row-major index order.
    ///
    /// Returns `None` if `T` does not match the dtype.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if T::DTYPE != self.inner.descr.dtype() {
            return None;
        }
        let shape = self.shape();
        let mut out = Vec::new();
        out.try_reserve_exact(checked_numel(&shape)?).ok()?;
        let mut complete = true;
        for_each_index(&shape, |index| match self.get::<T>(index) {
            Some(v) => out.push(v),
            None => complete = false,
        });
        complete.then_some(out)
    }
}

impl std::fmt::Debug for NdArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layout = self.read_layout();
        f.debug_struct("NdArray")
            .field("descr", &self.inner.descr)
            .field("shape", &layout.dims.shape())
            .field("strides", &layout.dims.strides())
            .field("flags", &layout.flags)
            .field("data_offset", &self.inner.data_offset)
            .field("is_view", &self.is_view())
            .finish()
    }
}

fn buffer_len(dims: &DimStorage, itemsize: usize) -> Result<usize, LayoutError> {
    dims.numel()
        .checked_mul(itemsize)
        .ok_or_else(|| LayoutError::out_of_memory("array is too big"))
}

/// Byte offset of `index` under `strides`.
pub(crate) fn linear_offset(index: &[usize], strides: &[isize]) -> isize {
    index
        .iter()
        .zip(strides)
        .fold(0, |acc, (&i, &s)| acc + i as isize * s)
}

/// Calls `f` for every index of `shape` in row-major order.
pub(crate) fn for_each_index(shape: &[usize], mut f: impl FnMut(&[usize])) {
    if shape.iter().any(|&d| d == 0) {
        return;
    }
    let mut index = vec![0usize; shape.len()];
    loop {
        f(&index);
        let mut axis = shape.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
}
