//! In-place shape and stride mutation.
//!
//! Both mutators build the complete replacement layout first, validate it and only then
//! swap it in. On any error the target keeps its previous shape, strides and flags.

use crate::{
    array::{ArrayBase, NdArray},
    dims::{DimStorage, Order},
    error::LayoutError,
    flags,
    reshape::{Newshape, Reshape},
};

impl NdArray {
    /// Reinterprets the array's buffer under a new shape without moving data.
    ///
    /// Uses the default [`Newshape`] algorithm. See [`NdArray::set_shape_with`].
    ///
    /// # Example
    ///
    /// ```
    /// use kornia_ndarray::{LayoutError, NdArray, Order};
    ///
    /// let a = NdArray::from_shape_vec(&[2, 3], vec![0.0f64; 6]).unwrap();
    /// a.set_shape(&[3, 2], Order::C).unwrap();
    /// assert_eq!(a.shape(), vec![3, 2]);
    ///
    /// let err = a.set_shape(&[4, 2], Order::C).unwrap_err();
    /// assert!(matches!(err, LayoutError::IncompatibleLayout(_)));
    /// assert_eq!(a.shape(), vec![3, 2]);
    /// ```
    pub fn set_shape(&self, shape: &[usize], order: Order) -> Result<(), LayoutError> {
        self.set_shape_with(shape, order, &Newshape)
    }

    /// Reinterprets the array's buffer under a new shape using `reshaper`.
    ///
    /// The candidate produced by `reshaper` must address the same data pointer in the same
    /// storage as this array; a candidate backed by a copy is released and the call fails.
    /// Its layout is only adopted if it uses this array's itemsize and stays inside the
    /// root allocation.
    ///
    /// # Errors
    ///
    /// - errors of the reshape algorithm, converted to [`LayoutError`]
    /// - `IncompatibleLayout` if no copy-free reinterpretation exists for `order`, or if the
    ///   candidate's layout does not fit this array
    /// - `OutOfMemory` if the new dimension storage cannot be allocated
    pub fn set_shape_with<R: Reshape + ?Sized>(
        &self,
        shape: &[usize],
        order: Order,
        reshaper: &R,
    ) -> Result<(), LayoutError> {
        let candidate = reshaper.reshape(self, shape, order)?;
        // empty allocations all share one dangling pointer
        let same_storage = candidate.root_storage().ptr_eq(self.root_storage());
        if candidate.as_ptr() != self.as_ptr() || !same_storage {
            log::warn!(
                "set_shape {:?} -> {:?} ({:?}) would copy the data",
                self.shape(),
                shape,
                order
            );
            return Err(LayoutError::incompatible_layout(
                "incompatible shape for a non-contiguous array",
            ));
        }

        let layout = candidate.dims();
        let (numbytes, offset) = self.available_bytes();
        if candidate.itemsize() != self.itemsize()
            || !flags::check_strides(
                self.itemsize(),
                numbytes,
                offset,
                layout.shape(),
                layout.strides(),
            )
        {
            return Err(LayoutError::incompatible_layout(
                "reshaped layout is not compatible with the array",
            ));
        }
        let dims = DimStorage::new(layout.shape(), layout.strides())?;
        drop(candidate);

        log::debug!(
            "set_shape {:?} -> {:?} strides={:?}",
            self.shape(),
            dims.shape(),
            dims.strides()
        );
        self.replace_layout(dims);
        Ok(())
    }

    /// Replaces the strides in place.
    ///
    /// The new strides are accepted only if every element stays inside the allocation
    /// owned by the root of the base chain.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the number of strides differs from the number of
    /// dimensions, if the root wraps an external buffer, or if some element would fall
    /// outside the owning allocation.
    ///
    /// # Example
    ///
    /// ```
    /// use kornia_ndarray::{NdArray, Order};
    ///
    /// let a = NdArray::from_shape_vec(&[2, 3], vec![1u16, 2, 3, 4, 5, 6]).unwrap();
    /// a.set_strides(&[2, 4]).unwrap();
    /// assert!(a.is_f_contiguous());
    /// assert!(a.set_strides(&[8, 2]).is_err());
    /// ```
    pub fn set_strides(&self, strides: &[isize]) -> Result<(), LayoutError> {
        let dims = self.dims();
        if strides.len() != dims.ndim() {
            return Err(LayoutError::invalid_argument(
                "strides must be same length as shape",
            ));
        }

        if let ArrayBase::Foreign(_) = self.root().base() {
            return Err(LayoutError::invalid_argument(
                "strides cannot be set on array created from a buffer",
            ));
        }
        let (numbytes, offset) = self.available_bytes();

        if !flags::check_strides(self.itemsize(), numbytes, offset, dims.shape(), strides) {
            return Err(LayoutError::invalid_argument(
                "strides is not compatible with available memory",
            ));
        }

        let dims = dims.with_strides(strides)?;
        log::debug!("set_strides {:?} shape={:?}", strides, dims.shape());
        self.replace_layout(dims);
        Ok(())
    }

    /// Bytes owned by the root of the chain and this array's offset into them.
    fn available_bytes(&self) -> (usize, usize) {
        let root = self.root();
        let numbytes = root
            .numel()
            .checked_mul(root.itemsize())
            .map_or(0, |n| n.min(root.root_storage().len()));
        (numbytes, self.data_offset() - root.data_offset())
    }
}
