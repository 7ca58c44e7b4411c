//! Dimension and stride storage.

use crate::error::LayoutError;

/// Memory order of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Order {
    /// Row-major, the last index varies fastest.
    #[default]
    C,
    /// Column-major, the first index varies fastest.
    Fortran,
    /// Fortran when the array is Fortran- but not C-contiguous, C otherwise.
    Any,
}

/// The shape and strides of an array.
///
/// Both sequences always have the same length, the array's dimension count. A value is
/// only ever replaced as a whole, never edited one field at a time by the mutators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DimStorage {
    shape: Vec<usize>,
    strides: Vec<isize>,
}

impl DimStorage {
    /// Builds the storage from an existing shape and stride pair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the lengths differ and `OutOfMemory` if the storage
    /// cannot be allocated.
    pub fn new(shape: &[usize], strides: &[isize]) -> Result<Self, LayoutError> {
        if shape.len() != strides.len() {
            return Err(LayoutError::invalid_argument(
                "strides must be same length as shape",
            ));
        }
        let mut dims = alloc_dims(shape.len())?;
        dims.shape.extend_from_slice(shape);
        dims.strides.extend_from_slice(strides);
        Ok(dims)
    }

    /// Builds contiguous storage for `shape` in the given order.
    ///
    /// `Order::Any` is treated as `Order::C`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` if the strides do not fit in `isize`.
    pub fn contiguous(shape: &[usize], itemsize: usize, order: Order) -> Result<Self, LayoutError> {
        let strides = contiguous_strides(shape, itemsize, order)
            .ok_or_else(|| LayoutError::out_of_memory("array is too big"))?;
        Self::new(shape, &strides)
    }

    /// Number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Per-dimension extents.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Per-dimension byte strides.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Total number of elements, saturating at `usize::MAX`.
    #[inline]
    pub fn numel(&self) -> usize {
        checked_numel(&self.shape).unwrap_or(usize::MAX)
    }

    /// Returns a copy holding `strides` in place of the current strides.
    pub(crate) fn with_strides(&self, strides: &[isize]) -> Result<Self, LayoutError> {
        Self::new(&self.shape, strides)
    }
}

/// Reserves empty dimension storage for `count` dimensions.
///
/// Rank-0 arrays get storage with no capacity at all.
///
/// # Errors
///
/// Returns `OutOfMemory` when the reservation fails.
pub fn alloc_dims(count: usize) -> Result<DimStorage, LayoutError> {
    let mut shape = Vec::new();
    let mut strides = Vec::new();
    if count > 0 {
        shape.try_reserve_exact(count)?;
        strides.try_reserve_exact(count)?;
    }
    Ok(DimStorage { shape, strides })
}

/// Number of elements described by `shape`, or `None` if it overflows `usize`.
///
/// A zero extent anywhere yields zero, whatever the other extents are.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Computes contiguous byte strides for `shape`.
///
/// Dimensions of extent zero contribute a factor of one so that strides stay meaningful
/// for empty arrays. Returns `None` if a stride does not fit in `isize`.
///
/// # Examples
///
/// ```rust
/// use kornia_ndarray::dims::{contiguous_strides, Order};
///
/// assert_eq!(contiguous_strides(&[2, 3], 8, Order::C), Some(vec![24, 8]));
/// assert_eq!(contiguous_strides(&[2, 3], 8, Order::Fortran), Some(vec![8, 16]));
/// assert_eq!(contiguous_strides(&[0, 1 << 40, 1 << 40], 8, Order::C), None);
/// ```
pub fn contiguous_strides(shape: &[usize], itemsize: usize, order: Order) -> Option<Vec<isize>> {
    let mut strides = vec![0isize; shape.len()];
    let axes: Vec<usize> = match order {
        Order::Fortran => (0..shape.len()).collect(),
        Order::C | Order::Any => (0..shape.len()).rev().collect(),
    };
    let mut stride = isize::try_from(itemsize).ok()?;
    for (i, &axis) in axes.iter().enumerate() {
        strides[axis] = stride;
        if i + 1 < axes.len() {
            stride = stride.checked_mul(isize::try_from(shape[axis].max(1)).ok()?)?;
        }
    }
    Some(strides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_dims_rank_zero() -> Result<(), LayoutError> {
        let dims = alloc_dims(0)?;
        assert_eq!(dims.ndim(), 0);
        assert_eq!(dims.numel(), 1);
        Ok(())
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let err = DimStorage::new(&[2, 3], &[8]);
        assert!(matches!(err, Err(LayoutError::InvalidArgument(_))));
    }

    #[test]
    fn alloc_dims_huge_is_out_of_memory() {
        let err = alloc_dims(usize::MAX / 2);
        assert!(matches!(err, Err(LayoutError::OutOfMemory(_))));
    }

    #[test]
    fn contiguous_c_and_fortran() -> Result<(), LayoutError> {
        let c = DimStorage::contiguous(&[2, 3, 4], 4, Order::C)?;
        assert_eq!(c.strides(), &[48, 16, 4]);
        let f = DimStorage::contiguous(&[2, 3, 4], 4, Order::Fortran)?;
        assert_eq!(f.strides(), &[4, 8, 24]);
        Ok(())
    }

    #[test]
    fn contiguous_with_empty_dim() {
        assert_eq!(contiguous_strides(&[0, 3], 8, Order::C), Some(vec![24, 8]));
    }

    #[test]
    fn contiguous_overflow_is_an_error() {
        assert_eq!(contiguous_strides(&[0, 1 << 40, 1 << 40], 8, Order::C), None);
        assert_eq!(contiguous_strides(&[1 << 40, 1 << 40, 0], 8, Order::Fortran), None);
        let err = DimStorage::contiguous(&[0, 1 << 40, 1 << 40], 8, Order::C);
        assert_eq!(err, Err(LayoutError::out_of_memory("array is too big")));
    }

    #[test]
    fn numel_of_huge_empty_shape() {
        assert_eq!(checked_numel(&[1 << 40, 1 << 40, 0]), Some(0));
        assert_eq!(checked_numel(&[1 << 40, 1 << 40]), None);
        assert_eq!(checked_numel(&[]), Some(1));
    }
}
