//! Reshape algorithms consumed by [`NdArray::set_shape`].

use crate::{
    array::NdArray,
    dims::{checked_numel, contiguous_strides, Order},
    error::{LayoutError, ReshapeError},
};

/// Computes a new shape and stride assignment for an array.
///
/// An implementation returns a candidate array with the requested shape. The candidate
/// either addresses the same data as the source (a view) or a copy of it; callers that
/// need a copy-free result compare data pointers.
pub trait Reshape {
    /// Reshapes `array` to `shape` using the memory order `order`.
    ///
    /// # Errors
    ///
    /// Returns `ReshapeError::SizeMismatch` if `shape` holds a different number of
    /// elements than `array`.
    fn reshape(&self, array: &NdArray, shape: &[usize], order: Order)
        -> Result<NdArray, ReshapeError>;
}

/// The default reshape algorithm.
///
/// Returns a view whenever the requested shape can be expressed with strides over the
/// existing buffer, and a contiguous copy in the requested order otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Newshape;

impl Reshape for Newshape {
    fn reshape(
        &self,
        array: &NdArray,
        shape: &[usize],
        order: Order,
    ) -> Result<NdArray, ReshapeError> {
        let order = array.resolve_order(order);
        let dims = array.dims();
        let expected = checked_numel(shape).unwrap_or(usize::MAX);
        if expected != dims.numel() {
            return Err(ReshapeError::SizeMismatch {
                shape: shape.to_vec(),
                expected,
                actual: dims.numel(),
            });
        }

        let itemsize = array.itemsize();
        let flags = array.flags();
        let contiguous_in_order = match order {
            Order::Fortran => flags.is_f_contiguous(),
            Order::C | Order::Any => flags.is_c_contiguous(),
        };
        let strides = if expected == 0 || contiguous_in_order {
            Some(contiguous_layout(shape, itemsize, order)?)
        } else {
            attempt_nocopy_reshape(dims.shape(), dims.strides(), shape, order, itemsize)
        };

        let candidate = match strides {
            Some(strides) => NdArray::new_view(array.descriptor(), shape, &strides, array, 0)?,
            None => {
                let copy = array.new_copy(order)?;
                let strides = contiguous_layout(shape, itemsize, order)?;
                NdArray::new_view(copy.descriptor(), shape, &strides, &copy, 0)?
            }
        };
        Ok(candidate)
    }
}

fn contiguous_layout(
    shape: &[usize],
    itemsize: usize,
    order: Order,
) -> Result<Vec<isize>, LayoutError> {
    contiguous_strides(shape, itemsize, order)
        .ok_or_else(|| LayoutError::out_of_memory("array is too big"))
}

/// Tries to express `new_shape` over the memory of an existing layout.
///
/// Axes of extent one are ignored. Each run of old axes that is merged or split must be
/// contiguous among itself in the requested order. Returns `None` when that is not the
/// case, meaning a copy is needed.
fn attempt_nocopy_reshape(
    old_shape: &[usize],
    old_strides: &[isize],
    new_shape: &[usize],
    order: Order,
    itemsize: usize,
) -> Option<Vec<isize>> {
    let (old_dims, old_strides): (Vec<usize>, Vec<isize>) = old_shape
        .iter()
        .zip(old_strides)
        .filter(|(&d, _)| d != 1)
        .map(|(&d, &s)| (d, s))
        .unzip();
    let fortran = order == Order::Fortran;
    let old_nd = old_dims.len();
    let new_nd = new_shape.len();
    let mut new_strides = vec![0isize; new_nd];

    let (mut oi, mut oj, mut ni, mut nj) = (0, 1, 0, 1);
    while ni < new_nd && oi < old_nd {
        let mut np = new_shape[ni];
        let mut op = old_dims[oi];
        while np != op {
            if np < op {
                np *= *new_shape.get(nj)?;
                nj += 1;
            } else {
                op *= *old_dims.get(oj)?;
                oj += 1;
            }
        }

        for ok in oi..oj - 1 {
            let merged = if fortran {
                old_strides[ok + 1] == old_dims[ok] as isize * old_strides[ok]
            } else {
                old_strides[ok] == old_dims[ok + 1] as isize * old_strides[ok + 1]
            };
            if !merged {
                return None;
            }
        }

        if fortran {
            new_strides[ni] = old_strides[oi];
            for nk in ni + 1..nj {
                new_strides[nk] = new_strides[nk - 1] * new_shape[nk - 1] as isize;
            }
        } else {
            new_strides[nj - 1] = old_strides[oj - 1];
            for nk in (ni + 1..nj).rev() {
                new_strides[nk - 1] = new_strides[nk] * new_shape[nk] as isize;
            }
        }
        ni = nj;
        nj += 1;
        oi = oj;
        oj += 1;
    }

    // trailing unit axes
    let last_stride = if ni >= 1 {
        let factor = if fortran { new_shape[ni - 1] as isize } else { 1 };
        new_strides[ni - 1] * factor
    } else {
        itemsize as isize
    };
    for stride in new_strides.iter_mut().skip(ni) {
        *stride = last_stride;
    }
    Some(new_strides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DType, Descriptor};

    #[test]
    fn contiguous_reshape_is_a_view() -> Result<(), LayoutError> {
        let a = NdArray::from_shape_vec(&[2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let r = Newshape.reshape(&a, &[3, 2], Order::C)?;
        assert_eq!(r.strides(), vec![16, 8]);
        assert_eq!(r.as_ptr(), a.as_ptr());
        assert!(r.is_view());
        Ok(())
    }

    #[test]
    fn size_mismatch_is_reported() -> Result<(), LayoutError> {
        let a = NdArray::from_shape_vec(&[2, 3], vec![0u8; 6])?;
        let err = Newshape.reshape(&a, &[4, 2], Order::C);
        assert!(matches!(
            err,
            Err(ReshapeError::SizeMismatch {
                expected: 8,
                actual: 6,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn huge_empty_shape_is_out_of_memory() -> Result<(), LayoutError> {
        let a = NdArray::zeros(Descriptor::from_type(DType::Float64), &[0], Order::C)?;
        let err = Newshape.reshape(&a, &[0, 1 << 40, 1 << 40], Order::C);
        assert_eq!(
            err.map(|_| ()),
            Err(ReshapeError::Layout(LayoutError::out_of_memory(
                "array is too big"
            )))
        );
        Ok(())
    }

    #[test]
    fn strided_view_reshapes_without_copy() -> Result<(), LayoutError> {
        // every other row of a 4x3 int32 array
        let a = NdArray::from_shape_vec(&[4, 3], (0..12).collect::<Vec<i32>>())?;
        let rows = NdArray::new_view(a.descriptor(), &[2, 3], &[24, 4], &a, 0)?;
        assert!(!rows.is_c_contiguous());
        let r = Newshape.reshape(&rows, &[2, 3, 1], Order::C)?;
        assert_eq!(r.as_ptr(), rows.as_ptr());
        assert_eq!(r.strides()[..2], [24, 4]);

        let split = Newshape.reshape(&rows, &[2, 1, 3], Order::C)?;
        assert_eq!(split.as_ptr(), rows.as_ptr());
        assert_eq!(split.to_vec::<i32>(), Some(vec![0, 1, 2, 6, 7, 8]));
        Ok(())
    }

    #[test]
    fn transposed_needs_copy_in_c_order() -> Result<(), LayoutError> {
        let a = NdArray::from_shape_vec(&[2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let t = NdArray::new_view(a.descriptor(), &[3, 2], &[8, 24], &a, 0)?;

        let copied = Newshape.reshape(&t, &[6], Order::C)?;
        assert_ne!(copied.as_ptr(), t.as_ptr());
        assert_eq!(copied.to_vec::<f64>(), Some(vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]));

        let viewed = Newshape.reshape(&t, &[6], Order::Fortran)?;
        assert_eq!(viewed.as_ptr(), t.as_ptr());
        assert_eq!(viewed.strides(), vec![8]);
        Ok(())
    }

    #[test]
    fn nocopy_splits_and_merges() {
        // C layout [2, 3, 4] of 4-byte items merged to [6, 4] and split to [2, 3, 2, 2]
        let strides = [48, 16, 4];
        assert_eq!(
            attempt_nocopy_reshape(&[2, 3, 4], &strides, &[6, 4], Order::C, 4),
            Some(vec![16, 4])
        );
        assert_eq!(
            attempt_nocopy_reshape(&[2, 3, 4], &strides, &[2, 3, 2, 2], Order::C, 4),
            Some(vec![48, 16, 8, 4])
        );
        // non-mergeable axes
        assert_eq!(
            attempt_nocopy_reshape(&[2, 3], &[4, 16], &[6], Order::C, 4),
            None
        );
    }
}
