//! Contiguity flags and memory bounds utilities.
//!
//! Flags are a pure function of `(shape, strides, itemsize)` plus ownership. They are
//! recomputed from scratch after every successful layout mutation.

use std::ops::{BitOr, BitOrAssign};

/// Bitset of array properties derived from the layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArrayFlags(u32);

impl ArrayFlags {
    /// Strides match the row-major layout of the shape.
    pub const C_CONTIGUOUS: Self = Self(0x1);
    /// Strides match the column-major layout of the shape.
    pub const F_CONTIGUOUS: Self = Self(0x2);
    /// The array is the root of its chain and owns the data buffer.
    pub const OWNDATA: Self = Self(0x4);

    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bit value.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets or clears the bits of `other`.
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    /// Shorthand for `contains(ArrayFlags::C_CONTIGUOUS)`.
    pub const fn is_c_contiguous(&self) -> bool {
        self.contains(Self::C_CONTIGUOUS)
    }

    /// Shorthand for `contains(ArrayFlags::F_CONTIGUOUS)`.
    pub const fn is_f_contiguous(&self) -> bool {
        self.contains(Self::F_CONTIGUOUS)
    }
}

impl BitOr for ArrayFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ArrayFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Debug for ArrayFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayFlags")
            .field("c_contiguous", &self.is_c_contiguous())
            .field("f_contiguous", &self.is_f_contiguous())
            .field("owndata", &self.contains(Self::OWNDATA))
            .finish()
    }
}

fn is_contiguous<'a>(
    dims: impl Iterator<Item = (&'a usize, &'a isize)> + Clone,
    itemsize: usize,
) -> bool {
    if dims.clone().any(|(&dim, _)| dim == 0) {
        return true;
    }
    let mut expected = itemsize as isize;
    for (&dim, &stride) in dims {
        // unit dimensions never move the pointer, so their stride is irrelevant
        if dim != 1 && stride != expected {
            return false;
        }
        expected *= dim as isize;
    }
    true
}

/// Returns true if the layout is row-major contiguous.
pub fn is_c_contiguous(shape: &[usize], strides: &[isize], itemsize: usize) -> bool {
    is_contiguous(shape.iter().zip(strides).rev(), itemsize)
}

/// Returns true if the layout is column-major contiguous.
pub fn is_f_contiguous(shape: &[usize], strides: &[isize], itemsize: usize) -> bool {
    is_contiguous(shape.iter().zip(strides), itemsize)
}

/// Computes the contiguity bits for a layout.
///
/// Rank-0 and empty layouts are both C- and Fortran-contiguous.
pub fn contiguity_flags(shape: &[usize], strides: &[isize], itemsize: usize) -> ArrayFlags {
    let mut flags = ArrayFlags::empty();
    flags.set(
        ArrayFlags::C_CONTIGUOUS,
        is_c_contiguous(shape, strides, itemsize),
    );
    flags.set(
        ArrayFlags::F_CONTIGUOUS,
        is_f_contiguous(shape, strides, itemsize),
    );
    flags
}

/// Returns the byte range `[lower, upper)` touched by a layout, relative to its data
/// pointer.
///
/// Returns `None` when the layout holds no elements or the extent overflows `isize`.
pub fn memory_extents(shape: &[usize], strides: &[isize], itemsize: usize) -> Option<(isize, isize)> {
    if shape.iter().any(|&d| d == 0) {
        return None;
    }
    let mut lower: isize = 0;
    let mut upper: isize = isize::try_from(itemsize).ok()?;
    for (&dim, &stride) in shape.iter().zip(strides) {
        let span = stride.checked_mul(isize::try_from(dim - 1).ok()?)?;
        if span >= 0 {
            upper = upper.checked_add(span)?;
        } else {
            lower = lower.checked_add(span)?;
        }
    }
    Some((lower, upper))
}

/// Checks that `strides` keep every element of `shape` inside an allocation.
///
/// `numbytes` is the size of the owning allocation and `offset` the byte distance from
/// its start to the data pointer of the array being checked. Layouts with no elements
/// are always accepted.
pub fn check_strides(
    itemsize: usize,
    numbytes: usize,
    offset: usize,
    shape: &[usize],
    strides: &[isize],
) -> bool {
    if shape.len() != strides.len() {
        return false;
    }
    if shape.iter().any(|&d| d == 0) {
        return true;
    }
    let (Ok(numbytes), Ok(offset)) = (isize::try_from(numbytes), isize::try_from(offset)) else {
        return false;
    };
    match memory_extents(shape, strides, itemsize) {
        Some((lower, upper)) => {
            offset.checked_add(lower).is_some_and(|begin| begin >= 0)
                && offset.checked_add(upper).is_some_and(|end| end <= numbytes)
        }
        None => false,
    }
}

/// Returns true when every stride is a whole multiple of the itemsize.
pub fn has_element_strides(strides: &[isize], itemsize: usize) -> bool {
    let itemsize = itemsize as isize;
    itemsize != 0 && strides.iter().all(|s| s % itemsize == 0)
}
