#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `kornia-ndarray` holds the memory-layout core of an N-dimensional strided array: the
//! shape and byte strides that map indices to memory, the contiguity flags derived from
//! them, and the base chain that lets views share a buffer with the array that owns it.
//!
//! # Architecture
//!
//! - **NdArray**: reference-counted handle carrying a descriptor, a layout and a base
//! - **ArrayBase**: ownership record, either a root holding the storage or a view of a base
//! - **DimStorage**: the shape and stride pair, replaced as a whole by every mutator
//! - **ArrayFlags**: contiguity and ownership bits, recomputed after every layout change
//! - **Reshape**: pluggable reshape algorithm used by [`NdArray::set_shape`]
//!
//! # Quick Start
//!
//! ```rust
//! use kornia_ndarray::{NdArray, Order};
//!
//! let a = NdArray::from_shape_vec(&[2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//!
//! // reinterpret the buffer in place
//! a.set_shape(&[3, 2], Order::C).unwrap();
//! assert_eq!(a.strides(), vec![16, 8]);
//!
//! // column-major strides over the same six elements
//! a.set_strides(&[8, 24]).unwrap();
//! assert!(a.is_f_contiguous());
//! assert_eq!(a.get::<f64>(&[1, 0]), Some(2.0));
//! ```
//!
//! Complex arrays expose their components as views:
//!
//! ```rust
//! use kornia_ndarray::NdArray;
//! use num_complex::Complex64;
//!
//! let z = NdArray::from_shape_vec(&[3], vec![Complex64::new(1.0, 2.0); 3]).unwrap();
//! let im = z.get_imag().unwrap();
//! assert_eq!(im.strides(), vec![16]);
//! assert_eq!(im.to_vec::<f64>(), Some(vec![2.0; 3]));
//! ```

/// Allocator module containing memory management utilities.
///
/// This module provides the [`ArrayAllocator`] trait and the default [`CpuAllocator`].
pub mod allocator;

/// Array module containing the array handle, its constructors and the view constructor.
pub mod array;

/// Real and imaginary component views.
pub mod component;

/// Element descriptors and the scalar types that map onto them.
pub mod descriptor;

/// Shape and stride storage.
pub mod dims;

/// Error types.
pub mod error;

/// Contiguity flags and stride bounds checking.
pub mod flags;

/// In-place shape and stride mutation.
pub mod layout;

/// Reshape algorithms.
pub mod reshape;

/// Storage module containing the raw data buffers.
///
/// This module provides [`storage::ArrayStorage`], shared by an owning array and every
/// view of it.
pub mod storage;

pub use crate::allocator::{ArrayAllocator, CpuAllocator};
pub use crate::array::{ArrayBase, NdArray};
pub use crate::descriptor::{ByteOrder, DType, Descriptor, Element};
pub use crate::dims::{DimStorage, Order};
pub use crate::error::{LayoutError, ReshapeError};
pub use crate::flags::ArrayFlags;
pub use crate::reshape::{Newshape, Reshape};
pub use crate::storage::ArrayStorage;
