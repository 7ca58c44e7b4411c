//! Real and imaginary component views of complex arrays.

use crate::{array::NdArray, descriptor::Descriptor, error::LayoutError};

#[derive(Clone, Copy)]
enum Component {
    Real,
    Imag,
}

impl NdArray {
    /// Returns a view of the real parts of a complex array.
    ///
    /// For a non-complex array this is another handle to the same array.
    ///
    /// # Example
    ///
    /// ```
    /// use kornia_ndarray::{DType, NdArray};
    /// use num_complex::Complex64;
    ///
    /// let z = NdArray::from_shape_vec(&[2], vec![Complex64::new(1.0, -1.0); 2]).unwrap();
    /// let re = z.get_real().unwrap();
    /// assert_eq!(re.descriptor().dtype(), DType::Float64);
    /// assert_eq!(re.strides(), vec![16]);
    /// assert_eq!(re.to_vec::<f64>(), Some(vec![1.0, 1.0]));
    /// ```
    pub fn get_real(&self) -> Result<NdArray, LayoutError> {
        self.component(Component::Real)
    }

    /// Returns a view of the imaginary parts of a complex array.
    ///
    /// The view starts one real itemsize into each element. For a non-complex array this
    /// is another handle to the same array.
    pub fn get_imag(&self) -> Result<NdArray, LayoutError> {
        self.component(Component::Imag)
    }

    fn component(&self, part: Component) -> Result<NdArray, LayoutError> {
        let src = self.descriptor();
        let Some(real) = src.dtype().real_type() else {
            return Ok(self.clone());
        };

        let mut descr = Descriptor::from_type(real);
        if !src.is_native_byteorder() {
            descr = descr.with_byteorder(src.byteorder());
        }
        let offset = match part {
            Component::Real => 0,
            Component::Imag => descr.itemsize() as isize,
        };

        let dims = self.dims();
        NdArray::new_view(descr, dims.shape(), dims.strides(), self, offset)
    }
}
