//! Element descriptors.
//!
//! A [`Descriptor`] tells the layout code how large one element is and in which byte
//! order it is stored. The layout and view code treats it as opaque apart from
//! [`Descriptor::itemsize`], [`Descriptor::byteorder`] and the complex/real pairing used
//! by component extraction.

use num_complex::Complex;

/// Element types an array can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    /// Boolean stored in one byte.
    Bool,
    /// Signed 8 bit integer.
    Int8,
    /// Signed 16 bit integer.
    Int16,
    /// Signed 32 bit integer.
    Int32,
    /// Signed 64 bit integer.
    Int64,
    /// Unsigned 8 bit integer.
    UInt8,
    /// Unsigned 16 bit integer.
    UInt16,
    /// Unsigned 32 bit integer.
    UInt32,
    /// Unsigned 64 bit integer.
    UInt64,
    /// Single precision float.
    Float32,
    /// Double precision float.
    Float64,
    /// Complex number made of two `Float32`.
    Complex64,
    /// Complex number made of two `Float64`.
    Complex128,
}

impl DType {
    /// Size of one element in bytes.
    pub const fn itemsize(&self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 | DType::Complex64 => 8,
            DType::Complex128 => 16,
        }
    }

    /// Returns true for the complex types.
    pub const fn is_complex(&self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    /// The real scalar type making up each half of a complex type.
    ///
    /// Returns `None` for non-complex types.
    pub const fn real_type(&self) -> Option<DType> {
        match self {
            DType::Complex64 => Some(DType::Float32),
            DType::Complex128 => Some(DType::Float64),
            _ => None,
        }
    }

    /// NumPy compatible name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Byte order of the elements described by a [`Descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteOrder {
    /// Whatever the platform uses (`=`).
    Native,
    /// Little endian (`<`).
    Little,
    /// Big endian (`>`).
    Big,
    /// Byte order is meaningless for single byte types (`|`).
    NotApplicable,
}

impl ByteOrder {
    /// Returns true when data in this order can be read without swapping bytes.
    pub fn is_native(&self) -> bool {
        match self {
            ByteOrder::Native | ByteOrder::NotApplicable => true,
            ByteOrder::Little => cfg!(target_endian = "little"),
            ByteOrder::Big => cfg!(target_endian = "big"),
        }
    }

    /// The single character code used by NumPy type strings.
    pub fn as_char(&self) -> char {
        match self {
            ByteOrder::Native => '=',
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::NotApplicable => '|',
        }
    }
}

/// Describes the element type, size and byte order of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Descriptor {
    dtype: DType,
    byteorder: ByteOrder,
}

impl Descriptor {
    /// Returns the native descriptor for the given type.
    ///
    /// Single byte types get [`ByteOrder::NotApplicable`], everything else
    /// [`ByteOrder::Native`].
    pub fn from_type(dtype: DType) -> Self {
        let byteorder = if dtype.itemsize() == 1 {
            ByteOrder::NotApplicable
        } else {
            ByteOrder::Native
        };
        Self { dtype, byteorder }
    }

    /// Returns a copy of this descriptor with its byte order overridden.
    ///
    /// Single byte types keep [`ByteOrder::NotApplicable`].
    pub fn with_byteorder(&self, byteorder: ByteOrder) -> Self {
        if self.byteorder == ByteOrder::NotApplicable {
            return *self;
        }
        Self {
            dtype: self.dtype,
            byteorder,
        }
    }

    /// The element type.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The byte order of stored elements.
    #[inline]
    pub fn byteorder(&self) -> ByteOrder {
        self.byteorder
    }

    /// Size of one element in bytes.
    #[inline]
    pub fn itemsize(&self) -> usize {
        self.dtype.itemsize()
    }

    /// Returns true for complex element types.
    #[inline]
    pub fn is_complex(&self) -> bool {
        self.dtype.is_complex()
    }

    /// Returns true when elements are stored in the platform byte order.
    #[inline]
    pub fn is_native_byteorder(&self) -> bool {
        self.byteorder.is_native()
    }
}

impl From<DType> for Descriptor {
    fn from(dtype: DType) -> Self {
        Self::from_type(dtype)
    }
}

impl std::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.byteorder.as_char(), self.dtype)
    }
}

/// Rust scalar types that can be stored in and read back from an array.
pub trait Element: bytemuck::Pod {
    /// The dtype matching this Rust type.
    const DTYPE: DType;

    /// Reverses the byte order of the value.
    fn swap_bytes(self) -> Self;
}

macro_rules! impl_element_int {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn swap_bytes(self) -> Self {
                    <$ty>::swap_bytes(self)
                }
            }
        )*
    };
}

impl_element_int!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
);

impl Element for f32 {
    const DTYPE: DType = DType::Float32;

    #[inline]
    fn swap_bytes(self) -> Self {
        f32::from_bits(self.to_bits().swap_bytes())
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;

    #[inline]
    fn swap_bytes(self) -> Self {
        f64::from_bits(self.to_bits().swap_bytes())
    }
}

impl Element for Complex<f32> {
    const DTYPE: DType = DType::Complex64;

    #[inline]
    fn swap_bytes(self) -> Self {
        Complex::new(self.re.swap_bytes(), self.im.swap_bytes())
    }
}

impl Element for Complex<f64> {
    const DTYPE: DType = DType::Complex128;

    #[inline]
    fn swap_bytes(self) -> Self {
        Complex::new(self.re.swap_bytes(), self.im.swap_bytes())
    }
}
