use slabio_geometry::DataType;

use super::ArrayIOError;

/// A trait representing an array element type.
///
/// Elements are plain old data stored in native byte order, and each maps to exactly one [`DataType`].
pub trait Element: bytemuck::Pod {
    /// The data type of the element.
    const DATA_TYPE: DataType;

    /// Validate that `data_type` is the data type of the element.
    ///
    /// # Errors
    /// Returns [`ArrayIOError::IncompatibleElementType`] if the data types differ.
    fn validate_data_type(data_type: DataType) -> Result<(), ArrayIOError> {
        if data_type == Self::DATA_TYPE {
            Ok(())
        } else {
            Err(ArrayIOError::IncompatibleElementType {
                got: Self::DATA_TYPE,
                expected: data_type,
            })
        }
    }

    /// View a slice of elements as bytes.
    fn as_bytes(elements: &[Self]) -> &[u8] {
        bytemuck::cast_slice(elements)
    }

    /// View a mutable slice of elements as bytes.
    fn as_bytes_mut(elements: &mut [Self]) -> &mut [u8] {
        bytemuck::cast_slice_mut(elements)
    }
}

macro_rules! impl_element_pod {
    ($raw_type:ty, $data_type:expr) => {
        impl Element for $raw_type {
            const DATA_TYPE: DataType = $data_type;
        }
    };
}

impl_element_pod!(i8, DataType::Int8);
impl_element_pod!(i16, DataType::Int16);
impl_element_pod!(i32, DataType::Int32);
impl_element_pod!(i64, DataType::Int64);
impl_element_pod!(u8, DataType::UInt8);
impl_element_pod!(u16, DataType::UInt16);
impl_element_pod!(u32, DataType::UInt32);
impl_element_pod!(u64, DataType::UInt64);
impl_element_pod!(f32, DataType::Float32);
impl_element_pod!(f64, DataType::Float64);
