//! Element conversion between data types.
//!
//! Integer targets saturate at their bounds, and floating point values are truncated toward zero (`NaN` becomes zero).

use crate::DataType;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Scalar {
    Int(i64),
    UInt(u64),
    Float(f64),
}

fn decode(bytes: &[u8], data_type: DataType) -> Scalar {
    macro_rules! decode {
        ($variant:ident, $ty:ty, $wide:ty) => {
            Scalar::$variant(<$wide>::from(bytemuck::pod_read_unaligned::<$ty>(bytes)))
        };
    }
    match data_type {
        DataType::Int8 => decode!(Int, i8, i64),
        DataType::Int16 => decode!(Int, i16, i64),
        DataType::Int32 => decode!(Int, i32, i64),
        DataType::Int64 => decode!(Int, i64, i64),
        DataType::UInt8 => decode!(UInt, u8, u64),
        DataType::UInt16 => decode!(UInt, u16, u64),
        DataType::UInt32 => decode!(UInt, u32, u64),
        DataType::UInt64 => decode!(UInt, u64, u64),
        DataType::Float32 => decode!(Float, f32, f64),
        DataType::Float64 => decode!(Float, f64, f64),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::cast_sign_loss,
    clippy::unnecessary_cast
)]
fn encode(value: Scalar, bytes: &mut [u8], data_type: DataType) {
    macro_rules! encode_int {
        ($ty:ty) => {{
            let element: $ty = match value {
                Scalar::Int(value) => <$ty>::try_from(value).unwrap_or(if value < 0 {
                    <$ty>::MIN
                } else {
                    <$ty>::MAX
                }),
                Scalar::UInt(value) => <$ty>::try_from(value).unwrap_or(<$ty>::MAX),
                Scalar::Float(value) => value as $ty,
            };
            bytes.copy_from_slice(bytemuck::bytes_of(&element));
        }};
    }
    macro_rules! encode_float {
        ($ty:ty) => {{
            let element: $ty = match value {
                Scalar::Int(value) => value as $ty,
                Scalar::UInt(value) => value as $ty,
                Scalar::Float(value) => value as $ty,
            };
            bytes.copy_from_slice(bytemuck::bytes_of(&element));
        }};
    }
    match data_type {
        DataType::Int8 => encode_int!(i8),
        DataType::Int16 => encode_int!(i16),
        DataType::Int32 => encode_int!(i32),
        DataType::Int64 => encode_int!(i64),
        DataType::UInt8 => encode_int!(u8),
        DataType::UInt16 => encode_int!(u16),
        DataType::UInt32 => encode_int!(u32),
        DataType::UInt64 => encode_int!(u64),
        DataType::Float32 => encode_float!(f32),
        DataType::Float64 => encode_float!(f64),
    }
}

/// Convert one element of type `from` in `src` to an element of type `to` in `dst`.
///
/// `src` and `dst` must be exactly the size of their data types.
pub(crate) fn convert_element(src: &[u8], from: DataType, dst: &mut [u8], to: DataType) {
    if from == to {
        dst.copy_from_slice(src);
    } else {
        encode(decode(src, from), dst, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert<TFrom: bytemuck::Pod, TTo: bytemuck::Pod>(
        value: TFrom,
        from: DataType,
        to: DataType,
    ) -> TTo {
        let mut out: TTo = bytemuck::Zeroable::zeroed();
        convert_element(
            bytemuck::bytes_of(&value),
            from,
            bytemuck::bytes_of_mut(&mut out),
            to,
        );
        out
    }

    #[test]
    fn convert_float() {
        assert_eq!(
            convert::<f32, f64>(1.5, DataType::Float32, DataType::Float64),
            1.5
        );
        assert_eq!(
            convert::<f64, f32>(-0.25, DataType::Float64, DataType::Float32),
            -0.25
        );
        assert_eq!(
            convert::<u16, f32>(65535, DataType::UInt16, DataType::Float32),
            65535.0
        );
        assert_eq!(
            convert::<i8, f64>(-128, DataType::Int8, DataType::Float64),
            -128.0
        );
    }

    #[test]
    fn convert_integer_saturates() {
        assert_eq!(convert::<i16, u8>(-1, DataType::Int16, DataType::UInt8), 0);
        assert_eq!(convert::<i32, u8>(300, DataType::Int32, DataType::UInt8), 255);
        assert_eq!(convert::<i32, i8>(-300, DataType::Int32, DataType::Int8), -128);
        assert_eq!(
            convert::<u64, i64>(u64::MAX, DataType::UInt64, DataType::Int64),
            i64::MAX
        );
        assert_eq!(convert::<u8, i16>(200, DataType::UInt8, DataType::Int16), 200);
    }

    #[test]
    fn convert_float_to_integer() {
        assert_eq!(convert::<f32, i32>(-2.75, DataType::Float32, DataType::Int32), -2);
        assert_eq!(convert::<f64, u8>(1e10, DataType::Float64, DataType::UInt8), 255);
        assert_eq!(convert::<f64, u16>(-3.0, DataType::Float64, DataType::UInt16), 0);
        assert_eq!(convert::<f32, i64>(f32::NAN, DataType::Float32, DataType::Int64), 0);
    }

    #[test]
    fn convert_same_type_copies() {
        assert_eq!(
            convert::<u32, u32>(0xDEAD_BEEF, DataType::UInt32, DataType::UInt32),
            0xDEAD_BEEF
        );
        let nan = convert::<f64, f64>(f64::NAN, DataType::Float64, DataType::Float64);
        assert!(nan.is_nan());
    }
}
