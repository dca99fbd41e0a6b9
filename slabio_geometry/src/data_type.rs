use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The element type of a dataspace.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `int8`
    #[display("int8")]
    Int8,
    /// `int16`
    #[display("int16")]
    Int16,
    /// `int32`
    #[display("int32")]
    Int32,
    /// `int64`
    #[display("int64")]
    Int64,
    /// `uint8`
    #[display("uint8")]
    UInt8,
    /// `uint16`
    #[display("uint16")]
    UInt16,
    /// `uint32`
    #[display("uint32")]
    UInt32,
    /// `uint64`
    #[display("uint64")]
    UInt64,
    /// `float32`
    #[display("float32")]
    Float32,
    /// `float64`
    #[display("float64")]
    Float64,
}

impl DataType {
    /// The size of one element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }
}
