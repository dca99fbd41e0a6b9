use derive_more::Display;
use serde::{Deserialize, Serialize};
use slabio_geometry::{DataType, Dataspace, SelectionError, SizeVector};

/// A compression codec kind.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Display)]
pub enum CodecKind {
    /// The `gzip` codec.
    #[display("gzip")]
    Gzip,
}

/// A compression level. Used by the `gzip` codec.
///
/// An integer from 0 to 9 which controls the speed and level of compression.
/// A level of 1 is the fastest compression method and produces the least compression, while 9 is slowest and produces the most compression.
/// Compression is turned off completely when level is 0.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Serialize)]
#[serde(transparent)]
pub struct GzipCompressionLevel(u32);

/// An invalid compression level.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid compression level {0}, must be 0-9")]
pub struct GzipCompressionLevelError(u32);

impl TryFrom<u32> for GzipCompressionLevel {
    type Error = GzipCompressionLevelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value < 10 {
            Ok(Self(value))
        } else {
            Err(GzipCompressionLevelError(value))
        }
    }
}

impl<'de> Deserialize<'de> for GzipCompressionLevel {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let level = u32::deserialize(d)?;
        Self::try_from(level).map_err(|_| {
            serde::de::Error::custom("compression level must be an integer between 0 and 9.")
        })
    }
}

impl Default for GzipCompressionLevel {
    fn default() -> Self {
        Self(9)
    }
}

impl GzipCompressionLevel {
    /// The underlying integer compression level.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Chunk compression applied when a dataset is created.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Compression {
    /// `gzip` compression at a level.
    Gzip(GzipCompressionLevel),
}

impl Compression {
    /// The codec implementing the compression.
    #[must_use]
    pub const fn kind(&self) -> CodecKind {
        match self {
            Self::Gzip(_) => CodecKind::Gzip,
        }
    }
}

/// The creation parameters and current state of a chunked dataset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatasetMetadata {
    data_type: DataType,
    shape: SizeVector,
    max_shape: SizeVector,
    chunk_shape: SizeVector,
    compression: Option<Compression>,
}

impl DatasetMetadata {
    /// Create new dataset metadata.
    ///
    /// A `max_shape` element of [`UNLIMITED`](slabio_geometry::UNLIMITED) denotes an unbounded axis.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if
    ///  - the rank is zero or `shape`, `max_shape`, and `chunk_shape` differ in rank,
    ///  - `shape` exceeds `max_shape`, or
    ///  - `chunk_shape` has a zero element, or
    ///  - the number of elements in `shape` or `chunk_shape` overflows a [`u64`].
    pub fn new(
        data_type: DataType,
        shape: SizeVector,
        max_shape: SizeVector,
        chunk_shape: SizeVector,
        compression: Option<Compression>,
    ) -> Result<Self, SelectionError> {
        Dataspace::new(shape.clone(), max_shape.clone())?;
        if chunk_shape.rank() != shape.rank() {
            return Err(SelectionError::IncompatibleRank {
                got: chunk_shape.rank(),
                expected: shape.rank(),
            });
        }
        if let Some(axis) = chunk_shape.iter().position(|&extent| extent == 0) {
            return Err(SelectionError::ZeroParameter {
                axis,
                parameter: "chunk",
            });
        }
        if chunk_shape.checked_product().is_none() {
            return Err(SelectionError::ElementCountOverflow(chunk_shape));
        }
        Ok(Self {
            data_type,
            shape,
            max_shape,
            chunk_shape,
            compression,
        })
    }

    /// Return the data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Return the current shape.
    #[must_use]
    pub fn shape(&self) -> &SizeVector {
        &self.shape
    }

    /// Return the maximum shape.
    #[must_use]
    pub fn max_shape(&self) -> &SizeVector {
        &self.max_shape
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk_shape(&self) -> &SizeVector {
        &self.chunk_shape
    }

    /// Return the compression.
    #[must_use]
    pub const fn compression(&self) -> Option<Compression> {
        self.compression
    }

    /// Return the rank.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Set the current shape.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if `shape` differs in rank or exceeds the maximum shape.
    pub fn set_shape(&mut self, shape: SizeVector) -> Result<(), SelectionError> {
        Dataspace::new(shape.clone(), self.max_shape.clone())?;
        self.shape = shape;
        Ok(())
    }

    /// A dataspace of the current shape with every element selected.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if the metadata is inconsistent.
    pub fn dataspace(&self) -> Result<Dataspace, SelectionError> {
        Dataspace::new(self.shape.clone(), self.max_shape.clone())
    }
}
