//! JSON documents stored alongside the chunks.
//!
//! A container directory holds `container.json`:
//! ```json
//! { "format": "slabio", "version": 1 }
//! ```
//! and each dataset directory holds `dataset.json`:
//! ```json
//! {
//!   "data_type": "float64",
//!   "shape": [2, 10],
//!   "max_shape": [null, 10],
//!   "chunk_shape": [1, 10],
//!   "compression": { "name": "gzip", "configuration": { "level": 9 } }
//! }
//! ```
//! A `null` maximum extent is unbounded.

use serde::{Deserialize, Serialize};
use slabio_storage::{
    Compression, DataType, DatasetMetadata, GzipCompressionLevel, SelectionError, UNLIMITED,
};

pub(crate) const CONTAINER_FORMAT: &str = "slabio";
pub(crate) const CONTAINER_VERSION: u64 = 1;

/// The `container.json` document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContainerDocument {
    pub(crate) format: String,
    pub(crate) version: u64,
}

impl Default for ContainerDocument {
    fn default() -> Self {
        Self {
            format: CONTAINER_FORMAT.to_string(),
            version: CONTAINER_VERSION,
        }
    }
}

impl ContainerDocument {
    pub(crate) fn is_supported(&self) -> bool {
        self.format == CONTAINER_FORMAT && self.version == CONTAINER_VERSION
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "name", content = "configuration", rename_all = "lowercase")]
enum CompressionDocument {
    Gzip { level: GzipCompressionLevel },
}

/// The `dataset.json` document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct DatasetDocument {
    data_type: DataType,
    shape: Vec<u64>,
    max_shape: Vec<Option<u64>>,
    chunk_shape: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compression: Option<CompressionDocument>,
}

impl From<&DatasetMetadata> for DatasetDocument {
    fn from(metadata: &DatasetMetadata) -> Self {
        Self {
            data_type: metadata.data_type(),
            shape: metadata.shape().to_vec(),
            max_shape: metadata
                .max_shape()
                .iter()
                .map(|&maximum| (maximum != UNLIMITED).then_some(maximum))
                .collect(),
            chunk_shape: metadata.chunk_shape().to_vec(),
            compression: metadata.compression().map(|compression| match compression {
                Compression::Gzip(level) => CompressionDocument::Gzip { level },
            }),
        }
    }
}

impl TryFrom<DatasetDocument> for DatasetMetadata {
    type Error = SelectionError;

    fn try_from(document: DatasetDocument) -> Result<Self, Self::Error> {
        Self::new(
            document.data_type,
            document.shape.into(),
            document
                .max_shape
                .iter()
                .map(|maximum| maximum.unwrap_or(UNLIMITED))
                .collect(),
            document.chunk_shape.into(),
            document.compression.map(|compression| match compression {
                CompressionDocument::Gzip { level } => Compression::Gzip(level),
            }),
        )
    }
}
