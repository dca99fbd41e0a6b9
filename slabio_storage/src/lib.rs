//! The storage backend API for the [`slabio`](https://docs.rs/slabio/latest/slabio/index.html) crate.
//!
//! A storage backend holds *containers* (for example a directory or a file), each holding named, chunked,
//! optionally compressed datasets. Datasets are created with a fixed or growable extent and are read and written
//! through a pair of selections: one over the caller's buffer and one over the dataset.
//!
//! Backend resources are scoped: [`FileHandle`] and [`DatasetHandle`] release themselves when dropped, and every
//! backend counts its live handles (see [`StorageBackendTraits::open_handles`]).
//!
//! Backends report failures through the [`log`] facade while their [`Diagnostics`] are enabled.
//! Probes that expect to find nothing, such as [`probe_dataset_exists`], suppress diagnostics for exactly the duration of the probe.
//!
//! This crate includes an in-memory backend, [`backend::MemoryBackend`].
//!
//! ## Licence
//! `slabio_storage` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod backend;
pub mod chunked;
mod convert;
mod dataset_metadata;
mod dataset_name;
mod diagnostics;
mod handle;
mod storage_sync;


use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub use dataset_metadata::{
    CodecKind, Compression, DatasetMetadata, GzipCompressionLevel, GzipCompressionLevelError,
};
pub use dataset_name::{DatasetName, DatasetNameError};
pub use diagnostics::{Diagnostics, DiagnosticsSuppression};
pub use handle::{DatasetHandle, FileHandle, HandleToken, HandleTracker};
pub use storage_sync::{
    open_or_create_container, probe_container, probe_dataset_exists, StorageBackendTraits,
};

pub use slabio_geometry::{DataType, Dataspace, SelectionError, SizeVector, UNLIMITED};

/// [`Arc`] wrapped storage backend.
pub type StorageBackend = Arc<dyn StorageBackendTraits>;

/// A storage error.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] Arc<std::io::Error>),
    /// The container does not exist.
    #[error("container {} does not exist", .0.display())]
    ContainerNotFound(PathBuf),
    /// The container already exists.
    #[error("container {} already exists", .0.display())]
    ContainerExists(PathBuf),
    /// The path exists but is not a container.
    #[error("{} is not a container", .0.display())]
    InvalidContainer(PathBuf),
    /// The dataset does not exist.
    #[error("dataset {0} does not exist")]
    DatasetNotFound(DatasetName),
    /// The dataset already exists.
    #[error("dataset {0} already exists")]
    DatasetExists(DatasetName),
    /// An invalid dataset name.
    #[error(transparent)]
    InvalidDatasetName(#[from] DatasetNameError),
    /// Invalid or unparseable dataset metadata.
    #[error("invalid metadata for dataset {0}: {1}")]
    InvalidMetadata(DatasetName, String),
    /// An invalid extent or selection.
    #[error(transparent)]
    InvalidSelection(#[from] SelectionError),
    /// The memory and dataset selections have a different number of elements.
    #[error("memory selection has {memory} elements, dataset selection has {dataset}")]
    SelectionSizeMismatch {
        /// Elements selected in memory.
        memory: u64,
        /// Elements selected in the dataset.
        dataset: u64,
    },
    /// The dataset selection does not describe the current dataset extent.
    #[error("dataspace extent {dataspace} does not match dataset extent {dataset}")]
    StaleDataspace {
        /// The extent of the supplied dataspace.
        dataspace: SizeVector,
        /// The current extent of the dataset.
        dataset: SizeVector,
    },
    /// A buffer has the wrong length.
    #[error("buffer has {got} bytes, expected {expected}")]
    InvalidBufferSize {
        /// The buffer length.
        got: usize,
        /// The expected length.
        expected: usize,
    },
    /// A stored chunk is invalid.
    #[error("chunk {chunk_indices:?} of dataset {name} is invalid: {reason}")]
    InvalidChunk {
        /// The dataset.
        name: DatasetName,
        /// The chunk grid indices.
        chunk_indices: Vec<u64>,
        /// The reason.
        reason: String,
    },
    /// The requested codec is unsupported.
    #[error("codec {0} is unsupported")]
    UnsupportedCodec(CodecKind),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(Arc::new(err))
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
