//! Sessions that write and read a strided view of an in-memory array.
//!
//! An [`ArrayIO`] session describes one in-memory array: its rank, extents, and element [`DataType`].
//! A hyperslab selects the part of that array that is transferred, so a write can store every other column, or a
//! single row, of the array without copying it into a contiguous buffer first.
//!
//! A write either creates a new fixed-size dataset (a *flat* write) or appends the selection as the next row of a
//! growable dataset (an *append*). See [`flat_dataset_geometry`](slabio_geometry::flat_dataset_geometry) and
//! [`appendable_dataset_geometry`](slabio_geometry::appendable_dataset_geometry) for the derived dataset shapes.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use slabio::array_io::ArrayIO;
//! # use slabio::storage::backend::MemoryBackend;
//! let storage = Arc::new(MemoryBackend::new());
//! let mut array_io = ArrayIO::new_for::<f64>(storage, &[4, 10])?;
//!
//! // Select the second row of the array
//! array_io.set_hyperslab_1d(1, &[1, 0], 1)?;
//! let array: Vec<f64> = (0..40).map(f64::from).collect();
//! array_io.write_array(&array, "data.slab".as_ref(), "rows", true)?;
//! array_io.write_array(&array, "data.slab".as_ref(), "rows", true)?;
//! assert_eq!(array_io.dataset_extent("data.slab".as_ref(), "rows")?, [2, 1, 10]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod append;
mod array_io_errors;
mod array_io_read;
mod array_io_write;
mod element;
mod verbosity;

use std::sync::Arc;

pub use array_io_errors::{AppendError, ArrayIOCreateError, ArrayIOError};
pub use element::Element;
pub use verbosity::Verbosity;

use slabio_geometry::{DataType, Dataspace, DataspaceParams, HyperslabError, SizeVector};
use slabio_storage::{
    Compression, DatasetHandle, DatasetMetadata, DatasetName, FileHandle, StorageBackendTraits,
    StorageError,
};

use crate::config::global_config;

/// A session transferring a strided view of an in-memory array to and from datasets of a storage backend.
///
/// The memory view (rank, extents, and element type) is fixed for the life of the session.
/// The hyperslab selecting the transferred elements may change before every transfer, and selects the whole array
/// by default.
///
/// The dataset geometry is never cached between calls. Every append re-reads the current extent from the backend.
///
/// Datasets are created with the [dataset type](ArrayIO::set_dataset_type), which defaults to the memory element type.
/// Elements are converted between the two on every transfer.
#[derive(Debug)]
pub struct ArrayIO<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    memory: DataspaceParams,
    memory_space: Dataspace,
    dataset_type: DataType,
    compression: Option<Compression>,
    verbosity: Verbosity,
}

impl<TStorage: ?Sized + StorageBackendTraits> ArrayIO<TStorage> {
    /// Create a session for an in-memory array with extents `dims` and elements of `data_type`.
    ///
    /// The compression and verbosity are taken from the [global config](crate::config::global_config).
    ///
    /// # Errors
    /// Returns an [`ArrayIOCreateError`] if `dims` is empty, has a zero extent, or has too many elements.
    pub fn new(
        storage: Arc<TStorage>,
        dims: &[u64],
        data_type: DataType,
    ) -> Result<Self, ArrayIOCreateError> {
        if dims.is_empty() {
            return Err(ArrayIOCreateError::ZeroRank);
        }
        if let Some(axis) = dims.iter().position(|&extent| extent == 0) {
            return Err(ArrayIOCreateError::ZeroExtent(axis));
        }
        let mut memory = DataspaceParams::with_defaults(dims.into(), data_type);
        let memory_space = memory.selected_dataspace()?;
        let (compression, verbosity) = {
            let config = global_config();
            (
                config
                    .compression_enabled()
                    .then(|| Compression::Gzip(config.gzip_compression_level())),
                config.verbosity(),
            )
        };
        Ok(Self {
            storage,
            memory,
            memory_space,
            dataset_type: data_type,
            compression,
            verbosity,
        })
    }

    /// Create a session for an in-memory array of `rank` axes that all have the same `extent`.
    ///
    /// # Errors
    /// Returns an [`ArrayIOCreateError`] if `rank` or `extent` is zero.
    pub fn new_uniform(
        storage: Arc<TStorage>,
        rank: usize,
        extent: u64,
        data_type: DataType,
    ) -> Result<Self, ArrayIOCreateError> {
        Self::new(storage, &SizeVector::uniform(rank, extent), data_type)
    }

    /// Create a session for an in-memory array of `T` elements with extents `dims`.
    ///
    /// # Errors
    /// Returns an [`ArrayIOCreateError`] if `dims` is empty or has a zero extent.
    pub fn new_for<T: Element>(
        storage: Arc<TStorage>,
        dims: &[u64],
    ) -> Result<Self, ArrayIOCreateError> {
        Self::new(storage, dims, T::DATA_TYPE)
    }

    /// Return the storage backend.
    #[must_use]
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }

    /// Return the memory view, including the current hyperslab.
    #[must_use]
    pub fn memory(&self) -> &DataspaceParams {
        &self.memory
    }

    /// Return the extents of the in-memory array.
    #[must_use]
    pub fn dims(&self) -> &SizeVector {
        self.memory.dims()
    }

    /// Return the element data type of the in-memory array.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.memory.data_type()
    }

    /// Return the element data type of the datasets the session creates.
    #[must_use]
    pub fn dataset_type(&self) -> DataType {
        self.dataset_type
    }

    /// Set the element data type of the datasets the session creates.
    ///
    /// Existing datasets keep their data type.
    /// Integer elements saturate at the bounds of the dataset type, and floating point elements are truncated toward zero
    /// when stored as integers.
    pub fn set_dataset_type(&mut self, dataset_type: DataType) -> &mut Self {
        self.dataset_type = dataset_type;
        self
    }

    /// Return the verbosity.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Set the verbosity.
    pub fn set_verbosity(&mut self, verbosity: Verbosity) -> &mut Self {
        self.verbosity = verbosity;
        self
    }

    /// Return the compression of new datasets.
    #[must_use]
    pub fn compression(&self) -> Option<Compression> {
        self.compression
    }

    /// Set the compression of new datasets.
    pub fn set_compression(&mut self, compression: Option<Compression>) -> &mut Self {
        self.compression = compression;
        self
    }

    /// Select a hyperslab of the in-memory array with unit blocks.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] and keeps the current selection if the hyperslab is invalid for the memory view.
    pub fn set_hyperslab(&mut self, start: &[u64], stride: &[u64]) -> Result<(), HyperslabError> {
        let block = SizeVector::uniform(self.memory.rank(), 1);
        self.update_hyperslab(|memory| memory.set_hyperslab_with_block(start, stride, &block))
    }

    /// Select a hyperslab of the in-memory array.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] and keeps the current selection if the hyperslab is invalid for the memory view.
    pub fn set_hyperslab_with_block(
        &mut self,
        start: &[u64],
        stride: &[u64],
        block: &[u64],
    ) -> Result<(), HyperslabError> {
        self.update_hyperslab(|memory| memory.set_hyperslab_with_block(start, stride, block))
    }

    /// Select a one dimensional hyperslab along `keep_axis`, starting at `start`.
    ///
    /// Every other axis is collapsed to the single element at its `start`.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] and keeps the current selection if `keep_axis` is out of bounds or the hyperslab is
    /// invalid for the memory view.
    pub fn set_hyperslab_1d(
        &mut self,
        keep_axis: usize,
        start: &[u64],
        stride: u64,
    ) -> Result<(), HyperslabError> {
        self.check_axis(keep_axis)?;
        let mut strides = self.memory.dims().clone();
        strides[keep_axis] = stride;
        self.set_hyperslab(start, &strides)
    }

    /// Select a hyperslab that collapses `drop_axis` to the single element at its `start`.
    ///
    /// The stride of `drop_axis` is ignored.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] and keeps the current selection if `drop_axis` is out of bounds or the hyperslab is
    /// invalid for the memory view.
    pub fn set_hyperslab_drop_axis(
        &mut self,
        drop_axis: usize,
        start: &[u64],
        stride: &[u64],
    ) -> Result<(), HyperslabError> {
        self.check_axis(drop_axis)?;
        let mut strides = SizeVector::from(stride);
        if let Some(axis_stride) = strides.get_mut(drop_axis) {
            *axis_stride = self.memory.dims()[drop_axis];
        }
        self.set_hyperslab(start, &strides)
    }

    /// Select the whole in-memory array.
    pub fn reset_hyperslab(&mut self) {
        let rank = self.memory.rank();
        let mut memory = self.memory.clone();
        let reset = memory.set_hyperslab_with_block(
            &SizeVector::new(rank),
            &SizeVector::uniform(rank, 1),
            &SizeVector::uniform(rank, 1),
        );
        if reset.is_ok() {
            self.memory = memory;
            self.memory_space.select_all();
        }
    }

    fn check_axis(&self, axis: usize) -> Result<(), HyperslabError> {
        let rank = self.memory.rank();
        if axis < rank {
            Ok(())
        } else {
            Err(HyperslabError::InvalidAxis { axis, rank })
        }
    }

    fn update_hyperslab(
        &mut self,
        update: impl FnOnce(&mut DataspaceParams) -> Result<(), HyperslabError>,
    ) -> Result<(), HyperslabError> {
        let mut memory = self.memory.clone();
        update(&mut memory)?;
        let memory_space = memory.selected_dataspace()?;
        if self.verbosity.diagnostic() {
            log::debug!(
                "memory hyperslab start {} stride {} count {} block {}",
                memory.start(),
                memory.stride(),
                memory.count(),
                memory.block()
            );
        }
        self.memory = memory;
        self.memory_space = memory_space;
        Ok(())
    }

    /// The number of bytes of the in-memory array, or [`None`] if it exceeds [`usize::MAX`].
    fn array_size(&self) -> Option<usize> {
        usize::try_from(self.memory_space.num_elements())
            .ok()?
            .checked_mul(self.data_type().size())
    }

    fn validate_buffer_size(&self, len: usize) -> Result<(), StorageError> {
        let expected = self.array_size().ok_or_else(|| {
            StorageError::Other(format!(
                "the in-memory array {} exceeds usize::MAX bytes",
                self.dims()
            ))
        })?;
        if len == expected {
            Ok(())
        } else {
            Err(StorageError::InvalidBufferSize { got: len, expected })
        }
    }

    /// Create a dataset with the extents of `geometry`, the session dataset type, and the session compression.
    ///
    /// The dataset is created uncompressed, with a warning, if the backend has no codec for the compression.
    fn create_dataset(
        &self,
        file: &FileHandle,
        name: &DatasetName,
        geometry: &DataspaceParams,
    ) -> Result<DatasetHandle, ArrayIOError> {
        let compression = self.compression.filter(|compression| {
            let available = self.storage.codec_available(compression.kind());
            if !available {
                log::warn!(
                    "The {} codec is unavailable, dataset {name} is created without compression.",
                    compression.kind()
                );
            }
            available
        });
        let metadata = DatasetMetadata::new(
            self.dataset_type,
            geometry.dims().clone(),
            geometry.maxdims().clone(),
            geometry.chunk().clone(),
            compression,
        )
        .map_err(StorageError::from)?;
        let dataset = self.storage.create_dataset(file, name, &metadata)?;
        if self.verbosity.informational() {
            log::info!(
                "created dataset {name} with shape {} in {}",
                metadata.shape(),
                file.path().display()
            );
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use slabio_geometry::SelectionError;
    use slabio_storage::backend::MemoryBackend;

    use super::*;

    fn array_io(dims: &[u64]) -> ArrayIO<MemoryBackend> {
        ArrayIO::new(Arc::new(MemoryBackend::new()), dims, DataType::Float64).unwrap()
    }

    #[test]
    fn array_io_new() {
        let storage = Arc::new(MemoryBackend::new());
        assert!(matches!(
            ArrayIO::new(storage.clone(), &[], DataType::UInt8),
            Err(ArrayIOCreateError::ZeroRank)
        ));
        assert!(matches!(
            ArrayIO::new(storage.clone(), &[3, 0], DataType::UInt8),
            Err(ArrayIOCreateError::ZeroExtent(1))
        ));
        let array_io = ArrayIO::new_uniform(storage.clone(), 3, 4, DataType::Int16).unwrap();
        assert_eq!(array_io.dims(), &[4, 4, 4]);
        assert_eq!(array_io.data_type(), DataType::Int16);
        let array_io = ArrayIO::new_for::<u32>(storage, &[5]).unwrap();
        assert_eq!(array_io.data_type(), DataType::UInt32);
        assert_eq!(array_io.memory().count(), &[5]);
    }

    #[test]
    fn array_io_new_element_count_overflow() {
        let storage = Arc::new(MemoryBackend::new());
        assert!(matches!(
            ArrayIO::new(storage, &[u64::MAX, 2], DataType::UInt8),
            Err(ArrayIOCreateError::HyperslabError(HyperslabError::Selection(
                SelectionError::ElementCountOverflow(_)
            )))
        ));
    }

    #[test]
    fn array_io_dataset_type() {
        let mut array_io = array_io(&[2, 2]);
        assert_eq!(array_io.dataset_type(), DataType::Float64);
        array_io.set_dataset_type(DataType::Int32);
        assert_eq!(array_io.dataset_type(), DataType::Int32);
        assert_eq!(array_io.data_type(), DataType::Float64);
    }

    #[test]
    fn array_io_hyperslab() {
        let mut array_io = array_io(&[10, 4]);
        array_io.set_hyperslab(&[0, 1], &[4, 2]).unwrap();
        assert_eq!(array_io.memory().count(), &[3, 2]);
        assert_eq!(array_io.memory_space.num_selected(), 6);

        array_io.set_hyperslab_with_block(&[0, 0], &[5, 2], &[2, 1]).unwrap();
        assert_eq!(array_io.memory().count(), &[2, 2]);
        assert_eq!(array_io.memory().effective_shape(), [4, 2]);

        array_io.reset_hyperslab();
        assert_eq!(array_io.memory().count(), &[10, 4]);
        assert_eq!(array_io.memory().block(), &[1, 1]);
        assert_eq!(array_io.memory_space.num_selected(), 40);
    }

    #[test]
    fn array_io_hyperslab_invalid() {
        let mut array_io = array_io(&[10, 4]);
        array_io.set_hyperslab(&[1, 0], &[2, 1]).unwrap();
        let memory = array_io.memory().clone();
        assert!(matches!(
            array_io.set_hyperslab(&[0, 0], &[0, 1]),
            Err(HyperslabError::ZeroStride(0))
        ));
        assert!(array_io.set_hyperslab(&[0], &[1]).is_err());
        // blocks wider than the stride overlap
        assert!(array_io.set_hyperslab_with_block(&[0, 0], &[1, 1], &[2, 1]).is_err());
        // start beyond the extent
        assert!(array_io.set_hyperslab(&[10, 0], &[1, 1]).is_err());
        assert_eq!(array_io.memory(), &memory);
    }

    #[test]
    fn array_io_hyperslab_1d() {
        let mut array_io = array_io(&[10, 4]);
        array_io.set_hyperslab_1d(0, &[0, 3], 4).unwrap();
        assert_eq!(array_io.memory().stride(), &[4, 4]);
        assert_eq!(array_io.memory().count(), &[3, 1]);

        array_io.set_hyperslab_1d(1, &[2, 0], 1).unwrap();
        assert_eq!(array_io.memory().count(), &[1, 4]);
        assert!(matches!(
            array_io.set_hyperslab_1d(2, &[0, 0], 1),
            Err(HyperslabError::InvalidAxis { axis: 2, rank: 2 })
        ));
    }

    #[test]
    fn array_io_hyperslab_drop_axis() {
        let mut array_io = array_io(&[10, 4]);
        array_io.set_hyperslab_drop_axis(1, &[0, 2], &[2, 1]).unwrap();
        assert_eq!(array_io.memory().stride(), &[2, 4]);
        assert_eq!(array_io.memory().count(), &[5, 1]);
        assert_eq!(array_io.memory().effective_shape(), [5, 1]);
    }

    #[test]
    fn array_io_buffer_size() {
        let array_io = array_io(&[3, 2]);
        assert!(array_io.validate_buffer_size(48).is_ok());
        assert!(matches!(
            array_io.validate_buffer_size(40),
            Err(StorageError::InvalidBufferSize {
                got: 40,
                expected: 48
            })
        ));

        // 2^62 elements of 8 bytes
        let array_io = self::array_io(&[1 << 31, 1 << 31]);
        assert!(matches!(
            array_io.validate_buffer_size(0),
            Err(StorageError::Other(_))
        ));
    }
}
