//! A synchronous in-memory storage backend.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use derive_more::Display;
use parking_lot::Mutex;

use crate::{
    chunked::{self, ChunkStorage},
    CodecKind, DataType, DatasetHandle, DatasetMetadata, DatasetName, Dataspace, Diagnostics,
    FileHandle, HandleTracker, SizeVector, StorageBackendTraits, StorageError,
};

/// A [`MemoryBackend`] operation that can be made to fail.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Display)]
pub enum FailurePoint {
    /// [`StorageBackendTraits::create_dataset`].
    #[display("create dataset")]
    CreateDataset,
    /// [`StorageBackendTraits::extend_dataset`].
    #[display("extend dataset")]
    ExtendDataset,
    /// [`StorageBackendTraits::erase_dataset`].
    #[display("erase dataset")]
    EraseDataset,
    /// [`StorageBackendTraits::write`].
    #[display("write")]
    Write,
    /// [`StorageBackendTraits::read`].
    #[display("read")]
    Read,
}

#[derive(Debug, Default)]
struct MemoryChunks(BTreeMap<Vec<u64>, Vec<u8>>);

impl ChunkStorage for MemoryChunks {
    fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.0.get(chunk_indices).cloned())
    }

    fn store_chunk(&mut self, chunk_indices: &[u64], bytes: Vec<u8>) -> Result<(), StorageError> {
        self.0.insert(chunk_indices.to_vec(), bytes);
        Ok(())
    }

    fn erase_chunk(&mut self, chunk_indices: &[u64]) -> Result<(), StorageError> {
        self.0.remove(chunk_indices);
        Ok(())
    }

    fn stored_chunks(&self) -> Result<Vec<Vec<u64>>, StorageError> {
        Ok(self.0.keys().cloned().collect())
    }
}

#[derive(Debug)]
struct MemoryDataset {
    metadata: DatasetMetadata,
    chunks: MemoryChunks,
}

type MemoryContainer = BTreeMap<DatasetName, MemoryDataset>;

/// A synchronous in-memory storage backend.
///
/// Containers are keyed by path and live as long as the backend.
/// Chunks are held uncompressed, so every codec is reported as available unless disabled with
/// [`MemoryBackend::set_codec_available`].
#[derive(Debug)]
pub struct MemoryBackend {
    containers: Mutex<BTreeMap<PathBuf, MemoryContainer>>,
    handles: HandleTracker,
    diagnostics: Diagnostics,
    gzip_available: AtomicBool,
    failures: Mutex<Vec<FailurePoint>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            containers: Mutex::default(),
            handles: HandleTracker::new(),
            diagnostics: Diagnostics::default(),
            gzip_available: AtomicBool::new(true),
            failures: Mutex::default(),
        }
    }

    /// Set whether `codec` is reported as available.
    pub fn set_codec_available(&self, codec: CodecKind, available: bool) {
        match codec {
            CodecKind::Gzip => self.gzip_available.store(available, Ordering::SeqCst),
        }
    }

    /// Make the next `point` operation fail with [`StorageError::Other`].
    ///
    /// Each injected failure is consumed by one operation.
    pub fn inject_failure(&self, point: FailurePoint) {
        self.failures.lock().push(point);
    }

    fn take_failure(&self, point: FailurePoint) -> Result<(), StorageError> {
        let mut failures = self.failures.lock();
        if let Some(position) = failures.iter().position(|failure| *failure == point) {
            failures.remove(position);
            Err(StorageError::Other(format!("injected {point} failure")))
        } else {
            Ok(())
        }
    }

    fn with_dataset<T>(
        &self,
        dataset: &DatasetHandle,
        f: impl FnOnce(&mut MemoryDataset) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut containers = self.containers.lock();
        let memory_dataset = containers
            .get_mut(dataset.container())
            .and_then(|container| container.get_mut(dataset.name()))
            .ok_or_else(|| StorageError::DatasetNotFound(dataset.name().clone()))?;
        f(memory_dataset)
    }

    fn create_dataset_impl(
        &self,
        file: &FileHandle,
        name: &DatasetName,
        metadata: &DatasetMetadata,
    ) -> Result<DatasetHandle, StorageError> {
        self.take_failure(FailurePoint::CreateDataset)?;
        if let Some(compression) = metadata.compression() {
            if !self.codec_available(compression.kind()) {
                return Err(StorageError::UnsupportedCodec(compression.kind()));
            }
        }
        let mut containers = self.containers.lock();
        let container = containers
            .get_mut(file.path())
            .ok_or_else(|| StorageError::ContainerNotFound(file.path().to_path_buf()))?;
        if let Some(existing) = container
            .keys()
            .find(|existing| *existing == name || existing.is_ancestor_of(name) || name.is_ancestor_of(existing))
        {
            return Err(StorageError::DatasetExists(existing.clone()));
        }
        container.insert(
            name.clone(),
            MemoryDataset {
                metadata: metadata.clone(),
                chunks: MemoryChunks::default(),
            },
        );
        Ok(DatasetHandle::new(file, name.clone(), self.handles.acquire()))
    }

    fn extend_dataset_impl(
        &self,
        dataset: &DatasetHandle,
        shape: &[u64],
    ) -> Result<(), StorageError> {
        self.take_failure(FailurePoint::ExtendDataset)?;
        self.with_dataset(dataset, |memory_dataset| {
            let mut metadata = memory_dataset.metadata.clone();
            metadata.set_shape(SizeVector::from(shape))?;
            let shrinks = std::iter::zip(shape, memory_dataset.metadata.shape().iter())
                .any(|(new, old)| new < old);
            if shrinks {
                chunked::shrink_chunks(
                    &mut memory_dataset.chunks,
                    dataset.name(),
                    &memory_dataset.metadata,
                    shape,
                )?;
            }
            memory_dataset.metadata = metadata;
            Ok(())
        })
    }

    fn erase_dataset_impl(&self, dataset: &DatasetHandle) -> Result<(), StorageError> {
        self.take_failure(FailurePoint::EraseDataset)?;
        self.containers
            .lock()
            .get_mut(dataset.container())
            .and_then(|container| container.remove(dataset.name()))
            .map(|_| ())
            .ok_or_else(|| StorageError::DatasetNotFound(dataset.name().clone()))
    }
}

impl StorageBackendTraits for MemoryBackend {
    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn open_handles(&self) -> usize {
        self.handles.open_handles()
    }

    fn codec_available(&self, codec: CodecKind) -> bool {
        match codec {
            CodecKind::Gzip => self.gzip_available.load(Ordering::SeqCst),
        }
    }

    fn open_container(&self, path: &Path) -> Result<FileHandle, StorageError> {
        let result = if self.containers.lock().contains_key(path) {
            Ok(FileHandle::new(path, self.handles.acquire()))
        } else {
            Err(StorageError::ContainerNotFound(path.to_path_buf()))
        };
        self.diagnostics.reported("open container", result)
    }

    fn create_container(&self, path: &Path) -> Result<FileHandle, StorageError> {
        let result = {
            let mut containers = self.containers.lock();
            if containers.contains_key(path) {
                Err(StorageError::ContainerExists(path.to_path_buf()))
            } else {
                containers.insert(path.to_path_buf(), MemoryContainer::new());
                Ok(FileHandle::new(path, self.handles.acquire()))
            }
        };
        self.diagnostics.reported("create container", result)
    }

    fn create_dataset(
        &self,
        file: &FileHandle,
        name: &DatasetName,
        metadata: &DatasetMetadata,
    ) -> Result<DatasetHandle, StorageError> {
        self.diagnostics.reported(
            "create dataset",
            self.create_dataset_impl(file, name, metadata),
        )
    }

    fn open_dataset(
        &self,
        file: &FileHandle,
        name: &DatasetName,
    ) -> Result<DatasetHandle, StorageError> {
        let exists = self
            .containers
            .lock()
            .get(file.path())
            .is_some_and(|container| container.contains_key(name));
        let result = if exists {
            Ok(DatasetHandle::new(file, name.clone(), self.handles.acquire()))
        } else {
            Err(StorageError::DatasetNotFound(name.clone()))
        };
        self.diagnostics.reported("open dataset", result)
    }

    fn dataset_metadata(&self, dataset: &DatasetHandle) -> Result<DatasetMetadata, StorageError> {
        self.diagnostics.reported(
            "dataset metadata",
            self.with_dataset(dataset, |memory_dataset| Ok(memory_dataset.metadata.clone())),
        )
    }

    fn extend_dataset(&self, dataset: &DatasetHandle, shape: &[u64]) -> Result<(), StorageError> {
        self.diagnostics
            .reported("extend dataset", self.extend_dataset_impl(dataset, shape))
    }

    fn erase_dataset(&self, dataset: DatasetHandle) -> Result<(), StorageError> {
        self.diagnostics
            .reported("erase dataset", self.erase_dataset_impl(&dataset))
    }

    fn write(
        &self,
        dataset: &DatasetHandle,
        memory: &Dataspace,
        file: &Dataspace,
        data_type: DataType,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let result = self.take_failure(FailurePoint::Write).and_then(|()| {
            self.with_dataset(dataset, |memory_dataset| {
                chunked::write_selection(
                    &mut memory_dataset.chunks,
                    dataset.name(),
                    &memory_dataset.metadata,
                    memory,
                    file,
                    data_type,
                    bytes,
                )
            })
        });
        self.diagnostics.reported("write", result)
    }

    fn read(
        &self,
        dataset: &DatasetHandle,
        memory: &Dataspace,
        file: &Dataspace,
        data_type: DataType,
        bytes: &mut [u8],
    ) -> Result<(), StorageError> {
        let result = self.take_failure(FailurePoint::Read).and_then(|()| {
            self.with_dataset(dataset, |memory_dataset| {
                chunked::read_selection(
                    &memory_dataset.chunks,
                    dataset.name(),
                    &memory_dataset.metadata,
                    memory,
                    file,
                    data_type,
                    bytes,
                )
            })
        });
        self.diagnostics.reported("read", result)
    }
}
