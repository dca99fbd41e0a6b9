//! A filesystem storage backend for the [`slabio`](https://docs.rs/slabio/latest/slabio/index.html) crate.
//!
//! A container is a directory holding a `container.json` marker.
//! A dataset named `run1/energy` is the directory `<container>/run1/energy`, holding a `dataset.json` metadata
//! document and its chunk files below `c/`. Chunks are gzip compressed if the dataset was created with compression.
//!
//! Datasets are locked individually: writes and extent changes are exclusive, reads are shared.
//!
//! ## Crate Features
//!  - `gzip` (default): enable the gzip codec.
//!
//! ## Licence
//! `slabio_filesystem` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod chunk_files;
mod metadata;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use slabio_storage::{
    chunked, CodecKind, DataType, DatasetHandle, DatasetMetadata, DatasetName, Dataspace,
    Diagnostics, FileHandle, HandleTracker, SizeVector, StorageBackendTraits, StorageError,
};
use walkdir::WalkDir;

use chunk_files::ChunkFiles;
use metadata::{ContainerDocument, DatasetDocument};

const CONTAINER_DOCUMENT: &str = "container.json";
const DATASET_DOCUMENT: &str = "dataset.json";

/// A synchronous filesystem storage backend.
#[derive(Debug, Default)]
pub struct FilesystemBackend {
    handles: HandleTracker,
    diagnostics: Diagnostics,
    datasets: Mutex<HashMap<PathBuf, Arc<RwLock<()>>>>,
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a dataset to its directory.
    #[must_use]
    pub fn dataset_path(container: &Path, name: &DatasetName) -> PathBuf {
        let mut path = container.to_path_buf();
        for component in name.components() {
            path.push(component);
        }
        path
    }

    fn get_dataset_lock(&self, path: &Path) -> Arc<RwLock<()>> {
        let mut datasets = self.datasets.lock();
        let lock = datasets
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone();
        drop(datasets);
        lock
    }

    fn read_container_document(path: &Path) -> Result<ContainerDocument, StorageError> {
        let bytes = match std::fs::read(path.join(CONTAINER_DOCUMENT)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::InvalidContainer(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes)
            .map_err(|_| StorageError::InvalidContainer(path.to_path_buf()))
    }

    fn read_metadata(dataset_path: &Path, name: &DatasetName) -> Result<DatasetMetadata, StorageError> {
        let bytes = match std::fs::read(dataset_path.join(DATASET_DOCUMENT)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::DatasetNotFound(name.clone()))
            }
            Err(err) => return Err(err.into()),
        };
        let document: DatasetDocument = serde_json::from_slice(&bytes)
            .map_err(|err| StorageError::InvalidMetadata(name.clone(), err.to_string()))?;
        DatasetMetadata::try_from(document)
            .map_err(|err| StorageError::InvalidMetadata(name.clone(), err.to_string()))
    }

    /// Write a document next to its destination and rename it into place.
    fn write_document(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let mut temporary = path.as_os_str().to_owned();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);
        std::fs::write(&temporary, bytes)?;
        std::fs::rename(&temporary, path)?;
        Ok(())
    }

    fn write_metadata(dataset_path: &Path, metadata: &DatasetMetadata) -> Result<(), StorageError> {
        let document = serde_json::to_vec_pretty(&DatasetDocument::from(metadata))
            .map_err(|err| StorageError::Other(err.to_string()))?;
        Self::write_document(&dataset_path.join(DATASET_DOCUMENT), &document)
    }

    /// Find a dataset that `name` would contain or be contained by.
    fn find_conflict(container: &Path, name: &DatasetName) -> Result<Option<DatasetName>, StorageError> {
        let components: Vec<&str> = name.components().collect();
        for depth in 1..=components.len() {
            let ancestor = DatasetName::new(components[..depth].join("/"))?;
            if Self::dataset_path(container, &ancestor)
                .join(DATASET_DOCUMENT)
                .exists()
            {
                return Ok(Some(ancestor));
            }
        }
        let path = Self::dataset_path(container, name);
        if path.is_dir() {
            for entry in WalkDir::new(&path).sort_by_file_name() {
                let entry = entry.map_err(|err| StorageError::Other(err.to_string()))?;
                if entry.file_name() == DATASET_DOCUMENT {
                    let nested = entry
                        .path()
                        .parent()
                        .and_then(|parent| parent.strip_prefix(container).ok())
                        .and_then(|relative| relative.to_str())
                        .map(|relative| relative.replace('\\', "/"));
                    if let Some(nested) = nested {
                        return Ok(Some(DatasetName::new(nested)?));
                    }
                }
            }
        }
        Ok(None)
    }

    fn open_container_impl(&self, path: &Path) -> Result<FileHandle, StorageError> {
        if !path.exists() {
            return Err(StorageError::ContainerNotFound(path.to_path_buf()));
        }
        if !Self::read_container_document(path)?.is_supported() {
            return Err(StorageError::InvalidContainer(path.to_path_buf()));
        }
        Ok(FileHandle::new(path, self.handles.acquire()))
    }

    fn create_container_impl(&self, path: &Path) -> Result<FileHandle, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        match std::fs::create_dir(path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(if Self::read_container_document(path).is_ok() {
                    StorageError::ContainerExists(path.to_path_buf())
                } else {
                    StorageError::InvalidContainer(path.to_path_buf())
                });
            }
            Err(err) => return Err(err.into()),
        }
        let document = serde_json::to_vec_pretty(&ContainerDocument::default())
            .map_err(|err| StorageError::Other(err.to_string()))?;
        Self::write_document(&path.join(CONTAINER_DOCUMENT), &document)?;
        Ok(FileHandle::new(path, self.handles.acquire()))
    }

    fn create_dataset_impl(
        &self,
        file: &FileHandle,
        name: &DatasetName,
        metadata: &DatasetMetadata,
    ) -> Result<DatasetHandle, StorageError> {
        if let Some(compression) = metadata.compression() {
            if !self.codec_available(compression.kind()) {
                return Err(StorageError::UnsupportedCodec(compression.kind()));
            }
        }
        let path = Self::dataset_path(file.path(), name);
        let lock = self.get_dataset_lock(&path);
        let _lock = lock.write();
        if let Some(existing) = Self::find_conflict(file.path(), name)? {
            return Err(StorageError::DatasetExists(existing));
        }
        std::fs::create_dir_all(&path)?;
        Self::write_metadata(&path, metadata)?;
        Ok(DatasetHandle::new(file, name.clone(), self.handles.acquire()))
    }

    fn open_dataset_impl(
        &self,
        file: &FileHandle,
        name: &DatasetName,
    ) -> Result<DatasetHandle, StorageError> {
        let path = Self::dataset_path(file.path(), name);
        if path.join(DATASET_DOCUMENT).is_file() {
            Ok(DatasetHandle::new(file, name.clone(), self.handles.acquire()))
        } else {
            Err(StorageError::DatasetNotFound(name.clone()))
        }
    }

    fn dataset_metadata_impl(&self, dataset: &DatasetHandle) -> Result<DatasetMetadata, StorageError> {
        let path = Self::dataset_path(dataset.container(), dataset.name());
        let lock = self.get_dataset_lock(&path);
        let _lock = lock.read();
        Self::read_metadata(&path, dataset.name())
    }

    fn extend_dataset_impl(&self, dataset: &DatasetHandle, shape: &[u64]) -> Result<(), StorageError> {
        let path = Self::dataset_path(dataset.container(), dataset.name());
        let lock = self.get_dataset_lock(&path);
        let _lock = lock.write();
        let previous = Self::read_metadata(&path, dataset.name())?;
        let mut metadata = previous.clone();
        metadata.set_shape(SizeVector::from(shape))?;
        let shrinks = std::iter::zip(shape, previous.shape().iter()).any(|(new, old)| new < old);
        if shrinks {
            let mut chunks = ChunkFiles::new(&path, previous.compression());
            chunked::shrink_chunks(&mut chunks, dataset.name(), &previous, shape)?;
        }
        Self::write_metadata(&path, &metadata)
    }

    fn erase_dataset_impl(&self, dataset: &DatasetHandle) -> Result<(), StorageError> {
        let path = Self::dataset_path(dataset.container(), dataset.name());
        let lock = self.get_dataset_lock(&path);
        let _lock = lock.write();
        // the dataset is gone once its document is removed
        match std::fs::remove_file(path.join(DATASET_DOCUMENT)) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::DatasetNotFound(dataset.name().clone()))
            }
            Err(err) => return Err(err.into()),
        }
        match std::fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_impl(
        &self,
        dataset: &DatasetHandle,
        memory: &Dataspace,
        file: &Dataspace,
        data_type: DataType,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let path = Self::dataset_path(dataset.container(), dataset.name());
        let lock = self.get_dataset_lock(&path);
        let _lock = lock.write();
        let metadata = Self::read_metadata(&path, dataset.name())?;
        let mut chunks = ChunkFiles::new(&path, metadata.compression());
        chunked::write_selection(
            &mut chunks,
            dataset.name(),
            &metadata,
            memory,
            file,
            data_type,
            bytes,
        )
    }

    fn read_impl(
        &self,
        dataset: &DatasetHandle,
        memory: &Dataspace,
        file: &Dataspace,
        data_type: DataType,
        bytes: &mut [u8],
    ) -> Result<(), StorageError> {
        let path = Self::dataset_path(dataset.container(), dataset.name());
        let lock = self.get_dataset_lock(&path);
        let _lock = lock.read();
        let metadata = Self::read_metadata(&path, dataset.name())?;
        let chunks = ChunkFiles::new(&path, metadata.compression());
        chunked::read_selection(
            &chunks,
            dataset.name(),
            &metadata,
            memory,
            file,
            data_type,
            bytes,
        )
    }
}

impl StorageBackendTraits for FilesystemBackend {
    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn open_handles(&self) -> usize {
        self.handles.open_handles()
    }

    fn codec_available(&self, codec: CodecKind) -> bool {
        match codec {
            CodecKind::Gzip => cfg!(feature = "gzip"),
        }
    }

    fn open_container(&self, path: &Path) -> Result<FileHandle, StorageError> {
        self.diagnostics
            .reported("open container", self.open_container_impl(path))
    }

    fn create_container(&self, path: &Path) -> Result<FileHandle, StorageError> {
        self.diagnostics
            .reported("create container", self.create_container_impl(path))
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
        self.diagnostics
            .reported("open dataset", self.open_dataset_impl(file, name))
    }

    fn dataset_metadata(&self, dataset: &DatasetHandle) -> Result<DatasetMetadata, StorageError> {
        self.diagnostics
            .reported("dataset metadata", self.dataset_metadata_impl(dataset))
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
        self.diagnostics.reported(
            "write",
            self.write_impl(dataset, memory, file, data_type, bytes),
        )
    }

    fn read(
        &self,
        dataset: &DatasetHandle,
        memory: &Dataspace,
        file: &Dataspace,
        data_type: DataType,
        bytes: &mut [u8],
    ) -> Result<(), StorageError> {
        self.diagnostics.reported(
            "read",
            self.read_impl(dataset, memory, file, data_type, bytes),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_path() {
        let name = DatasetName::new("run1/energy").unwrap();
        assert_eq!(
            FilesystemBackend::dataset_path(Path::new("data.slab"), &name),
            Path::new("data.slab").join("run1").join("energy")
        );
    }

    #[test]
    fn invalid_container() {
        let path = tempfile::TempDir::new().unwrap();
        let storage = FilesystemBackend::new();
        // an existing directory without a marker is not a container
        assert!(matches!(
            storage.open_container(path.path()),
            Err(StorageError::InvalidContainer(_))
        ));
        assert!(matches!(
            storage.create_container(path.path()),
            Err(StorageError::InvalidContainer(_))
        ));
        assert_eq!(storage.open_handles(), 0);
    }

    #[test]
    fn invalid_metadata() {
        let path = tempfile::TempDir::new().unwrap();
        let container = path.path().join("data.slab");
        let storage = FilesystemBackend::new();
        let file = storage.create_container(&container).unwrap();
        let name = DatasetName::new("data").unwrap();
        std::fs::create_dir(container.join("data")).unwrap();
        std::fs::write(container.join("data").join(DATASET_DOCUMENT), "{}").unwrap();
        let dataset = storage.open_dataset(&file, &name).unwrap();
        assert!(matches!(
            storage.dataset_metadata(&dataset),
            Err(StorageError::InvalidMetadata(..))
        ));
    }
}
