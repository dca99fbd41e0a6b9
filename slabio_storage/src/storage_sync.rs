use std::path::Path;

use auto_impl::auto_impl;

use super::{
    CodecKind, DataType, DatasetHandle, DatasetMetadata, DatasetName, Dataspace, Diagnostics,
    FileHandle, StorageError,
};

/// Storage backend traits.
///
/// A backend holds containers of named, chunked datasets.
/// Failed operations are reported through the backend [`Diagnostics`] before the error is returned.
#[auto_impl(Arc)]
pub trait StorageBackendTraits: Send + Sync {
    /// The failure diagnostics of the backend.
    fn diagnostics(&self) -> &Diagnostics;

    /// The number of open container and dataset handles.
    fn open_handles(&self) -> usize;

    /// Returns true if the backend can encode and decode chunks with `codec`.
    fn codec_available(&self, codec: CodecKind) -> bool;

    /// Open an existing container.
    ///
    /// # Errors
    /// Returns [`StorageError::ContainerNotFound`] if there is no container at `path`, or another [`StorageError`] if
    /// the container is unreadable.
    fn open_container(&self, path: &Path) -> Result<FileHandle, StorageError>;

    /// Create a new container.
    ///
    /// An existing container is never truncated.
    ///
    /// # Errors
    /// Returns [`StorageError::ContainerExists`] if `path` is already a container, or another [`StorageError`] if the
    /// container cannot be created.
    fn create_container(&self, path: &Path) -> Result<FileHandle, StorageError>;

    /// Create a new dataset in an open container.
    ///
    /// # Errors
    /// Returns [`StorageError::DatasetExists`] if the name is taken by or nested in another dataset,
    /// [`StorageError::UnsupportedCodec`] if the compression is unavailable, or another [`StorageError`] on failure.
    fn create_dataset(
        &self,
        file: &FileHandle,
        name: &DatasetName,
        metadata: &DatasetMetadata,
    ) -> Result<DatasetHandle, StorageError>;

    /// Open an existing dataset in an open container.
    ///
    /// # Errors
    /// Returns [`StorageError::DatasetNotFound`] if the dataset does not exist, or another [`StorageError`] on failure.
    fn open_dataset(
        &self,
        file: &FileHandle,
        name: &DatasetName,
    ) -> Result<DatasetHandle, StorageError>;

    /// Retrieve the current metadata of an open dataset.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the metadata cannot be retrieved.
    fn dataset_metadata(&self, dataset: &DatasetHandle) -> Result<DatasetMetadata, StorageError>;

    /// Retrieve the current extent and maximum extent of an open dataset, with every element selected.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the metadata cannot be retrieved.
    fn dataset_space(&self, dataset: &DatasetHandle) -> Result<Dataspace, StorageError> {
        Ok(self.dataset_metadata(dataset)?.dataspace()?)
    }

    /// Change the extent of an open dataset.
    ///
    /// The extent may grow up to the maximum extent, or shrink. Elements outside a shrunk extent are discarded.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the extent is invalid or cannot be stored.
    fn extend_dataset(&self, dataset: &DatasetHandle, shape: &[u64]) -> Result<(), StorageError>;

    /// Erase an open dataset and its elements, releasing the handle.
    ///
    /// Other handles to the dataset fail with [`StorageError::DatasetNotFound`] afterwards.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the dataset cannot be erased.
    fn erase_dataset(&self, dataset: DatasetHandle) -> Result<(), StorageError>;

    /// Write the elements selected by `memory` in `bytes` to the elements selected by `file` in the dataset.
    ///
    /// `bytes` holds every element of the `memory` extent in row-major order and native byte order.
    /// Elements of `data_type` are converted to the dataset data type, saturating integers at their bounds.
    /// The `file` extent must be the current dataset extent.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the selections are incompatible, `bytes` has the wrong length, or the write fails.
    fn write(
        &self,
        dataset: &DatasetHandle,
        memory: &Dataspace,
        file: &Dataspace,
        data_type: DataType,
        bytes: &[u8],
    ) -> Result<(), StorageError>;

    /// Read the elements selected by `file` in the dataset into the elements selected by `memory` in `bytes`.
    ///
    /// Unwritten elements read as zero. Elements of `bytes` outside the `memory` selection are untouched.
    /// Elements are converted from the dataset data type to `data_type`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the selections are incompatible, `bytes` has the wrong length, or the read fails.
    fn read(
        &self,
        dataset: &DatasetHandle,
        memory: &Dataspace,
        file: &Dataspace,
        data_type: DataType,
        bytes: &mut [u8],
    ) -> Result<(), StorageError>;
}

/// Open the container at `path` if it exists.
///
/// Diagnostics are suppressed while probing, so a missing container is not reported.
/// Other failures are reported after the probe.
///
/// # Errors
/// Returns a [`StorageError`] if the container exists but cannot be opened.
pub fn probe_container<TStorage: ?Sized + StorageBackendTraits>(
    storage: &TStorage,
    path: &Path,
) -> Result<Option<FileHandle>, StorageError> {
    let result = {
        let _suppression = storage.diagnostics().suppress();
        storage.open_container(path)
    };
    match result {
        Ok(file) => Ok(Some(file)),
        Err(StorageError::ContainerNotFound(_)) => Ok(None),
        Err(err) => storage.diagnostics().reported("open container", Err(err)),
    }
}

/// Returns true if the dataset `name` exists in an open container.
///
/// Diagnostics are suppressed while probing, so a missing dataset is not reported.
/// Other failures are reported after the probe.
///
/// # Errors
/// Returns a [`StorageError`] if the dataset exists but cannot be opened.
pub fn probe_dataset_exists<TStorage: ?Sized + StorageBackendTraits>(
    storage: &TStorage,
    file: &FileHandle,
    name: &DatasetName,
) -> Result<bool, StorageError> {
    let result = {
        let _suppression = storage.diagnostics().suppress();
        storage.open_dataset(file, name)
    };
    match result {
        Ok(_dataset) => Ok(true),
        Err(StorageError::DatasetNotFound(_)) => Ok(false),
        Err(err) => storage.diagnostics().reported("open dataset", Err(err)),
    }
}

/// Open the container at `path`, creating it if it does not exist.
///
/// # Errors
/// Returns a [`StorageError`] if the container cannot be opened or created.
pub fn open_or_create_container<TStorage: ?Sized + StorageBackendTraits>(
    storage: &TStorage,
    path: &Path,
) -> Result<FileHandle, StorageError> {
    match probe_container(storage, path)? {
        Some(file) => Ok(file),
        None => storage.create_container(path),
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn existence_checks_are_silent() -> Result<(), Box<dyn Error>> {
        testing_logger::setup();
        let storage = MemoryBackend::new();
        let path = Path::new("silent.slab");
        assert!(probe_container(&storage, path)?.is_none());
        let file = open_or_create_container(&storage, path)?;
        let name = DatasetName::new("missing")?;
        assert!(!probe_dataset_exists(&storage, &file, &name)?);
        assert!(storage.diagnostics().enabled());
        testing_logger::validate(|captured_logs| {
            assert!(captured_logs.is_empty());
        });

        assert!(storage.open_dataset(&file, &name).is_err());
        testing_logger::validate(|captured_logs| {
            assert_eq!(captured_logs.len(), 1);
            assert!(captured_logs[0].body.contains("missing"));
        });
        drop(file);
        assert_eq!(storage.open_handles(), 0);
        Ok(())
    }
}
