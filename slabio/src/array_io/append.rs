//! Appending rows to a growable dataset.
//!
//! A dataset moves through three states: it is absent, it is created as an empty template, and it is opened for
//! appending. Every append re-reads the dataset extent, checks that the memory selection matches a row, grows the
//! growth axis by one, and writes the row. A failed extend is never followed by a write, and a failed write shrinks
//! the dataset back to its previous extent.

use slabio_geometry::{
    advance_growth_axis, appendable_dataset_geometry, check_append, DataspaceParams,
    HyperslabError,
};
use slabio_storage::{
    probe_dataset_exists, DatasetHandle, DatasetName, FileHandle, StorageBackendTraits,
    StorageError,
};

use super::{AppendError, ArrayIO, ArrayIOError};

fn storage_error(err: HyperslabError) -> StorageError {
    match err {
        HyperslabError::Selection(err) => err.into(),
        err => StorageError::Other(err.to_string()),
    }
}

/// Appends the memory selection of a session to one dataset.
pub(super) struct AppendEngine<'a, TStorage: ?Sized> {
    array_io: &'a ArrayIO<TStorage>,
    file: &'a FileHandle,
    name: &'a DatasetName,
}

impl<'a, TStorage: ?Sized + StorageBackendTraits> AppendEngine<'a, TStorage> {
    pub(super) fn new(
        array_io: &'a ArrayIO<TStorage>,
        file: &'a FileHandle,
        name: &'a DatasetName,
    ) -> Self {
        Self {
            array_io,
            file,
            name,
        }
    }

    /// Open the dataset for appending, creating an empty template first if it is absent.
    pub(super) fn open_or_create(&self) -> Result<DatasetHandle, ArrayIOError> {
        let storage = &*self.array_io.storage;
        if !probe_dataset_exists(storage, self.file, self.name)? {
            let template = appendable_dataset_geometry(&self.array_io.memory);
            self.array_io
                .create_dataset(self.file, self.name, &template)?
                .close();
        }
        Ok(storage.open_dataset(self.file, self.name)?)
    }

    /// Append the selected elements of `bytes` as the next row of `dataset`, returning the row index.
    pub(super) fn append(&self, dataset: &DatasetHandle, bytes: &[u8]) -> Result<u64, ArrayIOError> {
        let storage = &*self.array_io.storage;
        let memory = &self.array_io.memory;
        let metadata = storage.dataset_metadata(dataset)?;
        let mut geometry = DataspaceParams::from_dataspace(
            &metadata.dataspace().map_err(StorageError::from)?,
            metadata.data_type(),
        );
        check_append(&geometry, memory).map_err(AppendError::from)?;

        let previous_shape = geometry.dims().clone();
        let row = advance_growth_axis(&mut geometry);
        if let Err(source) = storage.extend_dataset(dataset, geometry.dims()) {
            return Err(AppendError::Extend {
                name: self.name.clone(),
                shape: geometry.dims().clone(),
                source,
            }
            .into());
        }
        if self.array_io.verbosity.diagnostic() {
            log::debug!("extended dataset {} to {}", self.name, geometry.dims());
        }

        if let Err(source) = self.write_row(dataset, &mut geometry, bytes) {
            if let Err(err) = storage.extend_dataset(dataset, &previous_shape) {
                log::error!(
                    "failed to restore dataset {} to {previous_shape} after a failed append: {err}",
                    self.name
                );
            }
            return Err(AppendError::Write {
                name: self.name.clone(),
                row,
                source,
            }
            .into());
        }
        if self.array_io.verbosity.informational() {
            log::info!("appended row {row} to dataset {}", self.name);
        }
        Ok(row)
    }

    fn write_row(
        &self,
        dataset: &DatasetHandle,
        geometry: &mut DataspaceParams,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let storage = &*self.array_io.storage;
        // the extended dataset needs a fresh dataspace
        let mut file_space = storage.dataset_space(dataset)?;
        geometry
            .apply_selection(&mut file_space)
            .map_err(storage_error)?;
        storage.write(
            dataset,
            &self.array_io.memory_space,
            &file_space,
            self.array_io.data_type(),
            bytes,
        )
    }
}
