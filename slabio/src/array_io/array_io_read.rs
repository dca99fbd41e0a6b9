use std::path::Path;

use slabio_geometry::{check_rows, DataspaceParams, SizeVector, GROWTH_AXIS};
use slabio_storage::{
    probe_container, probe_dataset_exists, DatasetHandle, DatasetName, FileHandle,
    StorageBackendTraits,
};

use super::{ArrayIO, ArrayIOError, Element};

impl<TStorage: ?Sized + StorageBackendTraits> ArrayIO<TStorage> {
    /// Read the dataset `name` in the container at `path` into the selected elements of `array`.
    ///
    /// The dataset must have as many elements as the memory selection. Elements of `array` outside the selection are
    /// untouched. Stored elements are converted to the session data type.
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if
    ///  - `T` is not the session data type,
    ///  - `array` does not hold every element of the in-memory array,
    ///  - the container or dataset does not exist,
    ///  - the dataset size differs from the memory selection, or
    ///  - there is an underlying storage error.
    pub fn read_array<T: Element>(
        &self,
        array: &mut [T],
        path: &Path,
        name: &str,
    ) -> Result<(), ArrayIOError> {
        T::validate_data_type(self.data_type())?;
        self.read_array_bytes(T::as_bytes_mut(array), path, name)
    }

    /// Read the dataset `name` into the selected elements of the in-memory array held in `bytes`.
    ///
    /// See [`ArrayIO::read_array`].
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if `bytes` does not hold every element of the in-memory array, or the read fails.
    pub fn read_array_bytes(
        &self,
        bytes: &mut [u8],
        path: &Path,
        name: &str,
    ) -> Result<(), ArrayIOError> {
        self.validate_buffer_size(bytes.len())?;
        let (_file, dataset) = self.open_dataset(path, name)?;
        let file_space = self.storage.dataset_space(&dataset)?;
        self.storage.read(
            &dataset,
            &self.memory_space,
            &file_space,
            self.data_type(),
            bytes,
        )?;
        Ok(())
    }

    /// Read row `row` of the appendable dataset `name` into the selected elements of `array`.
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if
    ///  - the memory selection does not match the rows of the dataset,
    ///  - `row` is beyond the last row, or
    ///  - the read fails (see [`ArrayIO::read_array`]).
    pub fn read_array_row<T: Element>(
        &self,
        array: &mut [T],
        path: &Path,
        name: &str,
        row: u64,
    ) -> Result<(), ArrayIOError> {
        T::validate_data_type(self.data_type())?;
        self.read_array_row_bytes(T::as_bytes_mut(array), path, name, row)
    }

    /// Read row `row` of the appendable dataset `name` into the in-memory array held in `bytes`.
    ///
    /// See [`ArrayIO::read_array_row`].
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if `bytes` does not hold every element of the in-memory array, or the read fails.
    pub fn read_array_row_bytes(
        &self,
        bytes: &mut [u8],
        path: &Path,
        name: &str,
        row: u64,
    ) -> Result<(), ArrayIOError> {
        self.validate_buffer_size(bytes.len())?;
        let (_file, dataset) = self.open_dataset(path, name)?;
        let mut file_space = self.storage.dataset_space(&dataset)?;
        let mut geometry = DataspaceParams::from_dataspace(&file_space, self.data_type());
        check_rows(&geometry, &self.memory).map_err(|source| ArrayIOError::IncompatibleRows {
            name: dataset.name().clone(),
            source,
        })?;
        let rows = geometry.dims()[GROWTH_AXIS];
        if row >= rows {
            return Err(ArrayIOError::RowOutOfBounds {
                name: dataset.name().clone(),
                row,
                rows,
            });
        }

        // a stride of the full growth axis selects the single row
        let mut start = SizeVector::new(geometry.rank());
        start[GROWTH_AXIS] = row;
        let mut stride = SizeVector::uniform(geometry.rank(), 1);
        stride[GROWTH_AXIS] = rows;
        geometry.set_hyperslab(&start, &stride)?;
        geometry.apply_selection(&mut file_space)?;
        if self.verbosity.diagnostic() {
            log::debug!("reading row {row} of dataset {}", dataset.name());
        }
        self.storage.read(
            &dataset,
            &self.memory_space,
            &file_space,
            self.data_type(),
            bytes,
        )?;
        Ok(())
    }

    /// Return the current extent of the dataset `name` in the container at `path`.
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if the container or dataset does not exist, or there is an underlying storage error.
    pub fn dataset_extent(&self, path: &Path, name: &str) -> Result<SizeVector, ArrayIOError> {
        let (_file, dataset) = self.open_dataset(path, name)?;
        Ok(self.storage.dataset_space(&dataset)?.dims().clone())
    }

    /// Returns true if the dataset `name` exists in the container at `path`.
    ///
    /// Missing containers and datasets are not reported as failures.
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if `name` is invalid, or the container or dataset exists but cannot be opened.
    pub fn dataset_exists(&self, path: &Path, name: &str) -> Result<bool, ArrayIOError> {
        let name = DatasetName::new(name)?;
        let storage = &*self.storage;
        match probe_container(storage, path)? {
            Some(file) => Ok(probe_dataset_exists(storage, &file, &name)?),
            None => Ok(false),
        }
    }

    /// Open an existing container and dataset for reading.
    fn open_dataset(
        &self,
        path: &Path,
        name: &str,
    ) -> Result<(FileHandle, DatasetHandle), ArrayIOError> {
        let name = DatasetName::new(name)?;
        let file = self.storage.open_container(path)?;
        let dataset = self.storage.open_dataset(&file, &name)?;
        Ok((file, dataset))
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, sync::Arc};

    use slabio_geometry::AppendIncompatibility;
    use slabio_storage::{backend::MemoryBackend, StorageError};

    use super::*;

    #[test]
    fn read_array_round_trip() -> Result<(), Box<dyn Error>> {
        let storage = Arc::new(MemoryBackend::new());
        let array_io = ArrayIO::new_for::<f64>(storage, &[3, 5])?;
        let path = Path::new("round_trip.slab");
        let array: Vec<f64> = (0..15).map(|i| f64::from(i) * 0.5).collect();
        array_io.write_array(&array, path, "group/data", false)?;
        assert_eq!(array_io.dataset_extent(path, "group/data")?, [3, 5]);

        let mut out = vec![0.0f64; 15];
        array_io.read_array(&mut out, path, "group/data")?;
        assert_eq!(out, array);
        Ok(())
    }

    #[test]
    fn read_array_missing() -> Result<(), Box<dyn Error>> {
        let storage = Arc::new(MemoryBackend::new());
        let array_io = ArrayIO::new_for::<u8>(storage.clone(), &[2])?;
        let path = Path::new("missing.slab");
        let mut out = [0u8; 2];
        assert!(!array_io.dataset_exists(path, "data")?);
        assert!(matches!(
            array_io.read_array(&mut out, path, "data"),
            Err(ArrayIOError::StorageError(StorageError::ContainerNotFound(_)))
        ));
        // reading never creates the container
        assert!(!array_io.dataset_exists(path, "data")?);

        storage.create_container(path)?;
        assert!(matches!(
            array_io.read_array(&mut out, path, "data"),
            Err(ArrayIOError::StorageError(StorageError::DatasetNotFound(_)))
        ));
        assert_eq!(storage.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn read_array_row() -> Result<(), Box<dyn Error>> {
        let storage = Arc::new(MemoryBackend::new());
        let mut array_io = ArrayIO::new_for::<i16>(storage.clone(), &[2, 3])?;
        let path = Path::new("rows.slab");
        for first in [0i16, 10, 20] {
            let array: Vec<i16> = (first..first + 6).collect();
            array_io.write_array(&array, path, "rows", true)?;
        }
        assert!(array_io.dataset_exists(path, "rows")?);
        assert_eq!(array_io.dataset_extent(path, "rows")?, [3, 2, 3]);

        let mut out = vec![0i16; 6];
        array_io.read_array_row(&mut out, path, "rows", 1)?;
        assert_eq!(out, vec![10, 11, 12, 13, 14, 15]);
        assert!(matches!(
            array_io.read_array_row(&mut out, path, "rows", 3),
            Err(ArrayIOError::RowOutOfBounds { row: 3, rows: 3, .. })
        ));

        // a selection narrower than the rows is incompatible
        array_io.set_hyperslab(&[0, 0], &[1, 2])?;
        assert!(matches!(
            array_io.read_array_row(&mut out, path, "rows", 0),
            Err(ArrayIOError::IncompatibleRows {
                source: AppendIncompatibility::AxisExtent { axis: 2, .. },
                ..
            })
        ));

        // a whole appendable dataset does not fit one row
        array_io.reset_hyperslab();
        assert!(matches!(
            array_io.read_array(&mut out, path, "rows"),
            Err(ArrayIOError::StorageError(StorageError::SelectionSizeMismatch { .. }))
        ));
        assert_eq!(storage.open_handles(), 0);
        Ok(())
    }
}
