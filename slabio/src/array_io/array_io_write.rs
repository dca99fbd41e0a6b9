use std::path::Path;

use slabio_geometry::flat_dataset_geometry;
use slabio_storage::{
    open_or_create_container, probe_dataset_exists, DatasetName, StorageBackendTraits,
};

use super::{append::AppendEngine, ArrayIO, ArrayIOError, Element};

impl<TStorage: ?Sized + StorageBackendTraits> ArrayIO<TStorage> {
    /// Write the selected elements of `array` to the dataset `name` in the container at `path`.
    ///
    /// The container is created if it does not exist.
    ///
    /// If `append` is false, a new fixed-size dataset is created with the shape of the selection, dropping every axis
    /// with a selected extent of one. An existing dataset is never overwritten.
    ///
    /// If `append` is true, the selection is appended as the next row of a growable dataset, which is created empty
    /// if it does not exist. See [`ArrayIOError::append_incompatibility`].
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if
    ///  - `T` is not the session data type,
    ///  - `array` does not hold every element of the in-memory array,
    ///  - a flat write targets an existing dataset (a flat write that fails after creating its dataset erases it again),
    ///  - the selection cannot be appended to the dataset, or
    ///  - there is an underlying storage error.
    pub fn write_array<T: Element>(
        &self,
        array: &[T],
        path: &Path,
        name: &str,
        append: bool,
    ) -> Result<(), ArrayIOError> {
        T::validate_data_type(self.data_type())?;
        self.write_array_bytes(T::as_bytes(array), path, name, append)
    }

    /// Write the selected elements of the in-memory array held in `bytes`, in native byte order.
    ///
    /// See [`ArrayIO::write_array`].
    ///
    /// # Errors
    /// Returns an [`ArrayIOError`] if `bytes` does not hold every element of the in-memory array, or the write fails.
    pub fn write_array_bytes(
        &self,
        bytes: &[u8],
        path: &Path,
        name: &str,
        append: bool,
    ) -> Result<(), ArrayIOError> {
        self.validate_buffer_size(bytes.len())?;
        let name = DatasetName::new(name)?;
        let storage = &*self.storage;
        let file = open_or_create_container(storage, path)?;
        if append {
            let engine = AppendEngine::new(self, &file, &name);
            let dataset = engine.open_or_create()?;
            engine.append(&dataset, bytes)?;
            return Ok(());
        }

        if probe_dataset_exists(storage, &file, &name)? {
            return Err(ArrayIOError::DatasetExists(name));
        }
        let geometry = flat_dataset_geometry(&self.memory);
        let dataset = self.create_dataset(&file, &name, &geometry)?;
        if self.verbosity.diagnostic() {
            log::debug!(
                "writing {} elements to dataset {name}",
                self.memory_space.num_selected()
            );
        }
        let written = storage.dataset_space(&dataset).and_then(|file_space| {
            storage.write(
                &dataset,
                &self.memory_space,
                &file_space,
                self.data_type(),
                bytes,
            )
        });
        if let Err(err) = written {
            // a flat write either stores the whole selection or leaves no dataset behind
            if let Err(erase_err) = storage.erase_dataset(dataset) {
                log::error!("failed to erase dataset {name} after a failed write: {erase_err}");
            }
            return Err(err.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, sync::Arc};

    use slabio_geometry::DataType;
    use slabio_storage::{backend::MemoryBackend, StorageError};

    use super::*;

    #[test]
    fn write_array_flat() -> Result<(), Box<dyn Error>> {
        let storage = Arc::new(MemoryBackend::new());
        let mut array_io = ArrayIO::new_for::<u8>(storage.clone(), &[3, 4])?;
        let array: Vec<u8> = (0..12).collect();
        let path = Path::new("flat.slab");

        // the middle row is stored as a vector
        array_io.set_hyperslab_1d(1, &[1, 0], 1)?;
        array_io.write_array(&array, path, "row", false)?;
        let file = storage.open_container(path)?;
        let dataset = storage.open_dataset(&file, &DatasetName::new("row")?)?;
        let metadata = storage.dataset_metadata(&dataset)?;
        assert_eq!(metadata.shape(), &[4]);
        assert_eq!(metadata.max_shape(), &[4]);
        assert_eq!(metadata.chunk_shape(), &[4]);
        let space = storage.dataset_space(&dataset)?;
        let mut out = vec![0u8; 4];
        storage.read(&dataset, &space, &space, DataType::UInt8, &mut out)?;
        assert_eq!(out, vec![4, 5, 6, 7]);
        Ok(())
    }

    #[test]
    fn write_array_flat_conflict() -> Result<(), Box<dyn Error>> {
        let storage = Arc::new(MemoryBackend::new());
        let array_io = ArrayIO::new_for::<i32>(storage.clone(), &[2])?;
        let path = Path::new("conflict.slab");
        array_io.write_array(&[1, 2], path, "data", false)?;
        assert!(matches!(
            array_io.write_array(&[3, 4], path, "data", false),
            Err(ArrayIOError::DatasetExists(_))
        ));
        let mut out = [0i32; 2];
        array_io.read_array(&mut out, path, "data")?;
        assert_eq!(out, [1, 2]);
        assert_eq!(storage.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn write_array_invalid_buffer() -> Result<(), Box<dyn Error>> {
        let storage = Arc::new(MemoryBackend::new());
        let array_io = ArrayIO::new_for::<f32>(storage.clone(), &[2, 2])?;
        let path = Path::new("invalid.slab");
        assert!(matches!(
            array_io.write_array(&[1.0f64; 4], path, "data", false),
            Err(ArrayIOError::IncompatibleElementType {
                got: DataType::Float64,
                expected: DataType::Float32
            })
        ));
        assert!(matches!(
            array_io.write_array(&[1.0f32; 3], path, "data", false),
            Err(ArrayIOError::StorageError(StorageError::InvalidBufferSize { .. }))
        ));
        assert!(matches!(
            array_io.write_array(&[1.0f32; 4], path, "run1//data", false),
            Err(ArrayIOError::InvalidDatasetName(_))
        ));
        // nothing was created
        assert!(storage.open_container(path).is_err());
        Ok(())
    }
    #[test]
    fn write_array_flat_converts() -> Result<(), Box<dyn Error>> {
        let storage = Arc::new(MemoryBackend::new());
        let mut array_io = ArrayIO::new_for::<f32>(storage.clone(), &[2, 2])?;
        array_io.set_dataset_type(DataType::Int16);
        let path = Path::new("converts.slab");
        array_io.write_array(&[1.5f32, -2.5, 40000.0, -0.0], path, "data", false)?;

        let file = storage.open_container(path)?;
        let dataset = storage.open_dataset(&file, &DatasetName::new("data")?)?;
        assert_eq!(storage.dataset_metadata(&dataset)?.data_type(), DataType::Int16);
        let space = storage.dataset_space(&dataset)?;
        let mut out = [0i16; 4];
        storage.read(&dataset, &space, &space, DataType::Int16, bytemuck::cast_slice_mut(&mut out))?;
        assert_eq!(out, [1, -2, i16::MAX, 0]);
        Ok(())
    }
}
