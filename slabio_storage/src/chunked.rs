//! Selection transfer over a regular chunk grid.
//!
//! Backends that store datasets as a regular grid of chunks implement [`ChunkStorage`] and delegate
//! [`write`](crate::StorageBackendTraits::write), [`read`](crate::StorageBackendTraits::read), and shrinking
//! [`extend_dataset`](crate::StorageBackendTraits::extend_dataset) to the functions in this module.
//!
//! Every chunk holds the elements of the full chunk shape in row-major order, including chunks that overhang the
//! dataset extent. Chunks that have never been written read as zero.
//!
//! Elements are converted between the transfer data type and the dataset data type as they are copied.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{convert::convert_element, DataType, DatasetMetadata, DatasetName, Dataspace, StorageError};

/// Decoded chunk storage of one dataset, keyed by chunk grid indices.
pub trait ChunkStorage {
    /// Retrieve the decoded bytes of a chunk.
    ///
    /// Returns [`None`] if the chunk has never been stored.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the chunk exists but cannot be retrieved.
    fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store the decoded bytes of a chunk.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the chunk cannot be stored.
    fn store_chunk(&mut self, chunk_indices: &[u64], bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Erase a chunk. Erasing a missing chunk succeeds.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the chunk cannot be erased.
    fn erase_chunk(&mut self, chunk_indices: &[u64]) -> Result<(), StorageError>;

    /// The grid indices of every stored chunk.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the chunks cannot be listed.
    fn stored_chunks(&self) -> Result<Vec<Vec<u64>>, StorageError>;
}

/// Convert a `u64` to a `usize`.
///
/// # Errors
/// Returns [`StorageError::Other`] if `value` exceeds [`usize::MAX`].
pub fn to_usize(value: u64) -> Result<usize, StorageError> {
    usize::try_from(value).map_err(|_| StorageError::Other(format!("{value} exceeds usize::MAX")))
}

fn linearise(coordinates: &[u64], shape: &[u64]) -> u64 {
    std::iter::zip(coordinates, shape).fold(0, |index, (coordinate, extent)| {
        index * extent + coordinate
    })
}

/// Elements of one chunk paired with their linear index in memory.
type ChunkElements = BTreeMap<Vec<u64>, Vec<(usize, usize)>>;

/// The number of bytes of `elements` elements of `data_type`.
fn num_bytes(elements: u64, data_type: DataType) -> Result<usize, StorageError> {
    to_usize(elements)?
        .checked_mul(data_type.size())
        .ok_or_else(|| StorageError::Other(format!("{elements} {data_type} elements exceed usize::MAX bytes")))
}

/// Validate a transfer and return the element size of `data_type`.
fn validate_transfer(
    metadata: &DatasetMetadata,
    memory: &Dataspace,
    file: &Dataspace,
    data_type: DataType,
    num_bytes_got: usize,
) -> Result<usize, StorageError> {
    if file.dims() != metadata.shape() {
        return Err(StorageError::StaleDataspace {
            dataspace: file.dims().clone(),
            dataset: metadata.shape().clone(),
        });
    }
    if memory.num_selected() != file.num_selected() {
        return Err(StorageError::SelectionSizeMismatch {
            memory: memory.num_selected(),
            dataset: file.num_selected(),
        });
    }
    let expected = num_bytes(memory.num_elements(), data_type)?;
    if num_bytes_got != expected {
        return Err(StorageError::InvalidBufferSize {
            got: num_bytes_got,
            expected,
        });
    }
    Ok(data_type.size())
}

/// Group the selected elements by chunk.
fn group_by_chunk(
    metadata: &DatasetMetadata,
    memory: &Dataspace,
    file: &Dataspace,
) -> Result<ChunkElements, StorageError> {
    let chunk_shape = metadata.chunk_shape();
    let dims = file.dims();
    let mut chunk_indices = vec![0; file.rank()];
    let mut within = vec![0; file.rank()];
    let mut chunks = ChunkElements::new();
    for (memory_index, file_index) in
        std::iter::zip(memory.selected_linear_indices(), file.selected_linear_indices())
    {
        let mut remainder = file_index;
        for axis in (0..file.rank()).rev() {
            let coordinate = remainder % dims[axis];
            remainder /= dims[axis];
            chunk_indices[axis] = coordinate / chunk_shape[axis];
            within[axis] = coordinate % chunk_shape[axis];
        }
        let element = (
            to_usize(linearise(&within, chunk_shape))?,
            to_usize(memory_index)?,
        );
        if let Some(elements) = chunks.get_mut(chunk_indices.as_slice()) {
            elements.push(element);
        } else {
            chunks.insert(chunk_indices.clone(), vec![element]);
        }
    }
    Ok(chunks)
}

fn retrieve_chunk_or_fill<TChunks: ?Sized + ChunkStorage>(
    chunks: &TChunks,
    name: &DatasetName,
    metadata: &DatasetMetadata,
    chunk_indices: &[u64],
) -> Result<Vec<u8>, StorageError> {
    let chunk_elements = metadata
        .chunk_shape()
        .checked_product()
        .ok_or_else(|| StorageError::Other(format!("chunk shape {} overflows", metadata.chunk_shape())))?;
    let expected = num_bytes(chunk_elements, metadata.data_type())?;
    match chunks.retrieve_chunk(chunk_indices)? {
        Some(bytes) if bytes.len() == expected => Ok(bytes),
        Some(bytes) => Err(StorageError::InvalidChunk {
            name: name.clone(),
            chunk_indices: chunk_indices.to_vec(),
            reason: format!("chunk has {} bytes, expected {expected}", bytes.len()),
        }),
        None => Ok(vec![0; expected]),
    }
}

/// Write the elements selected by `memory` in `bytes` to the elements selected by `file` in a chunked dataset.
///
/// Each affected chunk is retrieved (or zero filled), updated, and stored.
/// Elements of `data_type` are converted to the dataset data type.
///
/// # Errors
/// Returns a [`StorageError`] if
///  - the `file` extent is not the dataset extent,
///  - the selections have a different number of elements,
///  - `bytes` is not the size of the `memory` extent, or
///  - a chunk cannot be retrieved or stored.
pub fn write_selection<TChunks: ?Sized + ChunkStorage>(
    chunks: &mut TChunks,
    name: &DatasetName,
    metadata: &DatasetMetadata,
    memory: &Dataspace,
    file: &Dataspace,
    data_type: DataType,
    bytes: &[u8],
) -> Result<(), StorageError> {
    let element_size = validate_transfer(metadata, memory, file, data_type, bytes.len())?;
    let dataset_type = metadata.data_type();
    let dataset_element_size = dataset_type.size();
    for (chunk_indices, elements) in group_by_chunk(metadata, memory, file)? {
        let mut chunk = retrieve_chunk_or_fill(chunks, name, metadata, &chunk_indices)?;
        for (chunk_index, memory_index) in elements {
            let chunk_offset = chunk_index * dataset_element_size;
            let memory_offset = memory_index * element_size;
            convert_element(
                &bytes[memory_offset..memory_offset + element_size],
                data_type,
                &mut chunk[chunk_offset..chunk_offset + dataset_element_size],
                dataset_type,
            );
        }
        chunks.store_chunk(&chunk_indices, chunk)?;
    }
    Ok(())
}

/// Read the elements selected by `file` in a chunked dataset into the elements selected by `memory` in `bytes`.
///
/// Elements are converted from the dataset data type to `data_type`.
///
/// # Errors
/// Returns a [`StorageError`] if
///  - the `file` extent is not the dataset extent,
///  - the selections have a different number of elements,
///  - `bytes` is not the size of the `memory` extent, or
///  - a chunk cannot be retrieved.
pub fn read_selection<TChunks: ?Sized + ChunkStorage>(
    chunks: &TChunks,
    name: &DatasetName,
    metadata: &DatasetMetadata,
    memory: &Dataspace,
    file: &Dataspace,
    data_type: DataType,
    bytes: &mut [u8],
) -> Result<(), StorageError> {
    let element_size = validate_transfer(metadata, memory, file, data_type, bytes.len())?;
    let dataset_type = metadata.data_type();
    let dataset_element_size = dataset_type.size();
    for (chunk_indices, elements) in group_by_chunk(metadata, memory, file)? {
        let chunk = retrieve_chunk_or_fill(chunks, name, metadata, &chunk_indices)?;
        for (chunk_index, memory_index) in elements {
            let chunk_offset = chunk_index * dataset_element_size;
            let memory_offset = memory_index * element_size;
            convert_element(
                &chunk[chunk_offset..chunk_offset + dataset_element_size],
                dataset_type,
                &mut bytes[memory_offset..memory_offset + element_size],
                data_type,
            );
        }
    }
    Ok(())
}

/// Discard the chunk contents outside of `shape`.
///
/// Chunks entirely outside `shape` are erased, and elements outside `shape` in overhanging chunks are zeroed,
/// so that a later extension reads them as zero.
///
/// # Errors
/// Returns a [`StorageError`] if a chunk cannot be listed, retrieved, stored, or erased.
pub fn shrink_chunks<TChunks: ?Sized + ChunkStorage>(
    chunks: &mut TChunks,
    name: &DatasetName,
    metadata: &DatasetMetadata,
    shape: &[u64],
) -> Result<(), StorageError> {
    let chunk_shape = metadata.chunk_shape();
    let element_size = metadata.data_type().size();
    for chunk_indices in chunks.stored_chunks()? {
        let origin: Vec<u64> = std::iter::zip(&chunk_indices, chunk_shape.iter())
            .map(|(index, chunk)| index * chunk)
            .collect();
        if std::iter::zip(&origin, shape).any(|(origin, extent)| origin >= extent) {
            chunks.erase_chunk(&chunk_indices)?;
            continue;
        }
        let overhangs = itertools::izip!(&origin, chunk_shape.iter(), shape)
            .any(|(origin, chunk, extent)| origin + chunk > *extent);
        if !overhangs {
            continue;
        }
        let mut chunk = retrieve_chunk_or_fill(chunks, name, metadata, &chunk_indices)?;
        for within in chunk_shape
            .iter()
            .map(|&chunk| 0..chunk)
            .multi_cartesian_product()
        {
            let outside = itertools::izip!(&origin, &within, shape)
                .any(|(origin, within, extent)| origin + within >= *extent);
            if outside {
                let offset = to_usize(linearise(&within, chunk_shape))? * element_size;
                chunk[offset..offset + element_size].fill(0);
            }
        }
        chunks.store_chunk(&chunk_indices, chunk)?;
    }
    Ok(())
}
