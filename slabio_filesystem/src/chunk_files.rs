//! Chunk files of one dataset.
//!
//! The chunk with grid indices `[i, j, k]` is stored at `<dataset>/c/i/j/k`.

use std::path::{Path, PathBuf};

use slabio_storage::{chunked::ChunkStorage, Compression, StorageError};
use walkdir::WalkDir;

#[cfg(feature = "gzip")]
mod gzip {
    use std::io::{Cursor, Read};

    use slabio_storage::GzipCompressionLevel;

    pub(super) fn encode(bytes: &[u8], level: GzipCompressionLevel) -> std::io::Result<Vec<u8>> {
        let mut encoder = flate2::bufread::GzEncoder::new(
            Cursor::new(bytes),
            flate2::Compression::new(level.as_u32()),
        );
        let mut out: Vec<u8> = Vec::new();
        encoder.read_to_end(&mut out)?;
        Ok(out)
    }

    pub(super) fn decode(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decoder = flate2::bufread::GzDecoder::new(Cursor::new(bytes));
        let mut out: Vec<u8> = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Chunk files below a dataset directory, encoded with the dataset compression.
pub(crate) struct ChunkFiles {
    root: PathBuf,
    compression: Option<Compression>,
}

impl ChunkFiles {
    pub(crate) fn new(dataset_path: &Path, compression: Option<Compression>) -> Self {
        Self {
            root: dataset_path.join("c"),
            compression,
        }
    }

    fn chunk_path(&self, chunk_indices: &[u64]) -> PathBuf {
        let mut path = self.root.clone();
        for index in chunk_indices {
            path.push(index.to_string());
        }
        path
    }

    fn encode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self.compression {
            None => Ok(bytes),
            #[cfg(feature = "gzip")]
            Some(Compression::Gzip(level)) => Ok(gzip::encode(&bytes, level)?),
            #[cfg(not(feature = "gzip"))]
            Some(compression) => Err(StorageError::UnsupportedCodec(compression.kind())),
        }
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self.compression {
            None => Ok(bytes),
            #[cfg(feature = "gzip")]
            Some(Compression::Gzip(_)) => Ok(gzip::decode(&bytes)?),
            #[cfg(not(feature = "gzip"))]
            Some(compression) => Err(StorageError::UnsupportedCodec(compression.kind())),
        }
    }
}

impl ChunkStorage for ChunkFiles {
    fn retrieve_chunk(&self, chunk_indices: &[u64]) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(self.chunk_path(chunk_indices)) {
            Ok(bytes) => Ok(Some(self.decode(bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store_chunk(&mut self, chunk_indices: &[u64], bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.chunk_path(chunk_indices);
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.encode(bytes)?)?;
        Ok(())
    }

    fn erase_chunk(&mut self, chunk_indices: &[u64]) -> Result<(), StorageError> {
        match std::fs::remove_file(self.chunk_path(chunk_indices)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn stored_chunks(&self) -> Result<Vec<Vec<u64>>, StorageError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut chunks = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|err| StorageError::Other(err.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let indices: Option<Vec<u64>> = relative
                .components()
                .map(|component| component.as_os_str().to_str()?.parse().ok())
                .collect();
            if let Some(indices) = indices {
                chunks.push(indices);
            }
        }
        Ok(chunks)
    }
}
