use slabio_geometry::{AppendIncompatibility, DataType, HyperslabError, SizeVector};
use slabio_storage::{DatasetName, DatasetNameError, StorageError};
use thiserror::Error;

/// An [`ArrayIO`](super::ArrayIO) creation error.
#[derive(Clone, Debug, Error)]
pub enum ArrayIOCreateError {
    /// The memory view has rank zero.
    #[error("the memory view must have at least one axis")]
    ZeroRank,
    /// A memory axis has extent zero.
    #[error("memory axis {0} has extent zero")]
    ZeroExtent(usize),
    /// The memory view cannot be selected.
    #[error(transparent)]
    HyperslabError(#[from] HyperslabError),
}

/// An append error.
#[derive(Clone, Debug, Error)]
pub enum AppendError {
    /// The memory view is incompatible with the rows of the dataset.
    #[error(transparent)]
    Incompatible(#[from] AppendIncompatibility),
    /// The dataset could not be extended. Nothing was written.
    #[error("failed to extend dataset {name} to {shape}: {source}")]
    Extend {
        /// The dataset.
        name: DatasetName,
        /// The requested extent.
        shape: SizeVector,
        /// The storage error.
        source: StorageError,
    },
    /// The row could not be written. The dataset was shrunk back to its previous extent.
    #[error("failed to write row {row} of dataset {name}: {source}")]
    Write {
        /// The dataset.
        name: DatasetName,
        /// The row.
        row: u64,
        /// The storage error.
        source: StorageError,
    },
}

/// An [`ArrayIO`](super::ArrayIO) operation error.
#[derive(Clone, Debug, Error)]
pub enum ArrayIOError {
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// An invalid hyperslab.
    #[error(transparent)]
    HyperslabError(#[from] HyperslabError),
    /// An append failed.
    #[error(transparent)]
    AppendError(#[from] AppendError),
    /// An invalid dataset name.
    #[error(transparent)]
    InvalidDatasetName(#[from] DatasetNameError),
    /// A flat write targets an existing dataset.
    #[error("dataset {0} already exists and is not overwritten")]
    DatasetExists(DatasetName),
    /// The buffer element type differs from the session data type.
    #[error("element type {got} is incompatible with data type {expected}")]
    IncompatibleElementType {
        /// The element data type.
        got: DataType,
        /// The session data type.
        expected: DataType,
    },
    /// The memory view does not match a row of the dataset.
    #[error("memory view does not match the rows of dataset {name}: {source}")]
    IncompatibleRows {
        /// The dataset.
        name: DatasetName,
        /// The incompatibility.
        source: AppendIncompatibility,
    },
    /// The row is beyond the extent of the growth axis.
    #[error("row {row} of dataset {name} is out of bounds for {rows} rows")]
    RowOutOfBounds {
        /// The dataset.
        name: DatasetName,
        /// The requested row.
        row: u64,
        /// The number of rows.
        rows: u64,
    },
}

impl ArrayIOError {
    /// Returns the append incompatibility if this error rejected an append without mutating the dataset.
    #[must_use]
    pub fn append_incompatibility(&self) -> Option<&AppendIncompatibility> {
        match self {
            Self::AppendError(AppendError::Incompatible(incompatibility)) => Some(incompatibility),
            _ => None,
        }
    }
}
