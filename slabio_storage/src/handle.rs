use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use crate::DatasetName;

/// Counts the open handles of a storage backend.
#[derive(Debug, Default, Clone)]
pub struct HandleTracker(Arc<AtomicUsize>);

impl HandleTracker {
    /// Create a new handle tracker with no open handles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new open handle. The handle is released when the token is dropped.
    #[must_use]
    pub fn acquire(&self) -> HandleToken {
        self.0.fetch_add(1, Ordering::SeqCst);
        HandleToken(self.0.clone())
    }

    /// The number of open handles.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A registration of one open handle with a [`HandleTracker`].
#[derive(Debug)]
pub struct HandleToken(Arc<AtomicUsize>);

impl Drop for HandleToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An open container.
///
/// The container is closed when the handle is dropped.
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
    _token: HandleToken,
}

impl FileHandle {
    /// Create a new container handle. Intended for storage backend implementations.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, token: HandleToken) -> Self {
        Self {
            path: path.into(),
            _token: token,
        }
    }

    /// The container path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the container.
    pub fn close(self) {}
}

/// An open dataset within a container.
///
/// The dataset is closed when the handle is dropped.
#[derive(Debug)]
pub struct DatasetHandle {
    container: PathBuf,
    name: DatasetName,
    _token: HandleToken,
}

impl DatasetHandle {
    /// Create a new dataset handle. Intended for storage backend implementations.
    #[must_use]
    pub fn new(file: &FileHandle, name: DatasetName, token: HandleToken) -> Self {
        Self {
            container: file.path().to_path_buf(),
            name,
            _token: token,
        }
    }

    /// The path of the container holding the dataset.
    #[must_use]
    pub fn container(&self) -> &Path {
        &self.container
    }

    /// The dataset name.
    #[must_use]
    pub fn name(&self) -> &DatasetName {
        &self.name
    }

    /// Close the dataset.
    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_tracker() {
        let tracker = HandleTracker::new();
        assert_eq!(tracker.open_handles(), 0);
        let file = FileHandle::new("container", tracker.acquire());
        let dataset = DatasetHandle::new(
            &file,
            DatasetName::new("data").unwrap(),
            tracker.acquire(),
        );
        assert_eq!(tracker.open_handles(), 2);
        assert_eq!(dataset.container(), Path::new("container"));
        assert_eq!(dataset.name().as_str(), "data");
        file.close();
        assert_eq!(tracker.open_handles(), 1);
        drop(dataset);
        assert_eq!(tracker.open_handles(), 0);
    }
}
