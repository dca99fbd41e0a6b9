//! `slabio` is a Rust library for writing strided views of in-memory arrays to chunked, optionally compressed datasets.
//!
//! A session ([`ArrayIO`](crate::array_io::ArrayIO)) describes an in-memory N-dimensional array and a *hyperslab*
//! selecting part of it: a start offset, a stride, and a block shape per axis.
//! Only the selected elements are transferred, so a single row, a single column, or every fourth element of an array
//! can be written without first copying it into a contiguous buffer.
//!
//! Datasets are written in one of two ways:
//!  - a *flat* write creates a new fixed-size dataset shaped like the selection, dropping axes of extent one, and
//!  - an *append* adds the selection as the next row of a growable dataset whose first axis is unbounded.
//!
//! Appends are checked against the current shape of the dataset before anything is changed.
//! A dataset is never left with a half-written row.
//!
//! ## Getting Started
#![cfg_attr(feature = "filesystem", doc = "```rust")]
#![cfg_attr(not(feature = "filesystem"), doc = "```rust,ignore")]
//! # use std::sync::Arc;
//! use slabio::array_io::ArrayIO;
//! use slabio::filesystem::FilesystemBackend;
//!
//! # let path = tempfile::TempDir::new()?;
//! # let path = path.path().join("example.slab");
//! let storage = Arc::new(FilesystemBackend::new());
//! let mut array_io = ArrayIO::new_for::<f32>(storage, &[8, 8])?;
//!
//! // Write every second column of the array as an 8x4 dataset
//! let array: Vec<f32> = (0..64u8).map(f32::from).collect();
//! array_io.set_hyperslab(&[0, 0], &[1, 2])?;
//! array_io.write_array(&array, &path, "measurements/even", false)?;
//!
//! // Append the third row as the first row of a growable dataset
//! array_io.set_hyperslab_1d(1, &[2, 0], 1)?;
//! array_io.write_array(&array, &path, "measurements/rows", true)?;
//! assert_eq!(array_io.dataset_extent(&path, "measurements/rows")?, [1, 1, 8]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Storage
//! Datasets live in *containers* of a storage backend implementing
//! [`StorageBackendTraits`](crate::storage::StorageBackendTraits):
//!  - [`FilesystemBackend`](crate::filesystem::FilesystemBackend) stores a container as a directory with JSON
//!    metadata and one file per chunk, and
//!  - [`MemoryBackend`](crate::storage::backend::MemoryBackend) keeps containers in memory, and can inject failures
//!    for testing.
//!
//! ## Configuration
//! Compression and the default verbosity of new sessions are set through the [global config](crate::config::global_config).
//!
//! ## Logging
//! `slabio` logs information and warnings using the [`log`] crate.
//! A logging implementation must be enabled to capture logs.
//! Storage backends log failed operations as errors, except while probing for containers or datasets that may not
//! exist. Sessions log dataset creation and appends according to their [`Verbosity`](crate::array_io::Verbosity).
//!
//! ## Crate Features
//! #### Default
//!  - `filesystem`: Re-export [`slabio_filesystem`] as [`slabio::filesystem`](crate::filesystem).
//!  - `gzip`: Enable the gzip codec of the filesystem backend.
//!
//! ## Licence
//! `slabio` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod array_io;
pub mod config;

pub use slabio_geometry as geometry;
pub use slabio_storage as storage;

#[cfg(feature = "filesystem")]
pub use slabio_filesystem as filesystem;
