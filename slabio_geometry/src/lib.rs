//! Dataspace geometry for the [`slabio`](https://docs.rs/slabio/latest/slabio/index.html) crate.
//!
//! This crate holds the pure shape arithmetic used to move a strided view of an in-memory array into a chunked dataset:
//!  - [`SizeVector`]: a rank-tagged vector of extents,
//!  - [`DataspaceParams`]: the full geometry of one dataspace (extents, maximum extents, hyperslab and chunk shape),
//!  - [`hyperslab_count`]: the number of blocks a hyperslab selects along an axis,
//!  - [`Dataspace`]: an extent with an applied selection, as consumed by a storage backend,
//!  - [`flat_dataset_geometry`] and [`appendable_dataset_geometry`]: the dataset shape derived from a memory view,
//!  - [`check_append`] and [`check_rows`]: whether a memory view can be appended to, or read from, the rows of a dataset.
//!
//! Nothing in this crate performs I/O.
//!
//! ## Licence
//! `slabio_geometry` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.

mod data_type;
pub use data_type::DataType;

mod size_vector;
pub use size_vector::{SizeVector, SizeVectorError};

mod hyperslab;
pub use hyperslab::{hyperslab_count, Hyperslab, HyperslabError};

mod dataspace;
pub use dataspace::{Dataspace, SelectedLinearIndices, Selection, SelectionError};

mod dataspace_params;
pub use dataspace_params::DataspaceParams;

mod dataset_geometry;
pub use dataset_geometry::{
    advance_growth_axis, appendable_dataset_geometry, check_append, check_rows, flat_dataset_geometry,
    AppendIncompatibility,
};

/// The maximum extent sentinel denoting an unbounded axis.
pub const UNLIMITED: u64 = u64::MAX;

/// The axis of an appendable dataset that grows by one row per append.
pub const GROWTH_AXIS: usize = 0;
