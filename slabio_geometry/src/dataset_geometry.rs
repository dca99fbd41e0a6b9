//! Dataset shapes derived from a memory view.
//!
//! A memory view is written to a dataset either once (a *flat* write) or one row at a time (an *append*).
//!
//! Flat datasets drop every axis whose selected extent is one, so a single row selected from a matrix is stored as a
//! vector. If every axis collapses, the dataset is a single element of rank 1.
//!
//! Appendable datasets have one more axis than the memory view. Axis 0 ([`GROWTH_AXIS`]) starts empty and is unbounded,
//! the remaining axes mirror the selected extent of the memory view without dropping any axis.

use thiserror::Error;

use crate::{DataspaceParams, SizeVector, GROWTH_AXIS, UNLIMITED};

/// The reason a memory view cannot be appended to a dataset.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AppendIncompatibility {
    /// The dataset rank is not one more than the memory rank.
    #[error("dataset rank {dataset} is not the memory rank plus one ({expected})")]
    Rank {
        /// The dataset rank.
        dataset: usize,
        /// The required rank.
        expected: usize,
    },
    /// The growth axis has reached its maximum extent.
    #[error("the growth axis is full at extent {extent} (maximum {maximum})")]
    GrowthAxisFull {
        /// The current extent.
        extent: u64,
        /// The maximum extent.
        maximum: u64,
    },
    /// A row axis differs from the selected extent of the memory view.
    #[error("dataset axis {axis} has extent {dataset}, but the memory view selects {memory}")]
    AxisExtent {
        /// The dataset axis.
        axis: usize,
        /// The dataset extent.
        dataset: u64,
        /// The selected memory extent.
        memory: u64,
    },
}

/// Derive the geometry of a new fixed-size dataset from a memory view.
///
/// The dataset keeps the axes of `memory` with a selected extent (`block * count`) greater than one, in order.
/// If no axis survives the dataset has rank 1 and a single element.
/// `maxdims` and `chunk` equal `dims`.
#[must_use]
pub fn flat_dataset_geometry(memory: &DataspaceParams) -> DataspaceParams {
    let mut dims: SizeVector = memory
        .effective_shape()
        .iter()
        .copied()
        .filter(|&extent| extent > 1)
        .collect();
    if dims.rank() == 0 {
        dims = SizeVector::from([1]);
    }
    DataspaceParams::with_defaults(dims, memory.data_type())
}

/// Derive the geometry of a new appendable dataset from a memory view.
///
/// The dataset has rank `memory.rank() + 1`. The growth axis has extent 0 and is unbounded, and axis `i > 0` has the
/// selected extent of memory axis `i - 1`. The chunk shape equals `dims` except for one row along the growth axis.
#[must_use]
pub fn appendable_dataset_geometry(memory: &DataspaceParams) -> DataspaceParams {
    let rank = memory.rank() + 1;
    let mut dataset = DataspaceParams::new(rank, memory.data_type());
    for (axis, extent) in memory.effective_shape().iter().enumerate() {
        dataset.dims[axis + 1] = *extent;
    }
    dataset.dims[GROWTH_AXIS] = 0;
    dataset.maxdims = dataset.dims.clone();
    dataset.maxdims[GROWTH_AXIS] = UNLIMITED;
    dataset.chunk = dataset.dims.clone();
    dataset.chunk[GROWTH_AXIS] = 1;
    dataset.stride.fill(1);
    dataset.block.fill(1);
    dataset
}

/// Check that every row of a dataset has the selected shape of a memory view.
///
/// This succeeds only if
///  - the dataset rank is the memory rank plus one, and
///  - every other dataset axis `i` equals `block[i - 1] * count[i - 1]` of the memory view.
///
/// # Errors
/// Returns the first [`AppendIncompatibility`] found.
pub fn check_rows(
    dataset: &DataspaceParams,
    memory: &DataspaceParams,
) -> Result<(), AppendIncompatibility> {
    if dataset.rank() != memory.rank() + 1 {
        return Err(AppendIncompatibility::Rank {
            dataset: dataset.rank(),
            expected: memory.rank() + 1,
        });
    }
    for (axis, memory_extent) in memory.effective_shape().iter().enumerate() {
        let dataset_extent = dataset.dims[axis + 1];
        if dataset_extent != *memory_extent {
            return Err(AppendIncompatibility::AxisExtent {
                axis: axis + 1,
                dataset: dataset_extent,
                memory: *memory_extent,
            });
        }
    }
    Ok(())
}

/// Check that a memory view can be appended as one row of a dataset.
///
/// This succeeds only if the rows of the dataset match the memory view (see [`check_rows`]) and the growth axis is
/// unbounded or below its maximum extent.
///
/// # Errors
/// Returns the first [`AppendIncompatibility`] found.
pub fn check_append(
    dataset: &DataspaceParams,
    memory: &DataspaceParams,
) -> Result<(), AppendIncompatibility> {
    if dataset.rank() != memory.rank() + 1 {
        return Err(AppendIncompatibility::Rank {
            dataset: dataset.rank(),
            expected: memory.rank() + 1,
        });
    }
    let extent = dataset.dims[GROWTH_AXIS];
    let maximum = dataset.maxdims[GROWTH_AXIS];
    if maximum != UNLIMITED && extent >= maximum {
        return Err(AppendIncompatibility::GrowthAxisFull { extent, maximum });
    }
    check_rows(dataset, memory)
}

/// Grow `dataset` by one row along the growth axis and select that row.
///
/// The hyperslab starts at the previous extent of the growth axis with unit stride and block; `count` is
/// derived when the selection is applied. Returns the previous extent of the growth axis.
///
/// Always grows by exactly one row, regardless of the memory view block shape.
pub fn advance_growth_axis(dataset: &mut DataspaceParams) -> u64 {
    let row = dataset.dims[GROWTH_AXIS];
    dataset.start.fill(0);
    dataset.start[GROWTH_AXIS] = row;
    dataset.stride.fill(1);
    dataset.block.fill(1);
    dataset.dims[GROWTH_AXIS] = row + 1;
    row
}
