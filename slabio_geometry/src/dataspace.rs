//! Dataspaces: an extent with a selection.

use std::iter::FusedIterator;

use thiserror::Error;

use crate::{Hyperslab, SizeVector, UNLIMITED};

/// A dataspace or selection error.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SelectionError {
    /// A dataspace of rank zero.
    #[error("a dataspace must have at least one axis")]
    ZeroRank,
    /// Incompatible rank.
    #[error("incompatible rank {got}, expected {expected}")]
    IncompatibleRank {
        /// The rank of the offending parameter.
        got: usize,
        /// The rank of the dataspace.
        expected: usize,
    },
    /// The number of elements in the extent does not fit in a [`u64`].
    #[error("the number of elements in extent {0} overflows")]
    ElementCountOverflow(SizeVector),
    /// An extent exceeds its maximum.
    #[error("extent {extent} of axis {axis} exceeds its maximum {maximum}")]
    ExtentExceedsMaximum {
        /// The axis.
        axis: usize,
        /// The extent.
        extent: u64,
        /// The maximum extent.
        maximum: u64,
    },
    /// A zero stride, count, or block.
    #[error("hyperslab {parameter} of axis {axis} is zero")]
    ZeroParameter {
        /// The axis.
        axis: usize,
        /// The parameter name.
        parameter: &'static str,
    },
    /// Blocks overlap because the block is longer than the stride.
    #[error("hyperslab block {block} of axis {axis} overlaps with stride {stride}")]
    OverlappingBlocks {
        /// The axis.
        axis: usize,
        /// The block length.
        block: u64,
        /// The stride.
        stride: u64,
    },
    /// The selection extends beyond the dataspace.
    #[error("hyperslab of axis {axis} ends at {end}, beyond the extent {extent}")]
    OutOfBounds {
        /// The axis.
        axis: usize,
        /// The exclusive end of the selection.
        end: u64,
        /// The extent of the axis.
        extent: u64,
    },
}

/// The selected region of a [`Dataspace`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Selection {
    /// Every element.
    #[default]
    All,
    /// A hyperslab.
    Hyperslab(Hyperslab),
}

/// An N-dimensional extent with a maximum extent and a selection.
///
/// Elements are ordered row-major (C order), and selected elements are visited in the same order.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Dataspace {
    dims: SizeVector,
    maxdims: SizeVector,
    selection: Selection,
}

impl Dataspace {
    /// Create a new dataspace with every element selected.
    ///
    /// A `maxdims` element of [`UNLIMITED`] denotes an unbounded axis.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if
    ///  - the rank is zero or the ranks differ,
    ///  - any extent exceeds its maximum, or
    ///  - the number of elements overflows a [`u64`].
    pub fn new(dims: SizeVector, maxdims: SizeVector) -> Result<Self, SelectionError> {
        if dims.rank() == 0 {
            return Err(SelectionError::ZeroRank);
        }
        if dims.rank() != maxdims.rank() {
            return Err(SelectionError::IncompatibleRank {
                got: maxdims.rank(),
                expected: dims.rank(),
            });
        }
        if let Some((axis, (&extent, &maximum))) = std::iter::zip(dims.iter(), maxdims.iter())
            .enumerate()
            .find(|(_, (extent, maximum))| extent > maximum)
        {
            return Err(SelectionError::ExtentExceedsMaximum {
                axis,
                extent,
                maximum,
            });
        }
        if dims.checked_product().is_none() {
            return Err(SelectionError::ElementCountOverflow(dims));
        }
        Ok(Self {
            dims,
            maxdims,
            selection: Selection::All,
        })
    }

    /// Create a new fixed-size dataspace (`maxdims == dims`) with every element selected.
    ///
    /// # Errors
    /// Returns [`SelectionError::ZeroRank`] if `dims` is empty, or [`SelectionError::ElementCountOverflow`].
    pub fn new_fixed(dims: SizeVector) -> Result<Self, SelectionError> {
        Self::new(dims.clone(), dims)
    }

    /// Return the rank.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.rank()
    }

    /// Return the current extent.
    #[must_use]
    pub fn dims(&self) -> &SizeVector {
        &self.dims
    }

    /// Return the maximum extent.
    #[must_use]
    pub fn maxdims(&self) -> &SizeVector {
        &self.maxdims
    }

    /// Returns true if `axis` is unbounded.
    #[must_use]
    pub fn is_unlimited(&self, axis: usize) -> bool {
        self.maxdims.get(axis) == Some(&UNLIMITED)
    }

    /// Return the selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Select every element.
    pub fn select_all(&mut self) {
        self.selection = Selection::All;
    }

    /// Select a hyperslab, replacing any existing selection.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] and leaves the selection unchanged if
    ///  - the hyperslab rank differs from the dataspace rank,
    ///  - any stride, count, or block is zero,
    ///  - blocks overlap (`block > stride` with `count > 1`), or
    ///  - the hyperslab extends beyond the current extent.
    pub fn select_hyperslab(&mut self, hyperslab: Hyperslab) -> Result<(), SelectionError> {
        if hyperslab.rank() != self.rank() {
            return Err(SelectionError::IncompatibleRank {
                got: hyperslab.rank(),
                expected: self.rank(),
            });
        }
        for axis in 0..self.rank() {
            let start = hyperslab.start()[axis];
            let stride = hyperslab.stride()[axis];
            let count = hyperslab.count()[axis];
            let block = hyperslab.block()[axis];
            for (parameter, value) in [("stride", stride), ("count", count), ("block", block)] {
                if value == 0 {
                    return Err(SelectionError::ZeroParameter { axis, parameter });
                }
            }
            if count > 1 && block > stride {
                return Err(SelectionError::OverlappingBlocks {
                    axis,
                    block,
                    stride,
                });
            }
            let extent = self.dims[axis];
            let end = (count - 1)
                .checked_mul(stride)
                .and_then(|offset| offset.checked_add(start))
                .and_then(|last| last.checked_add(block))
                .unwrap_or(u64::MAX);
            if end > extent {
                return Err(SelectionError::OutOfBounds { axis, end, extent });
            }
        }
        self.selection = Selection::Hyperslab(hyperslab);
        Ok(())
    }

    /// The extent of the selection per axis.
    #[must_use]
    pub fn selected_shape(&self) -> SizeVector {
        match &self.selection {
            Selection::All => self.dims.clone(),
            Selection::Hyperslab(hyperslab) => hyperslab.selected_shape(),
        }
    }

    /// The number of selected elements.
    #[must_use]
    pub fn num_selected(&self) -> u64 {
        // a selection never exceeds the extent, which is checked on construction
        self.selected_shape().checked_product().unwrap_or(u64::MAX)
    }

    /// The number of elements in the extent.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.dims.checked_product().unwrap_or(u64::MAX)
    }

    /// The row-major linear index of `coordinates` within the extent.
    #[must_use]
    pub fn linearise(&self, coordinates: &[u64]) -> u64 {
        std::iter::zip(coordinates, self.dims.iter())
            .fold(0, |index, (coordinate, extent)| index * extent + coordinate)
    }

    /// The row-major linear indices of the selected elements.
    #[must_use]
    pub fn selected_linear_indices(&self) -> SelectedLinearIndices<'_> {
        let shape = self.selected_shape();
        SelectedLinearIndices {
            dataspace: self,
            position: SizeVector::new(shape.rank()),
            remaining: self.num_selected(),
            shape,
        }
    }

    fn coordinate(&self, axis: usize, index: u64) -> u64 {
        match &self.selection {
            Selection::All => index,
            Selection::Hyperslab(hyperslab) => hyperslab.axis_coordinate(axis, index),
        }
    }
}

/// An iterator over the linear indices of the selected elements of a [`Dataspace`].
///
/// Iterates over the last axis fastest (i.e. C-contiguous order).
/// See [`Dataspace::selected_linear_indices`].
#[derive(Clone, Debug)]
pub struct SelectedLinearIndices<'a> {
    dataspace: &'a Dataspace,
    shape: SizeVector,
    position: SizeVector,
    remaining: u64,
}

impl Iterator for SelectedLinearIndices<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let index = std::iter::zip(self.position.iter(), self.dataspace.dims.iter())
            .enumerate()
            .fold(0, |index, (axis, (&position, &extent))| {
                index * extent + self.dataspace.coordinate(axis, position)
            });
        for axis in (0..self.position.rank()).rev() {
            self.position[axis] += 1;
            if self.position[axis] < self.shape[axis] {
                break;
            }
            self.position[axis] = 0;
        }
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).ok();
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}

impl FusedIterator for SelectedLinearIndices<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyperslab(start: [u64; 2], stride: [u64; 2], count: [u64; 2], block: [u64; 2]) -> Hyperslab {
        Hyperslab::new(start.into(), stride.into(), count.into(), block.into()).unwrap()
    }

    #[test]
    fn dataspace_new() {
        let dataspace = Dataspace::new([0, 3].into(), [UNLIMITED, 3].into()).unwrap();
        assert!(dataspace.is_unlimited(0));
        assert!(!dataspace.is_unlimited(1));
        assert_eq!(dataspace.num_elements(), 0);
        assert_eq!(dataspace.num_selected(), 0);

        assert_eq!(
            Dataspace::new_fixed(SizeVector::new(0)).unwrap_err(),
            SelectionError::ZeroRank
        );
        assert!(matches!(
            Dataspace::new([4, 5].into(), [4, 4].into()),
            Err(SelectionError::ExtentExceedsMaximum { axis: 1, .. })
        ));
        assert!(Dataspace::new([4].into(), [4, 4].into()).is_err());
        assert_eq!(
            Dataspace::new([u64::MAX, 2].into(), [UNLIMITED, 2].into()).unwrap_err(),
            SelectionError::ElementCountOverflow([u64::MAX, 2].into())
        );
        assert!(Dataspace::new_fixed([1 << 32, 1 << 32].into()).is_err());
    }

    #[test]
    fn dataspace_select_all() {
        let dataspace = Dataspace::new_fixed([2, 3].into()).unwrap();
        assert_eq!(
            dataspace.selected_linear_indices().collect::<Vec<_>>(),
            (0..6).collect::<Vec<_>>()
        );
    }

    #[test]
    fn dataspace_select_hyperslab() {
        let mut dataspace = Dataspace::new_fixed([4, 5].into()).unwrap();
        dataspace
            .select_hyperslab(hyperslab([1, 0], [2, 2], [2, 3], [1, 1]))
            .unwrap();
        assert_eq!(dataspace.selected_shape(), [2, 3]);
        assert_eq!(dataspace.num_selected(), 6);
        assert_eq!(
            dataspace.selected_linear_indices().collect::<Vec<_>>(),
            vec![5, 7, 9, 15, 17, 19]
        );

        dataspace.select_all();
        assert_eq!(dataspace.num_selected(), 20);
    }

    #[test]
    fn dataspace_select_hyperslab_blocks() {
        let mut dataspace = Dataspace::new_fixed([1, 10].into()).unwrap();
        dataspace
            .select_hyperslab(hyperslab([0, 0], [1, 4], [1, 3], [1, 2]))
            .unwrap();
        assert_eq!(
            dataspace.selected_linear_indices().collect::<Vec<_>>(),
            vec![0, 1, 4, 5, 8, 9]
        );
    }

    #[test]
    fn dataspace_selected_linear_indices_rank_3() {
        let mut dataspace = Dataspace::new_fixed([3, 4, 5].into()).unwrap();
        dataspace
            .select_hyperslab(
                Hyperslab::new(
                    [1, 0, 0].into(),
                    [1, 3, 3].into(),
                    [2, 2, 2].into(),
                    [1, 1, 2].into(),
                )
                .unwrap(),
            )
            .unwrap();
        let mut indices = dataspace.selected_linear_indices();
        assert_eq!(indices.size_hint(), (16, Some(16)));
        assert_eq!(indices.next(), Some(20));
        assert_eq!(indices.size_hint(), (15, Some(15)));
        assert_eq!(
            indices.collect::<Vec<_>>(),
            vec![21, 23, 24, 35, 36, 38, 39, 40, 41, 43, 44, 55, 56, 58, 59]
        );

        let empty = Dataspace::new_fixed([2, 0].into()).unwrap();
        let mut indices = empty.selected_linear_indices();
        assert_eq!(indices.size_hint(), (0, Some(0)));
        assert_eq!(indices.next(), None);
    }

    #[test]
    fn dataspace_select_hyperslab_invalid() {
        let mut dataspace = Dataspace::new_fixed([4, 5].into()).unwrap();
        assert_eq!(
            dataspace.select_hyperslab(hyperslab([0, 0], [1, 0], [1, 1], [1, 1])),
            Err(SelectionError::ZeroParameter {
                axis: 1,
                parameter: "stride"
            })
        );
        assert_eq!(
            dataspace.select_hyperslab(hyperslab([0, 0], [1, 2], [1, 2], [1, 3])),
            Err(SelectionError::OverlappingBlocks {
                axis: 1,
                block: 3,
                stride: 2
            })
        );
        assert_eq!(
            dataspace.select_hyperslab(hyperslab([4, 0], [1, 1], [1, 1], [1, 1])),
            Err(SelectionError::OutOfBounds {
                axis: 0,
                end: 5,
                extent: 4
            })
        );
        assert_eq!(
            dataspace.select_hyperslab(hyperslab([0, 1], [1, 2], [1, 3], [1, 1])),
            Err(SelectionError::OutOfBounds {
                axis: 1,
                end: 6,
                extent: 5
            })
        );
        assert_eq!(dataspace.selection(), &Selection::All);
    }
}
