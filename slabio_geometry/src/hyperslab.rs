//! Hyperslab parameters and the block count formula.

use thiserror::Error;

use crate::{SelectionError, SizeVector, SizeVectorError};

/// A hyperslab error.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum HyperslabError {
    /// A stride of zero.
    #[error("stride of axis {0} is zero")]
    ZeroStride(usize),
    /// A parameter with the wrong rank.
    #[error(transparent)]
    IncompatibleRank(#[from] SizeVectorError),
    /// An axis outside the dataspace rank.
    #[error("axis {axis} is out of bounds for rank {rank}")]
    InvalidAxis {
        /// The requested axis.
        axis: usize,
        /// The dataspace rank.
        rank: usize,
    },
    /// The selection was rejected by the dataspace.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Compute the number of blocks selected along one axis.
///
/// `count = ceil((dims - start) / stride)`, clamped to `[1, dims]`.
/// The lower clamp means a stride at least as large as the remaining extent always selects exactly one block,
/// which is how an axis is collapsed. A `start` at or beyond `dims` also yields one block; such a selection
/// is rejected later by [`Dataspace::select_hyperslab`](crate::Dataspace::select_hyperslab).
///
/// Returns [`None`] if `stride` is zero.
#[must_use]
pub fn hyperslab_count(dims: u64, start: u64, stride: u64) -> Option<u64> {
    if stride == 0 {
        return None;
    }
    let remaining = dims.saturating_sub(start);
    let count = remaining / stride + u64::from(remaining % stride != 0);
    Some(count.clamp(1, dims.max(1)))
}

/// A regularly strided selection: `count` blocks of `block` elements, `stride` apart, from `start`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Hyperslab {
    start: SizeVector,
    stride: SizeVector,
    count: SizeVector,
    block: SizeVector,
}

impl Hyperslab {
    /// Create a new hyperslab.
    ///
    /// # Errors
    /// Returns [`HyperslabError::IncompatibleRank`] if the parameters differ in rank.
    pub fn new(
        start: SizeVector,
        stride: SizeVector,
        count: SizeVector,
        block: SizeVector,
    ) -> Result<Self, HyperslabError> {
        let rank = start.rank();
        for parameter in [&stride, &count, &block] {
            if parameter.rank() != rank {
                return Err(SizeVectorError::IncompatibleRank {
                    got: parameter.rank(),
                    expected: rank,
                }
                .into());
            }
        }
        Ok(Self {
            start,
            stride,
            count,
            block,
        })
    }

    /// Return the rank.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.start.rank()
    }

    /// Return the start.
    #[must_use]
    pub fn start(&self) -> &SizeVector {
        &self.start
    }

    /// Return the stride.
    #[must_use]
    pub fn stride(&self) -> &SizeVector {
        &self.stride
    }

    /// Return the block count.
    #[must_use]
    pub fn count(&self) -> &SizeVector {
        &self.count
    }

    /// Return the block shape.
    #[must_use]
    pub fn block(&self) -> &SizeVector {
        &self.block
    }

    /// The selected extent per axis, `block * count`.
    #[must_use]
    pub fn selected_shape(&self) -> SizeVector {
        std::iter::zip(self.block.iter(), self.count.iter())
            .map(|(block, count)| block * count)
            .collect()
    }

    /// The coordinate of the `index`th selected element along `axis`.
    ///
    /// `index` must be less than `selected_shape()[axis]`.
    pub(crate) fn axis_coordinate(&self, axis: usize, index: u64) -> u64 {
        let block = self.block[axis];
        self.start[axis] + (index / block) * self.stride[axis] + index % block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyperslab_count_ceiling() {
        assert_eq!(hyperslab_count(10, 0, 4).unwrap(), 3);
        assert_eq!(hyperslab_count(10, 0, 5).unwrap(), 2);
        assert_eq!(hyperslab_count(10, 1, 3).unwrap(), 3);
        assert_eq!(hyperslab_count(10, 2, 3).unwrap(), 3);
        assert_eq!(hyperslab_count(10, 0, 1).unwrap(), 10);
    }

    #[test]
    fn hyperslab_count_matches_float_ceiling() {
        for dims in 1..20u64 {
            for start in 0..dims {
                for stride in 1..25u64 {
                    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let expected = ((dims - start) as f64 / stride as f64).ceil() as u64;
                    assert_eq!(
                        hyperslab_count(dims, start, stride).unwrap(),
                        expected.clamp(1, dims)
                    );
                }
            }
        }
    }

    #[test]
    fn hyperslab_count_collapse() {
        assert_eq!(hyperslab_count(10, 0, 41).unwrap(), 1);
        assert_eq!(hyperslab_count(10, 0, 10).unwrap(), 1);
        assert_eq!(hyperslab_count(10, 9, 10).unwrap(), 1);
    }

    #[test]
    fn hyperslab_count_clamp_boundaries() {
        // start at or past the extent leaves nothing, the lower clamp still selects one block
        assert_eq!(hyperslab_count(10, 10, 1).unwrap(), 1);
        assert_eq!(hyperslab_count(10, 15, 2).unwrap(), 1);
        // stride 1 from the origin reaches the upper clamp exactly
        assert_eq!(hyperslab_count(7, 0, 1).unwrap(), 7);
        assert_eq!(hyperslab_count(0, 0, 1).unwrap(), 1);
    }

    #[test]
    fn hyperslab_count_zero_stride() {
        assert_eq!(hyperslab_count(10, 0, 0), None);
    }

    #[test]
    fn hyperslab_coordinates() {
        let hyperslab = Hyperslab::new(
            SizeVector::from([1, 0]),
            SizeVector::from([4, 1]),
            SizeVector::from([2, 3]),
            SizeVector::from([2, 1]),
        )
        .unwrap();
        assert_eq!(hyperslab.selected_shape(), [4, 3]);
        assert_eq!(
            (0..4).map(|i| hyperslab.axis_coordinate(0, i)).collect::<Vec<_>>(),
            vec![1, 2, 5, 6]
        );
        assert_eq!(
            (0..3).map(|i| hyperslab.axis_coordinate(1, i)).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn hyperslab_rank_mismatch() {
        assert!(Hyperslab::new(
            SizeVector::from([0, 0]),
            SizeVector::from([1]),
            SizeVector::from([1, 1]),
            SizeVector::from([1, 1]),
        )
        .is_err());
    }
}
