//! Rank-tagged extent vectors.

use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use thiserror::Error;
use tinyvec::TinyVec;

/// An incompatible rank error.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum SizeVectorError {
    /// The ranks of two size vectors differ.
    #[error("incompatible rank {got}, expected {expected}")]
    IncompatibleRank {
        /// The rank of the source.
        got: usize,
        /// The rank of the destination.
        expected: usize,
    },
}

/// A fixed-length sequence of unsigned extents, one per axis.
///
/// The length of a [`SizeVector`] is its rank.
/// The rank only changes through [`SizeVector::set_rank`], which discards the contents.
/// Elements are accessed by index like a slice.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct SizeVector(TinyVec<[u64; 4]>);

impl SizeVector {
    /// Create a zero-initialised size vector with `rank` elements.
    #[must_use]
    pub fn new(rank: usize) -> Self {
        Self::uniform(rank, 0)
    }

    /// Create a size vector with `rank` elements all equal to `value`.
    #[must_use]
    pub fn uniform(rank: usize, value: u64) -> Self {
        let mut values = TinyVec::new();
        values.resize(rank, value);
        Self(values)
    }

    /// Return the rank.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: u64) {
        self.0.iter_mut().for_each(|element| *element = value);
    }

    /// Copy the elements of `other` into `self`.
    ///
    /// # Errors
    /// Returns [`SizeVectorError::IncompatibleRank`] if the ranks differ, leaving `self` unchanged.
    pub fn assign_from(&mut self, other: &[u64]) -> Result<(), SizeVectorError> {
        if other.len() == self.rank() {
            self.0.copy_from_slice(other);
            Ok(())
        } else {
            Err(SizeVectorError::IncompatibleRank {
                got: other.len(),
                expected: self.rank(),
            })
        }
    }

    /// Change the rank, discarding the contents.
    ///
    /// All elements are zero afterwards.
    pub fn set_rank(&mut self, rank: usize) {
        self.0.clear();
        self.0.resize(rank, 0);
    }

    /// The product of the elements, or [`None`] if it overflows a [`u64`].
    ///
    /// A rank 0 size vector has a product of 1.
    #[must_use]
    pub fn checked_product(&self) -> Option<u64> {
        self.0
            .iter()
            .try_fold(1u64, |product, &element| product.checked_mul(element))
    }

    /// Return the elements as a [`Vec`].
    #[must_use]
    pub fn to_vec(&self) -> Vec<u64> {
        self.0.to_vec()
    }
}

impl Deref for SizeVector {
    type Target = [u64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SizeVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<&[u64]> for SizeVector {
    fn from(values: &[u64]) -> Self {
        Self(values.iter().copied().collect())
    }
}

impl From<Vec<u64>> for SizeVector {
    fn from(values: Vec<u64>) -> Self {
        Self(values.into_iter().collect())
    }
}

impl<const N: usize> From<[u64; N]> for SizeVector {
    fn from(values: [u64; N]) -> Self {
        Self(values.into_iter().collect())
    }
}

impl FromIterator<u64> for SizeVector {
    fn from_iter<T: IntoIterator<Item = u64>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PartialEq<[u64]> for SizeVector {
    fn eq(&self, other: &[u64]) -> bool {
        self.0.as_slice() == other
    }
}

impl<const N: usize> PartialEq<[u64; N]> for SizeVector {
    fn eq(&self, other: &[u64; N]) -> bool {
        self.0.as_slice() == other.as_slice()
    }
}

impl Display for SizeVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_vector_new() {
        let size = SizeVector::new(3);
        assert_eq!(size.rank(), 3);
        assert_eq!(size, [0, 0, 0]);
        assert_eq!(SizeVector::uniform(2, 7), [7, 7]);
        assert_eq!(SizeVector::new(0).checked_product(), Some(1));
    }

    #[test]
    fn size_vector_index_fill() {
        let mut size = SizeVector::new(6);
        size[1] = 4;
        size[5] = 2;
        assert_eq!(size, [0, 4, 0, 0, 0, 2]);
        size.fill(3);
        assert_eq!(size, [3; 6]);
        assert_eq!(size.checked_product(), Some(729));
        assert_eq!(size.to_string(), "[3, 3, 3, 3, 3, 3]");
    }

    #[test]
    fn size_vector_product_overflow() {
        assert_eq!(SizeVector::from([u64::MAX, 2]).checked_product(), None);
        assert_eq!(SizeVector::from([1 << 32, 1 << 32]).checked_product(), None);
        assert_eq!(
            SizeVector::from([1 << 32, (1 << 32) - 1]).checked_product(),
            Some(u64::MAX - (1 << 32) + 1)
        );
        // a zero extent never overflows
        assert_eq!(SizeVector::from([u64::MAX, 0, u64::MAX]).checked_product(), Some(0));
        assert_eq!(SizeVector::from([0, u64::MAX]).checked_product(), Some(0));
    }

    #[test]
    fn size_vector_assign_from() {
        let mut size = SizeVector::from([1, 2, 3]);
        size.assign_from(&[4, 5, 6]).unwrap();
        assert_eq!(size, [4, 5, 6]);

        let err = size.assign_from(&[7, 8]).unwrap_err();
        assert_eq!(
            err,
            SizeVectorError::IncompatibleRank {
                got: 2,
                expected: 3
            }
        );
        assert_eq!(size, [4, 5, 6]);
        assert!(size.assign_from(&[7, 8, 9, 10]).is_err());
    }

    #[test]
    fn size_vector_set_rank_discards() {
        let mut size = SizeVector::from(vec![9, 9]);
        size.set_rank(4);
        assert_eq!(size, [0, 0, 0, 0]);
        size.set_rank(1);
        assert_eq!(size, [0]);
    }
}
