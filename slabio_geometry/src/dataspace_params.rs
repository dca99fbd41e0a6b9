//! The full geometry of one dataspace.

use crate::{
    hyperslab_count, DataType, Dataspace, Hyperslab, HyperslabError, SelectionError, SizeVector,
};

/// The geometry of a dataspace: extents, maximum extents, hyperslab parameters, and chunk shape.
///
/// `count` is always derived from `dims`, `start`, and `stride` (see [`hyperslab_count`]) and is never set directly.
/// All parameters share one rank; [`DataspaceParams::set_rank`] changes them together.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DataspaceParams {
    pub(crate) dims: SizeVector,
    pub(crate) maxdims: SizeVector,
    pub(crate) start: SizeVector,
    pub(crate) stride: SizeVector,
    pub(crate) count: SizeVector,
    pub(crate) block: SizeVector,
    pub(crate) chunk: SizeVector,
    data_type: DataType,
}

impl DataspaceParams {
    /// Create zeroed dataspace parameters of `rank`.
    #[must_use]
    pub fn new(rank: usize, data_type: DataType) -> Self {
        Self {
            dims: SizeVector::new(rank),
            maxdims: SizeVector::new(rank),
            start: SizeVector::new(rank),
            stride: SizeVector::new(rank),
            count: SizeVector::new(rank),
            block: SizeVector::new(rank),
            chunk: SizeVector::new(rank),
            data_type,
        }
    }

    /// Create dataspace parameters for a fixed extent with the whole extent selected.
    ///
    /// `maxdims` and `chunk` equal `dims`, `start` is zero, `stride` and `block` are one.
    #[must_use]
    pub fn with_defaults(dims: SizeVector, data_type: DataType) -> Self {
        let rank = dims.rank();
        let mut params = Self {
            maxdims: dims.clone(),
            chunk: dims.clone(),
            dims,
            start: SizeVector::new(rank),
            stride: SizeVector::uniform(rank, 1),
            count: SizeVector::new(rank),
            block: SizeVector::uniform(rank, 1),
            data_type,
        };
        params.derive_count_unchecked();
        params
    }

    /// Create dataspace parameters from the extent of an existing dataspace.
    ///
    /// The hyperslab parameters select the whole extent and `chunk` equals `dims`.
    #[must_use]
    pub fn from_dataspace(dataspace: &Dataspace, data_type: DataType) -> Self {
        let mut params = Self::with_defaults(dataspace.dims().clone(), data_type);
        params.maxdims = dataspace.maxdims().clone();
        params
    }

    /// Return the rank.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.dims.rank()
    }

    /// Change the rank of every parameter, discarding their contents.
    pub fn set_rank(&mut self, rank: usize) {
        for parameter in [
            &mut self.dims,
            &mut self.maxdims,
            &mut self.start,
            &mut self.stride,
            &mut self.count,
            &mut self.block,
            &mut self.chunk,
        ] {
            parameter.set_rank(rank);
        }
    }

    /// Return the element data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Set the element data type.
    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
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

    /// Return the hyperslab start.
    #[must_use]
    pub fn start(&self) -> &SizeVector {
        &self.start
    }

    /// Return the hyperslab stride.
    #[must_use]
    pub fn stride(&self) -> &SizeVector {
        &self.stride
    }

    /// Return the derived hyperslab block count.
    #[must_use]
    pub fn count(&self) -> &SizeVector {
        &self.count
    }

    /// Return the hyperslab block shape.
    #[must_use]
    pub fn block(&self) -> &SizeVector {
        &self.block
    }

    /// Return the chunk shape.
    #[must_use]
    pub fn chunk(&self) -> &SizeVector {
        &self.chunk
    }

    /// Set the hyperslab `start` and `stride` and derive `count`.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] and leaves the parameters unchanged if a rank differs or a stride is zero.
    pub fn set_hyperslab(&mut self, start: &[u64], stride: &[u64]) -> Result<(), HyperslabError> {
        let block = self.block.clone();
        self.set_hyperslab_with_block(start, stride, &block)
    }

    /// Set the hyperslab `start`, `stride`, and `block` and derive `count`.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] and leaves the parameters unchanged if a rank differs, a stride is zero, or a block is zero.
    pub fn set_hyperslab_with_block(
        &mut self,
        start: &[u64],
        stride: &[u64],
        block: &[u64],
    ) -> Result<(), HyperslabError> {
        let mut candidate = self.clone();
        candidate.start.assign_from(start)?;
        candidate.stride.assign_from(stride)?;
        candidate.block.assign_from(block)?;
        if let Some(axis) = candidate.block.iter().position(|&block| block == 0) {
            return Err(SelectionError::ZeroParameter {
                axis,
                parameter: "block",
            }
            .into());
        }
        candidate.set_count()?;
        *self = candidate;
        Ok(())
    }

    /// Derive `count` from `dims`, `start`, and `stride` with [`hyperslab_count`].
    ///
    /// # Errors
    /// Returns [`HyperslabError::ZeroStride`] if any stride is zero.
    pub fn set_count(&mut self) -> Result<(), HyperslabError> {
        for axis in 0..self.rank() {
            self.count[axis] =
                hyperslab_count(self.dims[axis], self.start[axis], self.stride[axis])
                    .ok_or(HyperslabError::ZeroStride(axis))?;
        }
        Ok(())
    }

    fn derive_count_unchecked(&mut self) {
        for axis in 0..self.rank() {
            self.count[axis] =
                hyperslab_count(self.dims[axis], self.start[axis], self.stride[axis]).unwrap_or(1);
        }
    }

    /// The selected extent per axis, `block * count`.
    #[must_use]
    pub fn effective_shape(&self) -> SizeVector {
        std::iter::zip(self.block.iter(), self.count.iter())
            .map(|(block, count)| block * count)
            .collect()
    }

    /// Return the current hyperslab parameters.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] if the parameters are inconsistent.
    pub fn hyperslab(&self) -> Result<Hyperslab, HyperslabError> {
        Hyperslab::new(
            self.start.clone(),
            self.stride.clone(),
            self.count.clone(),
            self.block.clone(),
        )
    }

    /// Create a dataspace with this extent and maximum extent and every element selected.
    ///
    /// # Errors
    /// Returns a [`SelectionError`] if the rank is zero or an extent exceeds its maximum.
    pub fn create_dataspace(&self) -> Result<Dataspace, SelectionError> {
        Dataspace::new(self.dims.clone(), self.maxdims.clone())
    }

    /// Derive `count` and select the hyperslab on `dataspace`.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] if a stride is zero or `dataspace` rejects the selection.
    pub fn apply_selection(&mut self, dataspace: &mut Dataspace) -> Result<(), HyperslabError> {
        self.set_count()?;
        dataspace.select_hyperslab(self.hyperslab()?)?;
        Ok(())
    }

    /// Create a dataspace and apply the hyperslab selection to it.
    ///
    /// # Errors
    /// Returns a [`HyperslabError`] if the dataspace cannot be created or the selection is rejected.
    pub fn selected_dataspace(&mut self) -> Result<Dataspace, HyperslabError> {
        let mut dataspace = self.create_dataspace()?;
        self.apply_selection(&mut dataspace)?;
        Ok(dataspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataspace_params_defaults() {
        let params = DataspaceParams::with_defaults([10, 4].into(), DataType::Float64);
        assert_eq!(params.rank(), 2);
        assert_eq!(params.maxdims(), &[10, 4]);
        assert_eq!(params.chunk(), &[10, 4]);
        assert_eq!(params.start(), &[0, 0]);
        assert_eq!(params.stride(), &[1, 1]);
        assert_eq!(params.block(), &[1, 1]);
        assert_eq!(params.count(), &[10, 4]);
        assert_eq!(params.effective_shape(), [10, 4]);
    }

    #[test]
    fn dataspace_params_set_rank() {
        let mut params = DataspaceParams::with_defaults([10, 4].into(), DataType::Int32);
        params.set_rank(3);
        for parameter in [
            params.dims(),
            params.maxdims(),
            params.start(),
            params.stride(),
            params.count(),
            params.block(),
            params.chunk(),
        ] {
            assert_eq!(parameter, &[0, 0, 0]);
        }
        assert_eq!(params.data_type(), DataType::Int32);
    }

    #[test]
    fn dataspace_params_set_hyperslab() {
        let mut params = DataspaceParams::with_defaults([10, 10].into(), DataType::Float32);
        params.set_hyperslab(&[0, 0], &[4, 41]).unwrap();
        assert_eq!(params.count(), &[3, 1]);
        assert_eq!(params.effective_shape(), [3, 1]);

        params
            .set_hyperslab_with_block(&[0, 0], &[4, 1], &[2, 1])
            .unwrap();
        assert_eq!(params.count(), &[3, 10]);
        assert_eq!(params.effective_shape(), [6, 10]);
    }

    #[test]
    fn dataspace_params_set_hyperslab_rejected() {
        let mut params = DataspaceParams::with_defaults([10, 10].into(), DataType::Float32);
        let before = params.clone();
        assert_eq!(
            params.set_hyperslab(&[0, 0], &[1, 0]),
            Err(HyperslabError::ZeroStride(1))
        );
        assert!(matches!(
            params.set_hyperslab(&[0], &[1, 1]),
            Err(HyperslabError::IncompatibleRank(_))
        ));
        assert!(params
            .set_hyperslab_with_block(&[0, 0], &[1, 1], &[0, 1])
            .is_err());
        assert_eq!(params, before);
    }

    #[test]
    fn dataspace_params_apply_selection() {
        let mut params = DataspaceParams::with_defaults([4, 6].into(), DataType::UInt8);
        params.set_hyperslab(&[1, 0], &[4, 2]).unwrap();
        let dataspace = params.selected_dataspace().unwrap();
        assert_eq!(
            dataspace.selected_linear_indices().collect::<Vec<_>>(),
            vec![6, 8, 10]
        );
    }

    #[test]
    fn dataspace_params_apply_selection_out_of_bounds() {
        let mut params = DataspaceParams::with_defaults([4, 6].into(), DataType::UInt8);
        params.set_hyperslab(&[4, 0], &[1, 1]).unwrap();
        assert_eq!(params.count(), &[1, 6]);
        assert!(matches!(
            params.selected_dataspace(),
            Err(HyperslabError::Selection(SelectionError::OutOfBounds { axis: 0, .. }))
        ));
    }

    #[test]
    fn dataspace_params_from_dataspace() {
        let dataspace = Dataspace::new([2, 5].into(), [crate::UNLIMITED, 5].into()).unwrap();
        let params = DataspaceParams::from_dataspace(&dataspace, DataType::Int16);
        assert_eq!(params.dims(), &[2, 5]);
        assert_eq!(params.maxdims(), &[crate::UNLIMITED, 5]);
        assert_eq!(params.count(), &[2, 5]);
    }
}
