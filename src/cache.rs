//! memoization of random matrices, so that repeated runs over the same configuration see the same
//! input.

use crate::random::{GenerationError, GeneratorParams, random_matrix_of_size};
use faer::sparse::SparseColMat;
use rand::Rng;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

// the density is keyed by its bit pattern
type CacheKey = (usize, usize, u64);

/// cache of random sparse matrices, keyed by their shape and density.
///
/// a matrix is generated the first time its key is requested, and is returned unchanged on every
/// subsequent request. entries are never evicted
#[derive(Clone, Debug, Default)]
pub struct MatrixCache {
	params: GeneratorParams,
	matrices: BTreeMap<CacheKey, SparseColMat<usize, f64>>,
}

impl MatrixCache {
	/// returns an empty cache
	#[inline]
	pub fn new() -> Self {
		Self::default()
	}

	/// returns an empty cache that generates its matrices with the given parameters
	#[inline]
	pub fn with_params(params: GeneratorParams) -> Self {
		Self {
			params,
			matrices: BTreeMap::new(),
		}
	}

	/// returns the number of cached matrices
	#[inline]
	pub fn len(&self) -> usize {
		self.matrices.len()
	}

	/// returns `true` if no matrix has been generated yet
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.matrices.is_empty()
	}

	/// returns the matrix with the given shape and density, generating it with `rng` on the first
	/// request. `rng` is left untouched on later requests
	pub fn get_random_matrix(
		&mut self,
		rng: &mut impl Rng,
		nrows: usize,
		ncols: usize,
		density: f64,
	) -> Result<&SparseColMat<usize, f64>, GenerationError> {
		let params = self.params;
		match self.matrices.entry((nrows, ncols, density.to_bits())) {
			Entry::Occupied(entry) => Ok(entry.into_mut()),
			Entry::Vacant(entry) => {
				log::debug!("generating {nrows}x{ncols} matrix with density {density}");
				let mat = random_matrix_of_size(rng, nrows, ncols, density, params)?;
				Ok(entry.insert(mat))
			},
		}
	}
}
