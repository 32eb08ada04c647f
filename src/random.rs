//! random sparse matrices for differential testing.
//!
//! positions are visited in row-major order. each position draws a uniform value in $[0, 1)$ and
//! is populated when the draw is below the requested density, in which case a second draw scaled
//! by [`VALUE_SCALE`] gives its value.

use faer::sparse::{CreationError, SparseColMat, Triplet};
use rand::Rng;

/// upper bound (exclusive) of the generated values
pub const VALUE_SCALE: f64 = 10.0;

/// random generation parameters
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeneratorParams {
	/// maximum number of draws before giving up on producing a matrix with at least one entry
	pub max_attempts: usize,
}

impl Default for GeneratorParams {
	#[inline]
	fn default() -> Self {
		Self { max_attempts: 1000 }
	}
}

/// errors that can occur during random generation
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GenerationError {
	/// the density is not a probability
	InvalidDensity(f64),
	/// one of the requested dimensions is zero
	EmptyShape {
		/// requested number of rows
		nrows: usize,
		/// requested number of columns
		ncols: usize,
	},
	/// every draw produced a matrix with no entry
	Exhausted {
		/// number of draws
		attempts: usize,
	},
	/// the sparse matrix could not be created
	Creation(CreationError),
}

impl From<CreationError> for GenerationError {
	#[inline]
	fn from(value: CreationError) -> Self {
		Self::Creation(value)
	}
}

impl core::fmt::Display for GenerationError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		match self {
			Self::InvalidDensity(density) => write!(f, "density must lie in [0, 1], got {density}"),
			Self::EmptyShape { nrows, ncols } => write!(f, "cannot generate a {nrows}x{ncols} matrix"),
			Self::Exhausted { attempts } => write!(f, "no entry was drawn after {attempts} attempts"),
			Self::Creation(err) => core::fmt::Debug::fmt(err, f),
		}
	}
}

impl core::error::Error for GenerationError {}

/// draws a single `nrows×ncols` matrix, returns `None` if no position was populated
pub fn try_random_matrix_of_size(
	rng: &mut impl Rng,
	nrows: usize,
	ncols: usize,
	density: f64,
) -> Result<Option<SparseColMat<usize, f64>>, GenerationError> {
	let mut triplets = Vec::new();
	for i in 0..nrows {
		for j in 0..ncols {
			if rng.gen::<f64>() < density {
				triplets.push(Triplet::new(i, j, VALUE_SCALE * rng.gen::<f64>()));
			}
		}
	}

	if triplets.is_empty() {
		return Ok(None);
	}
	Ok(Some(SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)?))
}

/// draws `nrows×ncols` matrices until one of them has at least one entry
pub fn random_matrix_of_size(
	rng: &mut impl Rng,
	nrows: usize,
	ncols: usize,
	density: f64,
	params: GeneratorParams,
) -> Result<SparseColMat<usize, f64>, GenerationError> {
	if !(0.0..=1.0).contains(&density) {
		return Err(GenerationError::InvalidDensity(density));
	}
	if nrows == 0 || ncols == 0 {
		return Err(GenerationError::EmptyShape { nrows, ncols });
	}

	for attempt in 0..params.max_attempts {
		if let Some(mat) = try_random_matrix_of_size(rng, nrows, ncols, density)? {
			if attempt > 0 {
				log::trace!("{nrows}x{ncols} matrix with density {density} drawn after {} attempts", attempt + 1);
			}
			return Ok(mat);
		}
	}

	Err(GenerationError::Exhausted {
		attempts: params.max_attempts,
	})
}

/// draws a matrix whose dimensions are uniform in `[1, max_dim]`.
///
/// the number of rows is drawn first, then the number of columns. the dimensions are kept when the
/// draw has to be repeated
pub fn random_matrix(
	rng: &mut impl Rng,
	max_dim: usize,
	density: f64,
	params: GeneratorParams,
) -> Result<SparseColMat<usize, f64>, GenerationError> {
	if max_dim == 0 {
		return Err(GenerationError::EmptyShape { nrows: 0, ncols: 0 });
	}
	let nrows = rng.gen_range(1..=max_dim);
	let ncols = rng.gen_range(1..=max_dim);
	random_matrix_of_size(rng, nrows, ncols, density, params)
}

/// draws two conformable matrices $A$ and $B$, so that $AB$ is defined
pub fn random_matrix_pair(
	rng: &mut impl Rng,
	max_dim: usize,
	density: f64,
	params: GeneratorParams,
) -> Result<(SparseColMat<usize, f64>, SparseColMat<usize, f64>), GenerationError> {
	if max_dim == 0 {
		return Err(GenerationError::EmptyShape { nrows: 0, ncols: 0 });
	}
	let m = rng.gen_range(1..=max_dim);
	let k = rng.gen_range(1..=max_dim);
	let n = rng.gen_range(1..=max_dim);

	let lhs = random_matrix_of_size(rng, m, k, density, params)?;
	let rhs = random_matrix_of_size(rng, k, n, density, params)?;
	Ok((lhs, rhs))
}

/// returns `true` if some row of `mat` holds no entry
pub fn has_empty_row(mat: &SparseColMat<usize, f64>) -> bool {
	let mut seen = vec![false; mat.nrows()];
	for j in 0..mat.ncols() {
		for &i in mat.row_idx_of_col_raw(j) {
			seen[i] = true;
		}
	}
	seen.iter().any(|&seen| !seen)
}

#[cfg(test)]
mod tests {
	use super::*;
	use equator::assert;
	use rand::prelude::*;

	#[test]
	fn test_generated_matrices_are_nonempty() {
		let rng = &mut StdRng::seed_from_u64(0);

		for _ in 0..200 {
			let a = random_matrix(rng, 6, 0.05, GeneratorParams::default()).unwrap();
			assert!(all(a.compute_nnz() > 0, a.nrows() >= 1, a.nrows() <= 6, a.ncols() >= 1, a.ncols() <= 6));

			for j in 0..a.ncols() {
				for &v in a.val_of_col(j) {
					assert!(all(v >= 0.0, v < VALUE_SCALE));
				}
			}
		}
	}

	#[test]
	fn test_full_density() {
		let rng = &mut StdRng::seed_from_u64(1);
		let a = random_matrix_of_size(rng, 7, 4, 1.0, GeneratorParams::default()).unwrap();
		assert!(all(a.compute_nnz() == 28, !has_empty_row(&a)));
	}

	#[test]
	fn test_has_empty_row() {
		let a = SparseColMat::try_new_from_triplets(3, 2, &[Triplet::new(0, 0, 1.0), Triplet::new(2, 1, 1.0)]).unwrap();
		assert!(has_empty_row(&a));

		let a = SparseColMat::try_new_from_triplets(3, 2, &[Triplet::new(0, 0, 1.0), Triplet::new(1, 1, 1.0), Triplet::new(2, 1, 1.0)])
			.unwrap();
		assert!(!has_empty_row(&a));
	}

	#[test]
	fn test_zero_density_is_exhausted() {
		let rng = &mut StdRng::seed_from_u64(2);
		let params = GeneratorParams { max_attempts: 16 };

		assert!(random_matrix_of_size(rng, 5, 5, 0.0, params).err() == Some(GenerationError::Exhausted { attempts: 16 }));
		assert!(try_random_matrix_of_size(rng, 5, 5, 0.0).unwrap().is_none());
	}

	#[test]
	fn test_invalid_input() {
		let rng = &mut StdRng::seed_from_u64(3);
		let params = GeneratorParams::default();

		assert!(random_matrix_of_size(rng, 5, 5, 1.5, params).err() == Some(GenerationError::InvalidDensity(1.5)));
		assert!(random_matrix_of_size(rng, 0, 5, 0.5, params).err() == Some(GenerationError::EmptyShape { nrows: 0, ncols: 5 }));
		assert!(random_matrix(rng, 0, 0.5, params).err() == Some(GenerationError::EmptyShape { nrows: 0, ncols: 0 }));
		assert!(matches!(random_matrix_of_size(rng, 5, 5, f64::NAN, params), Err(GenerationError::InvalidDensity(_))));
	}

	#[test]
	fn test_low_density_retries() {
		// a single 1x1 draw at this density is almost always empty
		let rng = &mut StdRng::seed_from_u64(4);
		let params = GeneratorParams { max_attempts: 100_000 };

		let a = random_matrix_of_size(rng, 1, 1, 0.01, params).unwrap();
		assert!(a.compute_nnz() == 1);
	}

	#[test]
	fn test_determinism() {
		let params = GeneratorParams::default();
		let a = random_matrix(&mut StdRng::seed_from_u64(5), 20, 0.2, params).unwrap();
		let b = random_matrix(&mut StdRng::seed_from_u64(5), 20, 0.2, params).unwrap();
		assert!(a.to_dense() == b.to_dense());
	}

	#[test]
	fn test_matrix_pair() {
		let rng = &mut StdRng::seed_from_u64(6);
		for _ in 0..20 {
			let (a, b) = random_matrix_pair(rng, 10, 0.3, GeneratorParams::default()).unwrap();
			assert!(a.ncols() == b.nrows());
		}
	}
}
