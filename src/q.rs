//! the implicit orthogonal factor of a householder qr decomposition.
//!
//! given reflections $H_0, \dots, H_{r - 1}$ of dimension $m$, the orthogonal factor is
//! $Q = H_0 H_1 \cdots H_{r - 1}$, of size $m \times m$. it is never stored explicitly. it can be
//! applied to a dense right-hand side through the generic path ([`MatrixQ::apply`],
//! [`MatrixQ::apply_transpose`]), or materialized through the specialized path
//! ([`MatrixQ::materialize`], [`MatrixQ::thin`]) that exploits the structure of the identity:
//! since $H_k$ is zero above row $k$, it fixes $e_j$ whenever $j < k$.

use crate::householder::SparseHouseholder;
use equator::assert;
use faer::{Mat, MatRef};

/// errors that can occur when applying the orthogonal factor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyError {
	/// the right-hand side does not have as many rows as the orthogonal factor
	DimensionMismatch {
		/// number of rows of the orthogonal factor
		expected: usize,
		/// number of rows of the right-hand side
		found: usize,
	},
}

impl core::fmt::Display for ApplyError {
	#[inline]
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		core::fmt::Debug::fmt(self, f)
	}
}

impl core::error::Error for ApplyError {}

/// borrowed view of the orthogonal factor $Q$ of a householder qr decomposition
#[derive(Copy, Clone, Debug)]
pub struct MatrixQ<'a> {
	householder: &'a SparseHouseholder,
}

/// borrowed view of $Q^\top$, the transpose of a [`MatrixQ`]
#[derive(Copy, Clone, Debug)]
pub struct MatrixQTranspose<'a> {
	inner: MatrixQ<'a>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Op {
	NoTranspose,
	Transpose,
}

impl<'a> MatrixQ<'a> {
	/// returns a view of the product of the given reflections
	#[inline]
	pub fn new(householder: &'a SparseHouseholder) -> Self {
		Self { householder }
	}

	/// returns the underlying reflections
	#[inline]
	pub fn householder(self) -> &'a SparseHouseholder {
		self.householder
	}

	/// returns the number of rows of $Q$
	#[inline]
	pub fn nrows(&self) -> usize {
		self.householder.nrows()
	}

	/// returns the number of columns of $Q$
	#[inline]
	pub fn ncols(&self) -> usize {
		self.householder.nrows()
	}

	/// returns a view of $Q^\top$
	#[inline]
	pub fn transpose(self) -> MatrixQTranspose<'a> {
		MatrixQTranspose { inner: self }
	}

	/// computes $Q X$, without forming $Q$
	pub fn apply(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, ApplyError> {
		let mut out = rhs.to_owned();
		self.apply_in_place(&mut out)?;
		Ok(out)
	}

	/// computes $Q^\top X$, without forming $Q$
	pub fn apply_transpose(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, ApplyError> {
		let mut out = rhs.to_owned();
		self.apply_transpose_in_place(&mut out)?;
		Ok(out)
	}

	/// overwrites `rhs` with $Q X$
	pub fn apply_in_place(&self, rhs: &mut Mat<f64>) -> Result<(), ApplyError> {
		self.check_rhs(rhs.nrows())?;
		apply_on_the_left(self.householder, Op::NoTranspose, rhs);
		Ok(())
	}

	/// overwrites `rhs` with $Q^\top X$
	pub fn apply_transpose_in_place(&self, rhs: &mut Mat<f64>) -> Result<(), ApplyError> {
		self.check_rhs(rhs.nrows())?;
		apply_on_the_left(self.householder, Op::Transpose, rhs);
		Ok(())
	}

	/// computes $Q$ explicitly.
	///
	/// column $j$ starts as $e_j$, and only the reflections $H_k$ with $k \le j$ are applied to it.
	/// the result is equal to `self.apply(Mat::identity(m, m))` up to rounding
	pub fn materialize(&self) -> Mat<f64> {
		self.thin(self.nrows())
	}

	/// computes the first `k` columns of $Q$ explicitly
	///
	/// # panics
	/// - panics if `k > self.nrows()`
	#[track_caller]
	pub fn thin(&self, k: usize) -> Mat<f64> {
		let m = self.nrows();
		assert!(k <= m);

		let householder = self.householder;
		let r = householder.len();

		let mut out = Mat::zeros(m, k);
		let mut work = vec![0.0; m];
		for j in 0..k {
			work.fill(0.0);
			work[j] = 1.0;

			for idx in (0..Ord::min(j + 1, r)).rev() {
				householder.apply_one(idx, &mut work);
			}

			for (i, &x) in work.iter().enumerate() {
				out[(i, j)] = x;
			}
		}
		out
	}

	/// computes $Q^\top$ explicitly
	pub fn materialize_transpose(&self) -> Mat<f64> {
		self.materialize().transpose().to_owned()
	}

	/// computes the first `k` columns of $Q^\top$ explicitly
	///
	/// # panics
	/// - panics if `k > self.nrows()`
	#[track_caller]
	pub fn thin_transpose(&self, k: usize) -> Mat<f64> {
		assert!(k <= self.nrows());
		left_cols(self.materialize().transpose(), k)
	}

	#[inline]
	fn check_rhs(&self, nrows: usize) -> Result<(), ApplyError> {
		if nrows != self.nrows() {
			return Err(ApplyError::DimensionMismatch {
				expected: self.nrows(),
				found: nrows,
			});
		}
		Ok(())
	}
}

impl<'a> MatrixQTranspose<'a> {
	/// returns the number of rows of $Q^\top$
	#[inline]
	pub fn nrows(&self) -> usize {
		self.inner.ncols()
	}

	/// returns the number of columns of $Q^\top$
	#[inline]
	pub fn ncols(&self) -> usize {
		self.inner.nrows()
	}

	/// returns a view of $Q$
	#[inline]
	pub fn transpose(self) -> MatrixQ<'a> {
		self.inner
	}

	/// computes $Q^\top X$
	#[inline]
	pub fn apply(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, ApplyError> {
		self.inner.apply_transpose(rhs)
	}

	/// computes $Q^\top$ explicitly
	#[inline]
	pub fn materialize(&self) -> Mat<f64> {
		self.inner.materialize_transpose()
	}

	/// computes the first `k` columns of $Q^\top$ explicitly
	#[inline]
	#[track_caller]
	pub fn thin(&self, k: usize) -> Mat<f64> {
		self.inner.thin_transpose(k)
	}
}

fn apply_on_the_left(householder: &SparseHouseholder, op: Op, rhs: &mut Mat<f64>) {
	let m = householder.nrows();
	let r = householder.len();

	let mut work = vec![0.0; m];
	for j in 0..rhs.ncols() {
		for (i, x) in work.iter_mut().enumerate() {
			*x = rhs[(i, j)];
		}

		match op {
			Op::NoTranspose => {
				for idx in (0..r).rev() {
					householder.apply_one(idx, &mut work);
				}
			},
			Op::Transpose => {
				for idx in 0..r {
					householder.apply_one(idx, &mut work);
				}
			},
		}

		for (i, &x) in work.iter().enumerate() {
			rhs[(i, j)] = x;
		}
	}
}

/// copies the first `k` columns of `mat`
#[track_caller]
pub fn left_cols(mat: MatRef<'_, f64>, k: usize) -> Mat<f64> {
	assert!(k <= mat.ncols());
	mat.get(.., ..k).to_owned()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::householder::make_householder_in_place;
	use equator::assert;
	use rand::prelude::*;

	fn random_householder(rng: &mut StdRng, m: usize, r: usize) -> SparseHouseholder {
		let mut householder = SparseHouseholder::new(m);
		let mut row_idx = Vec::new();
		let mut val = Vec::new();
		for k in 0..r {
			row_idx.clear();
			val.clear();
			row_idx.push(k);
			val.push(1.0);
			for i in k + 1..m {
				if rng.gen_bool(0.4) {
					row_idx.push(i);
					val.push(rng.gen_range(-1.0..1.0));
				}
			}
			let head = rng.gen_range(-1.0..1.0);
			let info = make_householder_in_place(head, &mut val[1..]);
			householder.push(&row_idx, &val, info.tau);
		}
		householder
	}

	fn diff(a: &Mat<f64>, b: &Mat<f64>) -> f64 {
		(a - b).norm_l2()
	}

	#[test]
	fn test_materialize_matches_apply() {
		let rng = &mut StdRng::seed_from_u64(0);

		for (m, r) in [(1, 1), (5, 3), (12, 12), (20, 7), (8, 0)] {
			let householder = random_householder(rng, m, r);
			let q = MatrixQ::new(&householder);

			let identity = Mat::<f64>::identity(m, m);
			let generic = q.apply(identity.as_ref()).unwrap();
			let specialized = q.materialize();
			assert!(diff(&generic, &specialized) <= 1e-13);

			let generic_t = q.apply_transpose(identity.as_ref()).unwrap();
			assert!(diff(&generic_t, &specialized.transpose().to_owned()) <= 1e-13);
			assert!(diff(&generic_t, &q.transpose().materialize()) <= 1e-13);

			// orthogonality
			let qtq = specialized.transpose() * specialized.as_ref();
			assert!(diff(&qtq, &identity) <= 1e-12);
		}
	}

	#[test]
	fn test_materialize_is_deterministic() {
		let rng = &mut StdRng::seed_from_u64(1);
		let householder = random_householder(rng, 15, 9);
		let q = MatrixQ::new(&householder);

		assert!(q.materialize() == q.materialize());
	}

	#[test]
	fn test_thin() {
		let rng = &mut StdRng::seed_from_u64(2);
		let m = 11;
		let householder = random_householder(rng, m, 6);
		let q = MatrixQ::new(&householder);
		let full = q.materialize();
		let full_t = q.materialize_transpose();

		for k in [0, 1, 5, m] {
			assert!(diff(&q.thin(k), &left_cols(full.as_ref(), k)) == 0.0);
			assert!(diff(&q.thin_transpose(k), &left_cols(full_t.as_ref(), k)) == 0.0);
			assert!(diff(&q.transpose().thin(k), &left_cols(full_t.as_ref(), k)) == 0.0);

			let identity = Mat::<f64>::identity(m, k);
			assert!(diff(&q.apply(identity.as_ref()).unwrap(), &left_cols(full.as_ref(), k)) <= 1e-13);
		}
	}

	#[test]
	#[should_panic]
	fn test_thin_too_wide() {
		let householder = SparseHouseholder::new(3);
		MatrixQ::new(&householder).thin(4);
	}

	#[test]
	fn test_apply_roundtrip() {
		let rng = &mut StdRng::seed_from_u64(3);
		let householder = random_householder(rng, 9, 5);
		let q = MatrixQ::new(&householder);

		let x = Mat::from_fn(9, 4, |_, _| rng.gen_range(-1.0..1.0));
		let qx = q.apply(x.as_ref()).unwrap();
		assert!((qx.norm_l2() - x.norm_l2()).abs() <= 1e-13);

		let mut back = qx.clone();
		q.apply_transpose_in_place(&mut back).unwrap();
		assert!(diff(&back, &x) <= 1e-13);
	}

	#[test]
	fn test_dimension_mismatch() {
		let householder = SparseHouseholder::new(4);
		let q = MatrixQ::new(&householder);
		let rhs = Mat::<f64>::zeros(3, 2);

		assert!(q.apply(rhs.as_ref()) == Err(ApplyError::DimensionMismatch { expected: 4, found: 3 }));
		assert!(q.transpose().apply(rhs.as_ref()) == Err(ApplyError::DimensionMismatch { expected: 4, found: 3 }));
	}
}
