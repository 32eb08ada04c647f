//! common interface of the sparse factorization under test and of the dense reference.

use crate::dense::DenseQr;
use crate::q::ApplyError;
use crate::qr::{SolveError, SparseQr};
use faer::{Mat, MatRef};

/// column pivoted qr factorization $A P = Q R$
pub trait QrFactorization {
	/// returns the number of rows of $A$
	fn nrows(&self) -> usize;
	/// returns the number of columns of $A$
	fn ncols(&self) -> usize;
	/// returns the numerical rank of $A$
	fn rank(&self) -> usize;
	/// returns the forward column permutation: column `k` of $AP$ is column `col_perm()[k]` of $A$
	fn col_perm(&self) -> &[usize];
	/// returns $R$ as a dense matrix with the shape of $A$
	fn r_dense(&self) -> Mat<f64>;
	/// returns $Q$ as a dense matrix
	fn q_dense(&self) -> Mat<f64>;
	/// computes $Q X$
	fn apply_q(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, ApplyError>;
	/// solves $A x = b$
	fn solve(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, SolveError>;

	/// computes $R P^\top$
	fn r_times_perm_transpose(&self) -> Mat<f64> {
		unpermute_cols(self.r_dense().as_ref(), self.col_perm())
	}

	/// computes $Q R P^\top$, which should be equal to $A$
	fn reconstruct(&self) -> Result<Mat<f64>, ApplyError> {
		self.apply_q(self.r_times_perm_transpose().as_ref())
	}
}

/// computes $M P^\top$, where `perm` is the forward array of $P$.
///
/// column `k` of `mat` is moved to column `perm[k]`
pub fn unpermute_cols(mat: MatRef<'_, f64>, perm: &[usize]) -> Mat<f64> {
	let mut perm_inv = vec![0usize; perm.len()];
	for (k, &j) in perm.iter().enumerate() {
		perm_inv[j] = k;
	}

	let mat = mat.to_owned();
	Mat::from_fn(mat.nrows(), mat.ncols(), |i, j| mat[(i, perm_inv[j])])
}

impl QrFactorization for SparseQr {
	#[inline]
	fn nrows(&self) -> usize {
		SparseQr::nrows(self)
	}

	#[inline]
	fn ncols(&self) -> usize {
		SparseQr::ncols(self)
	}

	#[inline]
	fn rank(&self) -> usize {
		SparseQr::rank(self)
	}

	#[inline]
	fn col_perm(&self) -> &[usize] {
		SparseQr::col_perm(self)
	}

	#[inline]
	fn r_dense(&self) -> Mat<f64> {
		SparseQr::r_dense(self)
	}

	#[inline]
	fn q_dense(&self) -> Mat<f64> {
		self.q().materialize()
	}

	#[inline]
	fn apply_q(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, ApplyError> {
		self.q().apply(rhs)
	}

	#[inline]
	fn solve(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, SolveError> {
		SparseQr::solve(self, rhs)
	}
}

impl QrFactorization for DenseQr {
	#[inline]
	fn nrows(&self) -> usize {
		DenseQr::nrows(self)
	}

	#[inline]
	fn ncols(&self) -> usize {
		DenseQr::ncols(self)
	}

	#[inline]
	fn rank(&self) -> usize {
		DenseQr::rank(self)
	}

	#[inline]
	fn col_perm(&self) -> &[usize] {
		DenseQr::col_perm(self)
	}

	#[inline]
	fn r_dense(&self) -> Mat<f64> {
		self.r().to_owned()
	}

	#[inline]
	fn q_dense(&self) -> Mat<f64> {
		self.q().to_owned()
	}

	#[inline]
	fn apply_q(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, ApplyError> {
		DenseQr::apply_q(self, rhs)
	}

	#[inline]
	fn solve(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, SolveError> {
		DenseQr::solve(self, rhs)
	}
}
