//! dense reference factorization, used as the oracle of the differential checks.

use crate::q::ApplyError;
use crate::qr::SolveError;
use faer::linalg::solvers::{ColPivQr, Solve, SvdError};
use faer::{Mat, MatRef};

/// column pivoted householder qr factorization of a dense matrix
pub struct DenseQr {
	qr: ColPivQr<f64>,
	q: Mat<f64>,
	r: Mat<f64>,
	col_perm: Vec<usize>,
	rank: usize,
}

impl DenseQr {
	/// computes the column pivoted qr factorization of `a`
	#[track_caller]
	pub fn new(a: MatRef<'_, f64>) -> Self {
		let (m, n) = (a.nrows(), a.ncols());
		let qr = a.col_piv_qr();

		let q = qr.compute_Q();
		let thin_r = qr.thin_R().to_owned();
		let col_perm = qr.P().arrays().0.to_vec();

		// pad with zero rows, so that $R$ has the shape of $A$
		let mut r = Mat::zeros(m, n);
		for j in 0..n {
			for i in 0..thin_r.nrows() {
				r[(i, j)] = thin_r[(i, j)];
			}
		}

		let size = Ord::min(m, n);
		let rank = if size == 0 {
			0
		} else {
			let threshold = r[(0, 0)].abs() * f64::EPSILON * size as f64;
			(0..size).filter(|&i| r[(i, i)].abs() > threshold).count()
		};

		Self { qr, q, r, col_perm, rank }
	}

	/// returns the number of rows of $A$
	#[inline]
	pub fn nrows(&self) -> usize {
		self.r.nrows()
	}

	/// returns the number of columns of $A$
	#[inline]
	pub fn ncols(&self) -> usize {
		self.r.ncols()
	}

	/// returns the numerical rank of $A$, the number of diagonal entries of $R$ whose magnitude
	/// exceeds $|R_{00}| \varepsilon \min(m, n)$
	#[inline]
	pub fn rank(&self) -> usize {
		self.rank
	}

	/// returns the forward column permutation
	#[inline]
	pub fn col_perm(&self) -> &[usize] {
		&self.col_perm
	}

	/// returns the orthogonal factor $Q$
	#[inline]
	pub fn q(&self) -> MatRef<'_, f64> {
		self.q.as_ref()
	}

	/// returns the upper trapezoidal factor $R$, with the shape of $A$
	#[inline]
	pub fn r(&self) -> MatRef<'_, f64> {
		self.r.as_ref()
	}

	/// computes $Q X$
	pub fn apply_q(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, ApplyError> {
		if rhs.nrows() != self.nrows() {
			return Err(ApplyError::DimensionMismatch {
				expected: self.nrows(),
				found: rhs.nrows(),
			});
		}
		Ok(self.q.as_ref() * rhs)
	}

	/// solves $A x = b$. requires $A$ to be square
	pub fn solve(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, SolveError> {
		let (m, n) = (self.nrows(), self.ncols());
		if m != n {
			return Err(SolveError::NotSquare { nrows: m, ncols: n });
		}
		if rhs.nrows() != m {
			return Err(SolveError::DimensionMismatch {
				expected: m,
				found: rhs.nrows(),
			});
		}
		Ok(self.qr.solve(rhs))
	}
}

/// computes the 2-norm condition number $\sigma_{\max} / \sigma_{\min}$ of `a`.
///
/// returns infinity if `a` is singular
pub fn condition_number(a: MatRef<'_, f64>) -> Result<f64, SvdError> {
	let s = a.singular_values()?;
	if s.is_empty() {
		return Ok(1.0);
	}

	let max = s.iter().copied().fold(0.0f64, f64::max);
	let min = s.iter().copied().fold(f64::INFINITY, f64::min);
	if min == 0.0 {
		return Ok(f64::INFINITY);
	}
	Ok(max / min)
}
