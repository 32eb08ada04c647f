//! left-looking sparse householder qr decomposition with column pivoting by deferral.
//!
//! the factorization is $A P = Q R$, where $P$ is a column permutation, $Q$ is the implicit
//! product of the householder reflections stored in [`SparseHouseholder`], and $R$ is upper
//! trapezoidal. columns whose norm below the current pivot position does not exceed the pivot
//! threshold get no reflection, and are moved to the end of the permutation. the number of
//! reflections is the numerical rank of $A$.

use crate::householder::{SparseHouseholder, make_householder_in_place};
use crate::q::{ApplyError, MatrixQ};
use faer::Mat;
use faer::MatRef;
use faer::sparse::{CreationError, SparseColMat, Triplet};

/// column ordering applied before the factorization
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ColumnOrdering {
	/// columns are processed in their original order
	Natural,
	/// columns are processed by increasing number of stored entries, ties broken by their index
	#[default]
	FewestNonzeros,
}

/// sparse qr tuning parameters
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SparseQrParams {
	/// column ordering
	pub ordering: ColumnOrdering,
	/// columns whose remaining norm is at most this value are considered numerically zero.
	/// defaults to $20 (m + n) \max_j \|A_{:, j}\| \varepsilon$
	pub pivot_threshold: Option<f64>,
}

/// errors that can occur during the factorization
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QrError {
	/// the upper trapezoidal factor could not be created
	Creation(CreationError),
}

impl From<CreationError> for QrError {
	#[inline]
	fn from(value: CreationError) -> Self {
		Self::Creation(value)
	}
}

impl core::fmt::Display for QrError {
	#[inline]
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		core::fmt::Debug::fmt(self, f)
	}
}

impl core::error::Error for QrError {}

/// errors that can occur when solving a linear system
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolveError {
	/// the right-hand side does not have as many rows as the matrix
	DimensionMismatch {
		/// number of rows of the matrix
		expected: usize,
		/// number of rows of the right-hand side
		found: usize,
	},
	/// the factorization does not have full rank
	RankDeficient {
		/// numerical rank
		rank: usize,
		/// required rank
		expected: usize,
	},
	/// the solver only handles square matrices
	NotSquare {
		/// number of rows
		nrows: usize,
		/// number of columns
		ncols: usize,
	},
}

impl From<ApplyError> for SolveError {
	#[inline]
	fn from(value: ApplyError) -> Self {
		match value {
			ApplyError::DimensionMismatch { expected, found } => Self::DimensionMismatch { expected, found },
		}
	}
}

impl core::fmt::Display for SolveError {
	#[inline]
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		core::fmt::Debug::fmt(self, f)
	}
}

impl core::error::Error for SolveError {}

/// sparse householder qr factorization of a matrix $A$
#[derive(Clone, Debug)]
pub struct SparseQr {
	nrows: usize,
	ncols: usize,
	pivot_threshold: f64,
	col_perm: Vec<usize>,
	householder: SparseHouseholder,

	// compressed columns of $R$, in permuted order. the last entry of the first `rank` columns is
	// the diagonal
	r_col_ptr: Vec<usize>,
	r_row_idx: Vec<usize>,
	r_val: Vec<f64>,
	r: SparseColMat<usize, f64>,
}

/// returns the default pivot threshold of the factorization of `a`
pub fn default_pivot_threshold(a: &SparseColMat<usize, f64>) -> f64 {
	let m = a.nrows();
	let n = a.ncols();

	let mut max_norm = 0.0f64;
	for j in 0..n {
		let norm = a.val_of_col(j).iter().fold(0.0f64, |acc, &x| acc.hypot(x));
		max_norm = max_norm.max(norm);
	}
	if max_norm == 0.0 {
		max_norm = 1.0;
	}

	20.0 * (m + n) as f64 * max_norm * f64::EPSILON
}

fn column_order(a: &SparseColMat<usize, f64>, ordering: ColumnOrdering) -> Vec<usize> {
	let mut order: Vec<usize> = (0..a.ncols()).collect();
	match ordering {
		ColumnOrdering::Natural => {},
		ColumnOrdering::FewestNonzeros => order.sort_by_key(|&j| a.row_idx_of_col_raw(j).len()),
	}
	order
}

impl SparseQr {
	/// computes the qr factorization of `a`
	pub fn new(a: &SparseColMat<usize, f64>, params: SparseQrParams) -> Result<Self, QrError> {
		let m = a.nrows();
		let n = a.ncols();

		let order = column_order(a, params.ordering);
		let pivot_threshold = params.pivot_threshold.unwrap_or_else(|| default_pivot_threshold(a));

		let mut householder = SparseHouseholder::new(m);

		// dense accumulator for the current column, and the list of its structurally nonzero rows
		let mut x = vec![0.0f64; m];
		let mut marked = vec![0usize; m];
		let mut pattern = Vec::with_capacity(m);

		let mut reflector_row_idx = Vec::with_capacity(m);
		let mut reflector_val = Vec::with_capacity(m);

		let mut pivots = Vec::with_capacity(n);
		let mut deferred = Vec::new();
		let mut r_cols = Vec::with_capacity(n);

		for (j, &col) in order.iter().enumerate() {
			let stamp = j + 1;
			pattern.clear();

			for (&i, &v) in core::iter::zip(a.row_idx_of_col_raw(col), a.val_of_col(col)) {
				if marked[i] != stamp {
					marked[i] = stamp;
					pattern.push(i);
				}
				x[i] += v;
			}

			// a reflection whose support does not meet the column leaves it untouched
			let rank = householder.len();
			for k in 0..rank {
				let row_idx = householder.row_idx_of(k);
				if !row_idx.iter().any(|&i| marked[i] == stamp) {
					continue;
				}
				for &i in row_idx {
					if marked[i] != stamp {
						marked[i] = stamp;
						pattern.push(i);
					}
				}
				householder.apply_one(k, &mut x);
			}

			pattern.sort_unstable();
			let (above, below) = pattern.split_at(pattern.partition_point(|&i| i < rank));

			let mut r_col: Vec<(usize, f64)> = above.iter().map(|&i| (i, x[i])).collect();
			let below_norm = below.iter().fold(0.0f64, |acc, &i| acc.hypot(x[i]));

			if below_norm > pivot_threshold {
				reflector_row_idx.clear();
				reflector_val.clear();
				reflector_row_idx.push(rank);
				reflector_val.push(1.0);
				for &i in below {
					if i != rank {
						reflector_row_idx.push(i);
						reflector_val.push(x[i]);
					}
				}

				let info = make_householder_in_place(x[rank], &mut reflector_val[1..]);
				householder.push(&reflector_row_idx, &reflector_val, info.tau);

				r_col.push((rank, info.beta));
				pivots.push(j);
			} else {
				deferred.push(j);
			}

			for &i in &pattern {
				x[i] = 0.0;
			}
			r_cols.push(r_col);
		}

		let rank = pivots.len();
		log::trace!("sparse qr: {m}x{n}, rank {rank}, {} reflection entries", householder.compute_nnz());

		let mut col_perm = Vec::with_capacity(n);
		let mut r_col_ptr = Vec::with_capacity(n + 1);
		let mut r_row_idx = Vec::new();
		let mut r_val = Vec::new();
		r_col_ptr.push(0);
		for &j in pivots.iter().chain(&deferred) {
			col_perm.push(order[j]);
			for &(i, v) in &r_cols[j] {
				r_row_idx.push(i);
				r_val.push(v);
			}
			r_col_ptr.push(r_row_idx.len());
		}

		let mut triplets = Vec::with_capacity(r_row_idx.len());
		for k in 0..n {
			for idx in r_col_ptr[k]..r_col_ptr[k + 1] {
				triplets.push(Triplet::new(r_row_idx[idx], k, r_val[idx]));
			}
		}
		let r = SparseColMat::try_new_from_triplets(m, n, &triplets)?;

		Ok(Self {
			nrows: m,
			ncols: n,
			pivot_threshold,
			col_perm,
			householder,
			r_col_ptr,
			r_row_idx,
			r_val,
			r,
		})
	}

	/// returns the number of rows of $A$
	#[inline]
	pub fn nrows(&self) -> usize {
		self.nrows
	}

	/// returns the number of columns of $A$
	#[inline]
	pub fn ncols(&self) -> usize {
		self.ncols
	}

	/// returns the numerical rank of $A$
	#[inline]
	pub fn rank(&self) -> usize {
		self.householder.len()
	}

	/// returns the pivot threshold that was used during the factorization
	#[inline]
	pub fn pivot_threshold(&self) -> f64 {
		self.pivot_threshold
	}

	/// returns the forward column permutation, such that column `k` of $AP$ is column
	/// `col_perm()[k]` of $A$
	#[inline]
	pub fn col_perm(&self) -> &[usize] {
		&self.col_perm
	}

	/// returns the upper trapezoidal factor $R$
	#[inline]
	pub fn r(&self) -> &SparseColMat<usize, f64> {
		&self.r
	}

	/// returns the upper trapezoidal factor $R$ as a dense matrix
	pub fn r_dense(&self) -> Mat<f64> {
		let mut r = Mat::zeros(self.nrows, self.ncols);
		for k in 0..self.ncols {
			for idx in self.r_col_ptr[k]..self.r_col_ptr[k + 1] {
				r[(self.r_row_idx[idx], k)] = self.r_val[idx];
			}
		}
		r
	}

	/// returns the householder reflections
	#[inline]
	pub fn householder(&self) -> &SparseHouseholder {
		&self.householder
	}

	/// returns a view of the orthogonal factor $Q$
	#[inline]
	pub fn q(&self) -> MatrixQ<'_> {
		MatrixQ::new(&self.householder)
	}

	/// solves $A x = b$ in the least squares sense if $A$ is tall, or returns the basic solution if
	/// $A$ is wide.
	///
	/// requires $A$ to have full rank
	pub fn solve(&self, rhs: MatRef<'_, f64>) -> Result<Mat<f64>, SolveError> {
		let m = self.nrows;
		let n = self.ncols;
		let rank = self.rank();

		if rhs.nrows() != m {
			return Err(SolveError::DimensionMismatch {
				expected: m,
				found: rhs.nrows(),
			});
		}
		if rank != Ord::min(m, n) {
			return Err(SolveError::RankDeficient {
				rank,
				expected: Ord::min(m, n),
			});
		}

		let mut y = rhs.to_owned();
		self.q().apply_transpose_in_place(&mut y)?;

		let mut x = Mat::zeros(n, rhs.ncols());
		let mut work = vec![0.0f64; rank];
		for c in 0..rhs.ncols() {
			for (i, w) in work.iter_mut().enumerate() {
				*w = y[(i, c)];
			}

			for k in (0..rank).rev() {
				let start = self.r_col_ptr[k];
				let diag_idx = self.r_col_ptr[k + 1] - 1;
				let diag = self.r_val[diag_idx];
				let row_idx = &self.r_row_idx[start..diag_idx];
				let off_diag = &self.r_val[start..diag_idx];

				work[k] /= diag;
				let xk = work[k];
				for (&i, &v) in core::iter::zip(row_idx, off_diag) {
					work[i] -= v * xk;
				}
			}

			for (k, &w) in work.iter().enumerate() {
				x[(self.col_perm[k], c)] = w;
			}
		}
		Ok(x)
	}
}
