//! householder reflections with sparse essential parts.
//!
//! a householder reflection is stored as $H = I - \frac{v v^\top}{\tau}$, where the first nonzero of
//! $v$ is an implicit one. the reflection with index $k$ of a [`SparseHouseholder`] sequence has its
//! head at row $k$, and is zero above it, so that applying it only touches rows $k..m$.

use equator::assert;

/// the result of [`make_householder_in_place`]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HouseholderInfo {
	/// the householder factor $\tau$. infinite when the reflection is the identity
	pub tau: f64,
	/// the new head of the reflected vector
	pub beta: f64,
}

/// computes the householder reflection $I - \frac{v v^\top}{\tau}$ such that when multiplied by $x$
/// from the left, the result is $\beta e_0$.
///
/// `head` is $x_0$, and `tail` holds $x_{1..}$. on exit, `tail` holds the essential part of $v$
pub fn make_householder_in_place(head: f64, tail: &mut [f64]) -> HouseholderInfo {
	let tail_norm = tail.iter().fold(0.0f64, |acc, &x| acc.hypot(x));

	if tail_norm == 0.0 {
		return HouseholderInfo { tau: f64::INFINITY, beta: head };
	}

	let norm = head.abs().hypot(tail_norm);
	let sign = if head != 0.0 { head.signum() } else { 1.0 };

	let signed_norm = sign * norm;
	let head_with_beta = head + signed_norm;
	let head_with_beta_inv = head_with_beta.recip();

	for x in tail.iter_mut() {
		*x *= head_with_beta_inv;
	}

	let tail_norm = tail_norm * head_with_beta_inv.abs();
	HouseholderInfo {
		tau: 0.5 * (1.0 + tail_norm * tail_norm),
		beta: -signed_norm,
	}
}

/// sequence of householder reflections $H_0, H_1, \dots, H_{r - 1}$ of dimension $m$, stored in
/// compressed column format
#[derive(Clone, Debug)]
pub struct SparseHouseholder {
	nrows: usize,
	col_ptr: Vec<usize>,
	row_idx: Vec<usize>,
	val: Vec<f64>,
	tau_inv: Vec<f64>,
}

impl SparseHouseholder {
	/// returns an empty sequence of reflections of dimension `nrows`
	pub fn new(nrows: usize) -> Self {
		Self {
			nrows,
			col_ptr: vec![0],
			row_idx: Vec::new(),
			val: Vec::new(),
			tau_inv: Vec::new(),
		}
	}

	/// appends a reflection to the end of the sequence.
	///
	/// `row_idx` must be sorted, start at the index of the new reflection, and `val` must start with
	/// the implicit unit head
	#[track_caller]
	pub fn push(&mut self, row_idx: &[usize], val: &[f64], tau: f64) {
		let k = self.len();
		assert!(all(
			row_idx.len() == val.len(),
			row_idx.first() == Some(&k),
			val.first() == Some(&1.0),
			row_idx.windows(2).all(|w| w[0] < w[1]),
			row_idx.last().is_some_and(|&i| i < self.nrows)
		));

		self.row_idx.extend_from_slice(row_idx);
		self.val.extend_from_slice(val);
		self.col_ptr.push(self.row_idx.len());
		self.tau_inv.push(tau.recip());
	}

	/// returns the dimension of the reflections
	#[inline]
	pub fn nrows(&self) -> usize {
		self.nrows
	}

	/// returns the number of reflections
	#[inline]
	pub fn len(&self) -> usize {
		self.tau_inv.len()
	}

	/// returns `true` if the sequence holds no reflection
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.tau_inv.is_empty()
	}

	/// returns the number of stored entries of all the reflections
	#[inline]
	pub fn compute_nnz(&self) -> usize {
		self.row_idx.len()
	}

	/// returns the row indices of the reflection with index `k`
	#[inline]
	#[track_caller]
	pub fn row_idx_of(&self, k: usize) -> &[usize] {
		&self.row_idx[self.col_ptr[k]..self.col_ptr[k + 1]]
	}

	/// returns the values of the reflection with index `k`, head included
	#[inline]
	#[track_caller]
	pub fn val_of(&self, k: usize) -> &[f64] {
		&self.val[self.col_ptr[k]..self.col_ptr[k + 1]]
	}

	/// returns $\tau^{-1}$ for the reflection with index `k`
	#[inline]
	#[track_caller]
	pub fn tau_inv(&self, k: usize) -> f64 {
		self.tau_inv[k]
	}

	/// overwrites `x` with $H_k x$.
	///
	/// does nothing if $v_k^\top x$ is exactly zero, which is the case whenever the supports of $v_k$
	/// and $x$ are disjoint
	#[inline]
	pub(crate) fn apply_one(&self, k: usize, x: &mut [f64]) {
		let row_idx = self.row_idx_of(k);
		let val = self.val_of(k);

		let mut dot = 0.0;
		for (&i, &v) in core::iter::zip(row_idx, val) {
			dot += v * x[i];
		}
		if dot == 0.0 {
			return;
		}

		let dot = dot * self.tau_inv[k];
		for (&i, &v) in core::iter::zip(row_idx, val) {
			x[i] -= dot * v;
		}
	}
}
