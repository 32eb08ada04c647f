//! differential verification of the implicit orthogonal factor.
//!
//! each trial draws a random sparse matrix, factors it with [`SparseQr`] and [`DenseQr`], and
//! compares the two, as well as the generic and specialized paths of [`MatrixQ`](crate::q::MatrixQ),
//! against thresholds scaled by the machine epsilon. the first check that exceeds its threshold
//! stops the run with a [`VerificationFailure`] that carries the operands of the comparison.

use crate::dense::{DenseQr, condition_number};
use crate::factorization::QrFactorization;
use crate::fmt::Octave;
use crate::q::{ApplyError, left_cols};
use crate::qr::{QrError, SolveError, SparseQr, SparseQrParams};
use crate::random::{GenerationError, GeneratorParams, has_empty_row, random_matrix};
use faer::linalg::solvers::SvdError;
use faer::sparse::SparseColMat;
use faer::Mat;
use rand::Rng;

/// number of trials between two progress messages
const PROGRESS_INTERVAL: usize = 10_000;

/// scaling constants of the error thresholds
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Thresholds {
	/// constant $c$ of the reconstruction threshold $c \cdot m \cdot n \cdot \rho \cdot \varepsilon$
	pub reconstruction_scale: f64,
	/// constant $c$ of the solve threshold $c \cdot \kappa(A) \cdot \varepsilon$
	pub solve_scale: f64,
}

impl Default for Thresholds {
	#[inline]
	fn default() -> Self {
		Self {
			reconstruction_scale: 20.0,
			solve_scale: 2.0,
		}
	}
}

impl Thresholds {
	/// returns the tolerance of the reconstruction and orthogonal factor checks of an `nrows×ncols`
	/// matrix generated with the given density
	#[inline]
	pub fn reconstruction(&self, nrows: usize, ncols: usize, density: f64) -> f64 {
		self.reconstruction_scale * nrows as f64 * ncols as f64 * density * f64::EPSILON
	}

	/// returns the tolerance of the solve check of a matrix with the given condition number
	#[inline]
	pub fn solve(&self, condition_number: f64) -> f64 {
		self.solve_scale * condition_number * f64::EPSILON
	}
}

/// verification parameters
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VerifyParams {
	/// number of trials
	pub trials: usize,
	/// maximum number of rows and columns of the generated matrices
	pub max_dim: usize,
	/// density of the generated matrices
	pub density: f64,
	/// error thresholds
	pub thresholds: Thresholds,
	/// random generation parameters
	pub generator: GeneratorParams,
	/// sparse factorization parameters
	pub qr: SparseQrParams,
}

impl VerifyParams {
	/// returns the default parameters for matrices of extent up to `max_dim` with the given density
	pub fn new(max_dim: usize, density: f64) -> Self {
		Self {
			trials: 1_000_000,
			max_dim,
			density,
			thresholds: Thresholds::default(),
			generator: GeneratorParams::default(),
			qr: SparseQrParams::default(),
		}
	}
}

/// comparison performed during a trial
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Check {
	/// $Q R P^\top$ against $A$ for the sparse factorization
	SparseReconstruction,
	/// $Q R P^\top$ against $A$ for the dense factorization
	DenseReconstruction,
	/// sparse solution against dense solution of a square full rank system
	Solve,
	/// $Q I$ through the generic path against the specialized materialization of $Q$
	Materialize,
	/// $Q^\top I$ through the generic path against the transpose of the materialized $Q$
	MaterializeTranspose,
	/// $Q I_{m \times k}$ against the first $k$ columns of $Q$
	ThinIdentity,
	/// the first $k$ columns of $Q I$ against the first $k$ columns of $Q$
	ThinTruncated,
	/// the specialized thin extraction against the first $k$ columns of $Q$
	ThinExtract,
	/// $Q^\top I_{m \times k}$ against the first $k$ columns of $Q^\top$
	ThinTransposeIdentity,
	/// the first $k$ columns of $Q^\top I$ against the first $k$ columns of $Q^\top$
	ThinTransposeTruncated,
	/// the specialized thin extraction of $Q^\top$ against the first $k$ columns of $Q^\top$
	ThinTransposeExtract,
}

impl Check {
	/// returns a short description of the check
	pub fn description(self) -> &'static str {
		match self {
			Check::SparseReconstruction => "sparse QR decomposition does not reconstruct the input",
			Check::DenseReconstruction => "dense QR decomposition does not reconstruct the input",
			Check::Solve => "sparse and dense solutions differ",
			Check::Materialize => "Q*I differs from the materialized Q",
			Check::MaterializeTranspose => "Q'*I differs from the transpose of the materialized Q",
			Check::ThinIdentity => "Q*I(m, k) differs from the first k columns of Q",
			Check::ThinTruncated => "(Q*I)(:, 1:k) differs from the first k columns of Q",
			Check::ThinExtract => "thin Q differs from the first k columns of Q",
			Check::ThinTransposeIdentity => "Q'*I(m, k) differs from the first k columns of Q'",
			Check::ThinTransposeTruncated => "(Q'*I)(:, 1:k) differs from the first k columns of Q'",
			Check::ThinTransposeExtract => "thin Q' differs from the first k columns of Q'",
		}
	}
}

impl core::fmt::Display for Check {
	#[inline]
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.write_str(self.description())
	}
}

/// error and tolerance of a check that passed
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CheckRecord {
	/// the check
	pub check: Check,
	/// measured error
	pub error: f64,
	/// tolerance
	pub threshold: f64,
}

/// summary of a trial whose checks all passed
#[derive(Clone, Debug, PartialEq)]
pub struct TrialReport {
	/// number of rows of the matrix
	pub nrows: usize,
	/// number of columns of the matrix
	pub ncols: usize,
	/// numerical rank of the matrix
	pub rank: usize,
	/// the checks that were performed, in order
	pub checks: Vec<CheckRecord>,
}

/// reason a trial was rejected before validation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
	/// the matrix has a row without entries
	EmptyRow,
	/// the numerical rank of the matrix is zero
	ZeroRank,
}

/// result of a trial
#[derive(Clone, Debug, PartialEq)]
pub enum TrialOutcome {
	/// every check passed
	Passed(TrialReport),
	/// the matrix was rejected
	Skipped(SkipReason),
}

/// counts of the trials of a run
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
	/// trials whose checks all passed
	pub passed: usize,
	/// trials rejected because of an empty row
	pub skipped_empty_row: usize,
	/// trials rejected because of a zero rank
	pub skipped_zero_rank: usize,
}

impl Summary {
	/// returns the total number of trials
	#[inline]
	pub fn trials(&self) -> usize {
		self.passed + self.skipped_empty_row + self.skipped_zero_rank
	}

	fn record(&mut self, outcome: &TrialOutcome) {
		match outcome {
			TrialOutcome::Passed(_) => self.passed += 1,
			TrialOutcome::Skipped(SkipReason::EmptyRow) => self.skipped_empty_row += 1,
			TrialOutcome::Skipped(SkipReason::ZeroRank) => self.skipped_zero_rank += 1,
		}
	}
}

/// a check whose error exceeded its threshold
#[derive(Clone, Debug)]
pub struct VerificationFailure {
	/// index of the failing trial
	pub trial: usize,
	/// the failing check
	pub check: Check,
	/// measured error
	pub error: f64,
	/// tolerance
	pub threshold: f64,
	/// named operands of the comparison
	pub operands: Vec<(&'static str, Mat<f64>)>,
}

impl core::fmt::Display for VerificationFailure {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		writeln!(
			f,
			"test {}: {} (error {:e}, threshold {:e})",
			self.trial, self.check, self.error, self.threshold,
		)?;
		for (name, mat) in &self.operands {
			writeln!(f, "{name} =\n{}", Octave(mat))?;
		}
		Ok(())
	}
}

/// errors that can occur during verification
#[derive(Clone, Debug)]
pub enum VerifyError {
	/// a check exceeded its threshold
	Failure(Box<VerificationFailure>),
	/// an operand had an unexpected shape
	Apply(ApplyError),
	/// the random matrix could not be generated
	Generation(GenerationError),
	/// a linear system could not be solved
	Solve(SolveError),
	/// the sparse factorization failed
	Qr(QrError),
	/// the singular values did not converge
	Svd(SvdError),
}

impl From<ApplyError> for VerifyError {
	#[inline]
	fn from(value: ApplyError) -> Self {
		Self::Apply(value)
	}
}
impl From<GenerationError> for VerifyError {
	#[inline]
	fn from(value: GenerationError) -> Self {
		Self::Generation(value)
	}
}
impl From<SolveError> for VerifyError {
	#[inline]
	fn from(value: SolveError) -> Self {
		Self::Solve(value)
	}
}
impl From<QrError> for VerifyError {
	#[inline]
	fn from(value: QrError) -> Self {
		Self::Qr(value)
	}
}
impl From<SvdError> for VerifyError {
	#[inline]
	fn from(value: SvdError) -> Self {
		Self::Svd(value)
	}
}

impl core::fmt::Display for VerifyError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		match self {
			Self::Failure(failure) => core::fmt::Display::fmt(failure, f),
			Self::Generation(err) => core::fmt::Display::fmt(err, f),
			Self::Apply(err) => core::fmt::Debug::fmt(err, f),
			Self::Solve(err) => core::fmt::Debug::fmt(err, f),
			Self::Qr(err) => core::fmt::Debug::fmt(err, f),
			Self::Svd(err) => core::fmt::Debug::fmt(err, f),
		}
	}
}

impl core::error::Error for VerifyError {}

/// accumulates the passed checks of a trial
struct Checker {
	trial: usize,
	records: Vec<CheckRecord>,
}

impl Checker {
	fn new(trial: usize) -> Self {
		Self { trial, records: Vec::new() }
	}

	// `operands` is only evaluated on failure
	fn check(
		&mut self,
		check: Check,
		error: f64,
		threshold: f64,
		operands: impl FnOnce() -> Vec<(&'static str, Mat<f64>)>,
	) -> Result<(), VerifyError> {
		log::trace!("test {}: {check:?}: error {error:e}, threshold {threshold:e}", self.trial);

		// nan errors fail
		if !(error <= threshold) {
			return Err(VerifyError::Failure(Box::new(VerificationFailure {
				trial: self.trial,
				check,
				error,
				threshold,
				operands: operands(),
			})));
		}
		self.records.push(CheckRecord { check, error, threshold });
		Ok(())
	}
}

/// returns $\|a - b\|_F$
#[inline]
fn distance(a: &Mat<f64>, b: &Mat<f64>) -> f64 {
	(a - b).norm_l2()
}

/// returns $\|computed - expected\|_F / \|computed\|_F$
#[inline]
fn relative_distance(computed: &Mat<f64>, expected: &Mat<f64>) -> f64 {
	distance(computed, expected) / computed.norm_l2()
}

fn random_rhs(rng: &mut impl Rng, nrows: usize, ncols: usize) -> Mat<f64> {
	Mat::from_fn(nrows, ncols, |_, _| rng.gen_range(-1.0..=1.0))
}

fn identity(nrows: usize, ncols: usize) -> Mat<f64> {
	Mat::identity(nrows, ncols)
}

/// factors `a` and runs every check on it.
///
/// `density` is the density `a` was generated with, and scales the reconstruction threshold. `rng`
/// is used to draw the right-hand side of the solve check
pub fn verify_matrix(
	rng: &mut impl Rng,
	a: &SparseColMat<usize, f64>,
	density: f64,
	params: &VerifyParams,
	trial: usize,
) -> Result<TrialOutcome, VerifyError> {
	let (m, n) = (a.nrows(), a.ncols());

	if has_empty_row(a) {
		log::debug!("test {trial}: skipping {m}x{n} matrix with an empty row");
		return Ok(TrialOutcome::Skipped(SkipReason::EmptyRow));
	}

	let sparse = SparseQr::new(a, params.qr)?;
	let rank = sparse.rank();
	if rank == 0 {
		log::debug!("test {trial}: skipping {m}x{n} matrix of rank zero");
		return Ok(TrialOutcome::Skipped(SkipReason::ZeroRank));
	}

	let a_dense = a.to_dense();
	let dense = DenseQr::new(a_dense.as_ref());

	let threshold = params.thresholds.reconstruction(m, n, density);
	let mut checker = Checker::new(trial);

	// decompositions
	let sparse_recovered = sparse.reconstruct()?;
	checker.check(
		Check::SparseReconstruction,
		relative_distance(&sparse_recovered, &a_dense),
		threshold,
		|| {
			vec![
				("A", a_dense.clone()),
				("Q", sparse.q().materialize()),
				("R", sparse.r_dense()),
				("QRP'", sparse_recovered.clone()),
			]
		},
	)?;

	let dense_recovered = dense.reconstruct()?;
	checker.check(
		Check::DenseReconstruction,
		relative_distance(&dense_recovered, &a_dense),
		threshold,
		|| {
			vec![
				("A", a_dense.clone()),
				("Q", dense.q_dense()),
				("R", dense.r_dense()),
				("QRP'", dense_recovered.clone()),
			]
		},
	)?;

	// solve
	if m == n && rank == n {
		let rhs = random_rhs(rng, m, n);
		let x_sparse = QrFactorization::solve(&sparse, rhs.as_ref())?;
		let x_dense = QrFactorization::solve(&dense, rhs.as_ref())?;

		let solve_threshold = params.thresholds.solve(condition_number(a_dense.as_ref())?);
		checker.check(Check::Solve, relative_distance(&x_sparse, &x_dense), solve_threshold, || {
			vec![
				("A", a_dense.clone()),
				("B", rhs.clone()),
				("sparse X", x_sparse.clone()),
				("dense X", x_dense.clone()),
			]
		})?;
	}

	// orthogonal factor
	let q = sparse.q();
	let q_full = q.materialize();
	let qt_full = q_full.transpose().to_owned();
	let id = identity(m, m);

	let q_times_id = q.apply(id.as_ref())?;
	checker.check(Check::Materialize, distance(&q_times_id, &q_full), threshold, || {
		vec![("A", a_dense.clone()), ("Q*I", q_times_id.clone()), ("Q", q_full.clone())]
	})?;

	let qt_times_id = q.apply_transpose(id.as_ref())?;
	checker.check(Check::MaterializeTranspose, distance(&qt_times_id, &qt_full), threshold, || {
		vec![("A", a_dense.clone()), ("Q'*I", qt_times_id.clone()), ("Q'", qt_full.clone())]
	})?;

	// thin orthogonal factor
	if n >= 2 {
		let k = q_full.ncols() / 2;
		let q_left = left_cols(q_full.as_ref(), k);
		let qt_left = left_cols(qt_full.as_ref(), k);
		let id_k = identity(m, k);

		let mut thin_check = |check: Check, computed: Mat<f64>, expected: &Mat<f64>| {
			checker.check(check, distance(&computed, expected), threshold, || {
				vec![("A", a_dense.clone()), ("computed", computed.clone()), ("expected", expected.clone())]
			})
		};

		thin_check(Check::ThinIdentity, q.apply(id_k.as_ref())?, &q_left)?;
		thin_check(Check::ThinTruncated, left_cols(q.apply(id.as_ref())?.as_ref(), k), &q_left)?;
		thin_check(Check::ThinExtract, q.thin(k), &q_left)?;

		let qt = q.transpose();
		thin_check(Check::ThinTransposeIdentity, qt.apply(id_k.as_ref())?, &qt_left)?;
		thin_check(Check::ThinTransposeTruncated, left_cols(qt.apply(id.as_ref())?.as_ref(), k), &qt_left)?;
		thin_check(Check::ThinTransposeExtract, qt.thin(k), &qt_left)?;
	}

	Ok(TrialOutcome::Passed(TrialReport {
		nrows: m,
		ncols: n,
		rank,
		checks: checker.records,
	}))
}

/// draws a random matrix and verifies it
pub fn run_trial(rng: &mut impl Rng, params: &VerifyParams, trial: usize) -> Result<TrialOutcome, VerifyError> {
	let a = random_matrix(rng, params.max_dim, params.density, params.generator)?;
	verify_matrix(rng, &a, params.density, params, trial)
}

/// runs `params.trials` trials, stopping at the first failure
pub fn run(rng: &mut impl Rng, params: &VerifyParams) -> Result<Summary, VerifyError> {
	log::info!(
		"running {} trials, max dimension {}, density {}",
		params.trials,
		params.max_dim,
		params.density,
	);

	let mut summary = Summary::default();
	for trial in 0..params.trials {
		let outcome = run_trial(rng, params, trial)?;
		summary.record(&outcome);

		if (trial + 1) % PROGRESS_INTERVAL == 0 {
			log::info!("{} trials done, {} skipped", trial + 1, summary.skipped_empty_row + summary.skipped_zero_rank);
		}
	}

	log::info!(
		"{} trials passed, {} skipped (empty row), {} skipped (zero rank)",
		summary.passed,
		summary.skipped_empty_row,
		summary.skipped_zero_rank,
	);
	Ok(summary)
}
