use equator::assert;
use faer::Mat;
use faer::sparse::{SparseColMat, Triplet};
use rand::prelude::*;
use sparse_q::market::load_market;
use sparse_q::q::left_cols;
use sparse_q::random::{has_empty_row, random_matrix_of_size};
use sparse_q::verify::{Thresholds, verify_matrix};
use sparse_q::*;

fn sparse(nrows: usize, ncols: usize, entries: &[(usize, usize, f64)]) -> SparseColMat<usize, f64> {
	let triplets: Vec<_> = entries.iter().map(|&(i, j, v)| Triplet::new(i, j, v)).collect();
	SparseColMat::try_new_from_triplets(nrows, ncols, &triplets).unwrap()
}

#[test]
fn test_random_matrix_reconstruction() {
	let rng = &mut StdRng::seed_from_u64(0);
	let a = random_matrix_of_size(rng, 10, 10, 0.3, GeneratorParams::default()).unwrap();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();
	assert!(qr.rank() >= 1);

	let a_dense = a.to_dense();
	let recovered = qr.reconstruct().unwrap();
	let error = (&recovered - &a_dense).norm_l2() / a_dense.norm_l2();
	assert!(error <= Thresholds::default().reconstruction(10, 10, 0.3));
}

#[test]
fn test_zero_density() {
	let rng = &mut StdRng::seed_from_u64(0);
	let err = random_matrix_of_size(rng, 4, 4, 0.0, GeneratorParams::default()).err();
	assert!(err == Some(GenerationError::Exhausted { attempts: 1000 }));
}

#[test]
fn test_low_density_retries() {
	let rng = &mut StdRng::seed_from_u64(0);
	for _ in 0..20 {
		let a = random_matrix_of_size(rng, 1, 1, 0.05, GeneratorParams::default()).unwrap();
		assert!(a.compute_nnz() == 1);
	}
}

#[test]
fn test_solve_agreement() {
	let params = VerifyParams::new(50, 0.1);

	let mut found = false;
	for seed in 0..100 {
		let rng = &mut StdRng::seed_from_u64(seed);
		let a = random_matrix_of_size(rng, 50, 50, 0.1, params.generator).unwrap();
		if has_empty_row(&a) || SparseQr::new(&a, params.qr).unwrap().rank() < 50 {
			continue;
		}

		let outcome = verify_matrix(rng, &a, 0.1, &params, seed as usize).unwrap();
		let TrialOutcome::Passed(report) = outcome else {
			panic!("full rank matrix was skipped");
		};
		assert!(report.checks.iter().any(|record| record.check == Check::Solve));
		found = true;
		break;
	}
	assert!(found);
}

#[test]
fn test_ill_conditioned_solve() {
	let near_duplicate_rows = sparse(
		4,
		4,
		&[
			(0, 0, 1.0),
			(0, 1, 2.0),
			(1, 0, 1.0),
			(1, 1, 2.0 + 1e-6),
			(2, 2, 3.0),
			(2, 3, 1.0),
			(3, 0, 0.5),
			(3, 3, 4.0),
		],
	);
	let badly_scaled = sparse(4, 4, &[(0, 0, 1.0), (1, 1, 1e-8), (2, 2, 2.0), (3, 3, 0.5)]);

	let thresholds = Thresholds::default();
	for (seed, a) in [near_duplicate_rows, badly_scaled].iter().enumerate() {
		let cond = sparse_q::dense::condition_number(a.to_dense().as_ref()).unwrap();
		assert!(all(cond > 1e6, thresholds.solve(cond) > 1e6 * thresholds.solve(1.0)));

		let rng = &mut StdRng::seed_from_u64(seed as u64);
		let params = VerifyParams::new(4, 0.5);
		let outcome = verify_matrix(rng, a, 0.5, &params, seed).unwrap();
		let TrialOutcome::Passed(report) = outcome else {
			panic!("full rank matrix was skipped");
		};
		let solve = report.checks.iter().find(|record| record.check == Check::Solve).unwrap();
		assert!(solve.error <= solve.threshold);
	}
}

#[test]
fn test_cache() {
	let rng = &mut StdRng::seed_from_u64(0);
	let mut cache = MatrixCache::new();

	let first = cache.get_random_matrix(rng, 12, 7, 0.2).unwrap().to_dense();
	let second = cache.get_random_matrix(rng, 12, 7, 0.2).unwrap().to_dense();
	assert!(all(first == second, cache.len() == 1));

	cache.get_random_matrix(rng, 7, 12, 0.2).unwrap();
	assert!(cache.len() == 2);
}

#[test]
fn test_materialize_idempotent() {
	let rng = &mut StdRng::seed_from_u64(1);
	let a = random_matrix_of_size(rng, 9, 6, 0.4, GeneratorParams::default()).unwrap();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();

	let q = qr.q();
	assert!(q.materialize() == q.materialize());
	assert!(q.materialize_transpose() == q.materialize_transpose());
}

#[test]
fn test_thin_identities() {
	let rng = &mut StdRng::seed_from_u64(2);
	let a = random_matrix_of_size(rng, 10, 8, 0.3, GeneratorParams::default()).unwrap();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();
	let q = qr.q();

	let q_full = q.materialize();
	let qt_full = q_full.transpose().to_owned();
	for k in [0, 1, 5, 10] {
		let id_k = Mat::<f64>::identity(10, k);

		let q_left = left_cols(q_full.as_ref(), k);
		assert!((&q.thin(k) - &q_left).norm_l2() <= 1e-12);
		assert!((&q.apply(id_k.as_ref()).unwrap() - &q_left).norm_l2() <= 1e-12);

		let qt_left = left_cols(qt_full.as_ref(), k);
		assert!((&q.thin_transpose(k) - &qt_left).norm_l2() <= 1e-12);
		assert!((&q.transpose().apply(id_k.as_ref()).unwrap() - &qt_left).norm_l2() <= 1e-12);
	}
}

#[test]
fn test_dimension_mismatch() {
	let a = sparse(3, 2, &[(0, 0, 1.0), (1, 1, 2.0), (2, 0, 3.0)]);
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();

	let rhs = Mat::<f64>::zeros(4, 2);
	let expected = ApplyError::DimensionMismatch { expected: 3, found: 4 };
	assert!(qr.q().apply(rhs.as_ref()).err() == Some(expected));
	assert!(qr.q().apply_transpose(rhs.as_ref()).err() == Some(expected));
}

#[test]
fn test_market_fixture() {
	let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_data/sparse_q/market.mtx");
	let a = load_market(path).unwrap();

	let rng = &mut StdRng::seed_from_u64(0);
	let params = VerifyParams::new(6, 14.0 / 36.0);
	let outcome = verify_matrix(rng, &a, params.density, &params, 0).unwrap();
	let TrialOutcome::Passed(report) = outcome else {
		panic!("fixture was skipped");
	};
	assert!(all(report.rank == 6, report.checks.len() == 11));
}
