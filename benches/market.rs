use diol::prelude::*;
use faer::Mat;
use faer::sparse::SparseColMat;
use rand::prelude::*;
use sparse_q::market::load_market;
use sparse_q::{SparseQr, SparseQrParams};
use std::hint::black_box;
use std::path::PathBuf;

fn path() -> PathBuf {
	match std::env::var_os("SPARSE_Q_MTX") {
		Some(path) => PathBuf::from(path),
		None => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_data/sparse_q/market.mtx"),
	}
}

fn load() -> SparseColMat<usize, f64> {
	load_market(path()).unwrap()
}

fn random(nrows: usize, ncols: usize) -> Mat<f64> {
	let rng = &mut StdRng::seed_from_u64(0);
	Mat::from_fn(nrows, ncols, |_, _| rng.gen_range(-1.0..1.0))
}

fn qr_facto(bencher: Bencher, (): ()) {
	let a = load();

	bencher.bench(|| {
		black_box(SparseQr::new(&a, SparseQrParams::default()).unwrap());
	});
}

fn qr_solve(bencher: Bencher, (): ()) {
	let a = load();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();
	let b = random(a.nrows(), 1);

	bencher.bench(|| {
		black_box(qr.solve(b.as_ref()).unwrap());
	});
}

fn dense_q(bencher: Bencher, (): ()) {
	let a = load();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();
	let id = Mat::<f64>::identity(a.nrows(), a.nrows());

	bencher.bench(|| {
		black_box(qr.q().apply(id.as_ref()).unwrap());
	});
}

fn dense_q_new(bencher: Bencher, (): ()) {
	let a = load();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();

	bencher.bench(|| {
		black_box(qr.q().materialize());
	});
}

fn q_times_b(bencher: Bencher, (): ()) {
	let a = load();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();
	let b = random(a.nrows(), 1);

	bencher.bench(|| {
		black_box(qr.q().apply(b.as_ref()).unwrap());
	});
}

fn q_times_block(bencher: Bencher, depth: usize) {
	let a = load();
	let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();
	let b = random(a.nrows(), depth);

	bencher.bench(|| {
		black_box(qr.q().apply(b.as_ref()).unwrap());
	});
}

fn main() -> std::io::Result<()> {
	let mut bench = Bench::new(BenchConfig::from_args()?);

	bench.register_many(list![qr_facto, qr_solve, dense_q, dense_q_new, q_times_b], [()]);

	let mut depths = vec![5];
	while *depths.last().unwrap() < 640 {
		depths.push(2 * depths.last().unwrap());
	}
	depths.push(1000);
	bench.register_many(list![q_times_block], depths);

	bench.run()?;

	Ok(())
}
