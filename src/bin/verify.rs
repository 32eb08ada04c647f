//! runs the differential verification over a stream of random sparse matrices.
//!
//! exits with status 1 on invalid arguments, and aborts with a dump of the failing operands as
//! soon as a check exceeds its threshold.

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sparse_q::verify::{Thresholds, VerifyError, VerifyParams, run};

/// command-line arguments of the verification runner
#[derive(Parser, Debug)]
#[clap(
	name = "verify",
	about = "Checks the implicit Q factor of a sparse QR decomposition against its materialized form and a dense reference."
)]
struct Args {
	/// maximum number of rows and columns of the generated matrices
	dimension: usize,
	/// probability that a given entry is populated
	density: f64,
	/// number of trials
	#[clap(long, default_value_t = 1_000_000)]
	trials: usize,
	/// seed of the random number generator
	#[clap(long, default_value_t = 0)]
	seed: u64,
	/// constant of the reconstruction threshold
	#[clap(long, default_value_t = Thresholds::default().reconstruction_scale)]
	reconstruction_scale: f64,
	/// constant of the solve threshold
	#[clap(long, default_value_t = Thresholds::default().solve_scale)]
	solve_scale: f64,
}

fn main() -> eyre::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(err) if err.use_stderr() => {
			let _ = err.print();
			eprintln!("Usage: verify <Matrix-dimension> <density>");
			std::process::exit(1);
		},
		Err(err) => {
			let _ = err.print();
			return Ok(());
		},
	};

	let mut params = VerifyParams::new(args.dimension, args.density);
	params.trials = args.trials;
	params.thresholds = Thresholds {
		reconstruction_scale: args.reconstruction_scale,
		solve_scale: args.solve_scale,
	};

	let rng = &mut StdRng::seed_from_u64(args.seed);
	match run(rng, &params) {
		Ok(_) => Ok(()),
		Err(VerifyError::Failure(failure)) => {
			log::error!("test {} failed: {}", failure.trial, failure.check);
			eprintln!("{failure}");
			std::process::abort();
		},
		Err(VerifyError::Generation(err)) => {
			log::error!("{err}");
			std::process::exit(1);
		},
		Err(err) => Err(err.into()),
	}
}
