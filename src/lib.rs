//! differential verification and benchmarks for the implicit orthogonal factor of a sparse qr
//! decomposition.
//!
//! the orthogonal factor $Q$ of a householder qr decomposition is stored as a sequence of
//! reflections. it can be applied to an arbitrary dense matrix through the generic path, or
//! materialized directly through a specialized path that only applies the reflections that can
//! touch a given column of the identity. this crate checks the two paths against each other and
//! against a dense reference factorization, over a stream of random sparse matrices.
//!
//! # example
//! ```
//! use rand::prelude::*;
//! use sparse_q::random::{GeneratorParams, random_matrix_of_size};
//! use sparse_q::qr::{SparseQr, SparseQrParams};
//! use faer::Mat;
//!
//! let rng = &mut StdRng::seed_from_u64(0);
//! let a = random_matrix_of_size(rng, 8, 8, 0.4, GeneratorParams::default()).unwrap();
//! let qr = SparseQr::new(&a, SparseQrParams::default()).unwrap();
//!
//! let q = qr.q();
//! let generic = q.apply(Mat::<f64>::identity(8, 8).as_ref()).unwrap();
//! let specialized = q.materialize();
//! assert!((&generic - &specialized).norm_l2() <= 1e-12);
//! ```

#![warn(missing_docs)]

pub mod cache;
pub mod dense;
pub mod factorization;
pub mod fmt;
pub mod householder;
pub mod market;
pub mod q;
pub mod qr;
pub mod random;
pub mod verify;

pub use cache::MatrixCache;
pub use dense::DenseQr;
pub use factorization::QrFactorization;
pub use q::{ApplyError, MatrixQ, MatrixQTranspose};
pub use qr::{ColumnOrdering, SolveError, SparseQr, SparseQrParams};
pub use random::{GenerationError, GeneratorParams};
pub use verify::{Check, TrialOutcome, VerificationFailure, VerifyError, VerifyParams};
