//! loading of sparse matrices stored in the matrix market exchange format.

use faer::sparse::{CreationError, SparseColMat, Triplet};
use matrix_market_rs::MtxData;
use std::path::Path;

/// errors that can occur when loading a matrix market file
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarketError {
	/// the file could not be read or parsed
	Parse(String),
	/// the file stores a dense array instead of coordinates
	NotSparse,
	/// the sparse matrix could not be created
	Creation(CreationError),
}

impl From<CreationError> for MarketError {
	#[inline]
	fn from(value: CreationError) -> Self {
		Self::Creation(value)
	}
}

impl core::fmt::Display for MarketError {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		match self {
			Self::Parse(msg) => f.write_str(msg),
			Self::NotSparse => f.write_str("matrix market file is not in coordinate format"),
			Self::Creation(err) => core::fmt::Debug::fmt(err, f),
		}
	}
}

impl core::error::Error for MarketError {}

/// reads the coordinate matrix market file at `path`.
///
/// entries are stored as they appear in the file, duplicates are summed
pub fn load_market(path: impl AsRef<Path>) -> Result<SparseColMat<usize, f64>, MarketError> {
	let path = path.as_ref();
	let data = MtxData::<f64>::from_file(path).map_err(|err| MarketError::Parse(format!("{}: {err:?}", path.display())))?;

	let MtxData::Sparse([nrows, ncols], indices, values, _) = data else {
		return Err(MarketError::NotSparse);
	};

	let triplets: Vec<_> = core::iter::zip(&indices, &values)
		.map(|(&[row, col], &val)| Triplet::new(row, col, val))
		.collect();
	log::debug!("loaded {nrows}x{ncols} matrix with {} entries from {}", triplets.len(), path.display());

	Ok(SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)?)
}
