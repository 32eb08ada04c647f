//! octave-style formatting of dense matrices, so that failing operands can be pasted into an
//! interpreter.

use core::fmt;
use faer::Mat;

/// formats a matrix as `[a, b;\nc, d]`
#[derive(Copy, Clone, Debug)]
pub struct Octave<'a>(pub &'a Mat<f64>);

impl fmt::Display for Octave<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mat = self.0;
		f.write_str("[")?;
		for i in 0..mat.nrows() {
			if i > 0 {
				f.write_str(";\n")?;
			}
			for j in 0..mat.ncols() {
				if j > 0 {
					f.write_str(", ")?;
				}
				write!(f, "{}", mat[(i, j)])?;
			}
		}
		f.write_str("]")
	}
}
