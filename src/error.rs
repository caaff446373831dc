use std::{error::Error, fmt};

use crate::tensor::ElementType;

/// The crate's result type.
pub type Result<T> = std::result::Result<T, SgdErr>;

/// Failures of a momentum SGD update call or of an operator's construction.
///
/// Every variant returned by an update call is detected before any buffer is written.
#[derive(Debug)]
pub enum SgdErr {
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    UnsupportedIndexWidth(ElementType),
    MalformedIndices {
        dtype: ElementType,
        bytes: usize,
    },
    IndexOutOfRange {
        row: usize,
        index: i64,
        rows: usize,
    },
    InvalidMomentum(f32),
    Config(serde_json::Error),
}

impl fmt::Display for SgdErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SgdErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(f, "shape mismatch in {what}: got {got}, expected {expected}"),
            SgdErr::UnsupportedIndexWidth(dtype) => {
                write!(f, "unsupported index element type {dtype}, expected i32 or i64")
            }
            SgdErr::MalformedIndices { dtype, bytes } => {
                write!(f, "{bytes} bytes can't be viewed as a slice of {dtype}")
            }
            SgdErr::IndexOutOfRange { row, index, rows } => write!(
                f,
                "index {index} at gradient row {row} is out of range for {rows} parameter rows"
            ),
            SgdErr::InvalidMomentum(momentum) => {
                write!(f, "momentum must lie in [0, 1), got {momentum}")
            }
            SgdErr::Config(e) => write!(f, "invalid operator config: {e}"),
        }
    }
}

impl Error for SgdErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SgdErr::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SgdErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

/// Checks that `got` matches `expected`, naming the offending buffer otherwise.
pub(crate) fn ensure_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(SgdErr::ShapeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
