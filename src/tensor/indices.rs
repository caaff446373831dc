use std::fmt;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SgdErr};

/// The element type tag a host tensor declares for its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    U8,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::U8 => "u8",
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::F16 => "f16",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        };

        f.write_str(name)
    }
}

/// A type-erased index tensor: its declared element type and its raw bytes.
#[derive(Debug, Clone, Copy)]
pub struct RawIndices<'a> {
    dtype: ElementType,
    bytes: &'a [u8],
}

impl<'a> RawIndices<'a> {
    /// Creates a new `RawIndices` view.
    ///
    /// # Arguments
    /// * `dtype` - The element type the host declares for `bytes`.
    /// * `bytes` - The native endian contents of the tensor.
    pub fn new(dtype: ElementType, bytes: &'a [u8]) -> Self {
        Self { dtype, bytes }
    }

    /// Returns the declared element type.
    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    fn cast<T: Pod>(&self) -> Result<&'a [T]> {
        if self.bytes.is_empty() {
            return Ok(&[]);
        }

        bytemuck::try_cast_slice(self.bytes).map_err(|_| SgdErr::MalformedIndices {
            dtype: self.dtype,
            bytes: self.bytes.len(),
        })
    }
}

/// Row identifiers of a sparse update, in one of the two supported widths.
#[derive(Debug, Clone, Copy)]
pub enum Indices<'a> {
    I32(&'a [i32]),
    I64(&'a [i64]),
}

impl Indices<'_> {
    /// Returns the amount of row identifiers.
    pub fn len(&self) -> usize {
        match self {
            Indices::I32(indices) => indices.len(),
            Indices::I64(indices) => indices.len(),
        }
    }

    /// Returns true if there are no row identifiers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element type of the identifiers.
    pub fn dtype(&self) -> ElementType {
        match self {
            Indices::I32(_) => ElementType::I32,
            Indices::I64(_) => ElementType::I64,
        }
    }
}

impl<'a> From<&'a [i32]> for Indices<'a> {
    fn from(value: &'a [i32]) -> Self {
        Self::I32(value)
    }
}

impl<'a> From<&'a [i64]> for Indices<'a> {
    fn from(value: &'a [i64]) -> Self {
        Self::I64(value)
    }
}

impl<'a> TryFrom<RawIndices<'a>> for Indices<'a> {
    type Error = SgdErr;

    fn try_from(value: RawIndices<'a>) -> Result<Self> {
        match value.dtype {
            ElementType::I32 => value.cast().map(Indices::I32),
            ElementType::I64 => value.cast().map(Indices::I64),
            other => Err(SgdErr::UnsupportedIndexWidth(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_i64_indices() {
        let ids = [3_i64, 0, 3];
        let raw = RawIndices::new(ElementType::I64, bytemuck::cast_slice(&ids[..]));

        let Ok(Indices::I64(resolved)) = Indices::try_from(raw) else {
            panic!("expected i64 indices");
        };
        assert_eq!(resolved, ids);
    }

    #[test]
    fn test_resolve_empty_indices() {
        let raw = RawIndices::new(ElementType::I32, &[]);
        let indices = Indices::try_from(raw).unwrap();

        assert!(indices.is_empty());
        assert_eq!(indices.dtype(), ElementType::I32);
    }

    #[test]
    fn test_reject_unsupported_width() {
        for dtype in [ElementType::I16, ElementType::U8, ElementType::F32] {
            let raw = RawIndices::new(dtype, &[0; 8]);
            let res = Indices::try_from(raw);
            assert!(matches!(res, Err(SgdErr::UnsupportedIndexWidth(d)) if d == dtype));
        }
    }

    #[test]
    fn test_reject_ragged_bytes() {
        let ids = [1_i32, 2];
        let bytes: &[u8] = bytemuck::cast_slice(&ids[..]);
        let raw = RawIndices::new(ElementType::I32, &bytes[..7]);

        let res = Indices::try_from(raw);
        assert!(matches!(
            res,
            Err(SgdErr::MalformedIndices {
                dtype: ElementType::I32,
                bytes: 7
            })
        ));
    }
}
