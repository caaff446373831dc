use std::ops::Range;

use crate::error::{Result, ensure_len};

/// A float buffer handed over by the host, paired with the place its update is written to.
///
/// The host decides the aliasing: an `InPlace` slot is read and then overwritten element by
/// element, a `Split` slot is read from `input` and written to a distinct `output` of the
/// same length.
#[derive(Debug)]
pub enum Slot<'a> {
    InPlace(&'a mut [f32]),
    Split {
        input: &'a [f32],
        output: &'a mut [f32],
    },
}

impl<'a> Slot<'a> {
    /// Creates a slot whose output overwrites its input.
    pub fn in_place(data: &'a mut [f32]) -> Self {
        Self::InPlace(data)
    }

    /// Creates a slot that reads `input` and writes into `output`.
    pub fn split(input: &'a [f32], output: &'a mut [f32]) -> Self {
        Self::Split { input, output }
    }

    /// Returns the amount of elements in the input side of this slot.
    pub fn len(&self) -> usize {
        match self {
            Slot::InPlace(data) => data.len(),
            Slot::Split { input, .. } => input.len(),
        }
    }

    /// Returns true if this slot holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The side of the slot that holds the result of an update.
    pub fn output(&self) -> &[f32] {
        match self {
            Slot::InPlace(data) => data,
            Slot::Split { output, .. } => output,
        }
    }

    /// Checks that the output side is shaped like the input side.
    ///
    /// # Arguments
    /// * `what` - The name of the buffer, used in the error.
    pub(crate) fn check(&self, what: &'static str) -> Result<()> {
        match self {
            Slot::InPlace(_) => Ok(()),
            Slot::Split { input, output } => ensure_len(what, output.len(), input.len()),
        }
    }

    /// Borrows the elements in `range` of both sides as a new slot.
    ///
    /// # Panics
    /// If `range` is out of bounds.
    pub(crate) fn slice(&mut self, range: Range<usize>) -> Slot<'_> {
        match self {
            Slot::InPlace(data) => Slot::InPlace(&mut data[range]),
            Slot::Split { input, output } => Slot::Split {
                input: &input[range.clone()],
                output: &mut output[range],
            },
        }
    }

    /// Splits the slot into consecutive chunks of at most `size` elements.
    pub(crate) fn into_chunks(self, size: usize) -> Vec<Slot<'a>> {
        match self {
            Slot::InPlace(data) => data.chunks_mut(size).map(Slot::InPlace).collect(),
            Slot::Split { input, output } => input
                .chunks(size)
                .zip(output.chunks_mut(size))
                .map(|(input, output)| Slot::Split { input, output })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SgdErr;

    #[test]
    fn test_split_output_length_is_checked() {
        let input = [1., 2., 3.];
        let mut output = [0.; 2];
        let slot = Slot::split(&input, &mut output);

        let Err(SgdErr::ShapeMismatch { what, got, expected }) = slot.check("grad") else {
            panic!("expected a shape mismatch");
        };
        assert_eq!((what, got, expected), ("grad", 2, 3));
    }

    #[test]
    fn test_slice_keeps_aliasing() {
        let mut data = [1., 2., 3., 4.];
        let mut slot = Slot::in_place(&mut data);

        let row = slot.slice(2..4);
        assert!(matches!(row, Slot::InPlace(_)));
        assert_eq!(row.output(), [3., 4.]);
    }

    #[test]
    fn test_ragged_chunks() {
        let input = [1.; 5];
        let mut output = [0.; 5];
        let chunks = Slot::split(&input, &mut output).into_chunks(2);

        let lens: Vec<_> = chunks.iter().map(Slot::len).collect();
        assert_eq!(lens, [2, 2, 1]);
        assert!(chunks.iter().all(|chunk| chunk.check("grad").is_ok()));
    }
}
