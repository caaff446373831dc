use super::{
    dense::learning_rate,
    kernel::{self, MomentumRule},
};
use crate::{
    error::{Result, SgdErr, ensure_len},
    tensor::{Indices, Slot},
};

/// An integer type usable as a row identifier of a sparse update.
pub trait RowIndex: Copy + Into<i64> {
    /// Returns the offset of the first element of this row, saturating on rows that can't
    /// exist so the slice access that follows fails.
    fn offset(self, block_size: usize) -> usize {
        let row: i64 = self.into();
        usize::try_from(row)
            .map(|row| row.saturating_mul(block_size))
            .unwrap_or(usize::MAX)
    }
}

impl RowIndex for i32 {}
impl RowIndex for i64 {}

/// The row layout of a sparse update, computed once from the buffer shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    /// The amount of gradient rows, one per index.
    pub rows: usize,
    /// The amount of elements in every row.
    pub block_size: usize,
    /// The amount of rows in the parameters.
    pub param_rows: usize,
}

impl RowLayout {
    /// Computes the layout of a sparse update, checking that every buffer splits in rows of
    /// the same size.
    ///
    /// # Arguments
    /// * `grad_len` - The total amount of gradient elements.
    /// * `grad_rows` - The first dimension of the gradient.
    /// * `indices` - The amount of row identifiers.
    /// * `param_len` - The total amount of parameters.
    pub fn new(
        grad_len: usize,
        grad_rows: usize,
        indices: usize,
        param_len: usize,
    ) -> Result<Self> {
        ensure_len("indices", indices, grad_rows)?;

        if grad_rows == 0 {
            ensure_len("grad", grad_len, 0)?;
            return Ok(Self {
                rows: 0,
                block_size: 0,
                param_rows: 0,
            });
        }

        let block_size = grad_len / grad_rows;
        ensure_len("grad", grad_len, grad_rows * block_size)?;

        let param_rows = match block_size {
            0 => 0,
            _ => param_len / block_size,
        };
        ensure_len("param", param_len, param_rows * block_size)?;

        Ok(Self {
            rows: grad_rows,
            block_size,
            param_rows,
        })
    }
}

/// Applies a momentum step to the rows of `param` and `momentum` selected by `indices`.
///
/// Gradient row `i` updates parameter row `indices[i]`. Rows are processed in order, so
/// when several gradient rows share an index each one is applied on top of the state left
/// by the previous ones and the last one wins.
///
/// # Arguments
/// * `grad` - The gradient, `grad_rows` rows of equal size, its output receives the steps.
/// * `grad_rows` - The first dimension of the gradient.
/// * `momentum` - The velocity of every parameter, updated in place.
/// * `lr` - A single element buffer holding the learning rate.
/// * `param` - Every parameter, updated in place.
/// * `indices` - One row identifier per gradient row.
/// * `rule` - The momentum recurrence.
/// * `bounds_check` - Whether to reject out of range indices before writing anything.
///
/// # Returns
/// The layout of the update, or an error before touching any buffer if the shapes don't
/// agree or, when `bounds_check` is set, an index is out of range.
///
/// # Panics
/// If `bounds_check` isn't set and an index is negative or out of range.
#[allow(clippy::too_many_arguments)]
pub fn indexed_update(
    grad: Slot<'_>,
    grad_rows: usize,
    momentum: &mut [f32],
    lr: &[f32],
    param: &mut [f32],
    indices: Indices<'_>,
    rule: MomentumRule,
    bounds_check: bool,
) -> Result<RowLayout> {
    let lr = learning_rate(lr)?;
    ensure_len("momentum", momentum.len(), param.len())?;
    grad.check("grad")?;
    let layout = RowLayout::new(grad.len(), grad_rows, indices.len(), param.len())?;

    match indices {
        Indices::I32(indices) => {
            scatter(grad, momentum, lr, param, indices, rule, layout, bounds_check)?
        }
        Indices::I64(indices) => {
            scatter(grad, momentum, lr, param, indices, rule, layout, bounds_check)?
        }
    }

    Ok(layout)
}

#[allow(clippy::too_many_arguments)]
fn scatter<I: RowIndex>(
    mut grad: Slot<'_>,
    momentum: &mut [f32],
    lr: f32,
    param: &mut [f32],
    indices: &[I],
    rule: MomentumRule,
    layout: RowLayout,
    bounds_check: bool,
) -> Result<()> {
    if bounds_check {
        check_rows(indices, layout.param_rows)?;
    }

    let block_size = layout.block_size;

    for (i, &idx) in indices.iter().enumerate() {
        let src = i * block_size..(i + 1) * block_size;
        let start = idx.offset(block_size);
        let dst = start..start.saturating_add(block_size);

        kernel::momentum_step(
            block_size,
            grad.slice(src),
            Slot::in_place(&mut momentum[dst.clone()]),
            lr,
            rule,
            Some(Slot::in_place(&mut param[dst])),
        );
    }

    Ok(())
}

fn check_rows<I: RowIndex>(indices: &[I], rows: usize) -> Result<()> {
    for (row, &idx) in indices.iter().enumerate() {
        let index: i64 = idx.into();
        let in_range = usize::try_from(index).is_ok_and(|index| index < rows);

        if !in_range {
            return Err(SgdErr::IndexOutOfRange { row, index, rows });
        }
    }

    Ok(())
}
