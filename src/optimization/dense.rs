use std::num::NonZeroUsize;

use super::kernel::{self, MomentumRule};
use crate::{
    error::{Result, SgdErr, ensure_len},
    tensor::Slot,
};

/// Extracts the learning rate out of its single element buffer.
pub(super) fn learning_rate(lr: &[f32]) -> Result<f32> {
    match lr {
        [lr] => Ok(*lr),
        _ => Err(SgdErr::ShapeMismatch {
            what: "learning rate",
            got: lr.len(),
            expected: 1,
        }),
    }
}

/// Updates the gradient and momentum of a whole tensor, leaving its parameters alone.
///
/// # Arguments
/// * `grad` - The gradient, its output receives the step.
/// * `momentum` - The velocity, same length as `grad`.
/// * `lr` - A single element buffer holding the learning rate.
/// * `rule` - The momentum recurrence.
/// * `chunk` - If set, the update runs on rayon in chunks of this many elements.
///
/// # Returns
/// A `ShapeMismatch` error, before touching any buffer, if the lengths don't agree.
pub fn gradient_update(
    grad: Slot<'_>,
    momentum: Slot<'_>,
    lr: &[f32],
    rule: MomentumRule,
    chunk: Option<NonZeroUsize>,
) -> Result<()> {
    let lr = validate(&grad, &momentum, lr)?;
    run(grad, momentum, lr, rule, None, chunk);
    Ok(())
}

/// Updates the gradient and momentum of a whole tensor and descends its parameters by the
/// computed step.
///
/// # Arguments
/// * `grad` - The gradient, its output receives the step.
/// * `momentum` - The velocity, same length as `grad`.
/// * `lr` - A single element buffer holding the learning rate.
/// * `param` - The parameters, same length as `grad`.
/// * `rule` - The momentum recurrence.
/// * `chunk` - If set, the update runs on rayon in chunks of this many elements.
///
/// # Returns
/// A `ShapeMismatch` error, before touching any buffer, if the lengths don't agree.
pub fn parameter_update(
    grad: Slot<'_>,
    momentum: Slot<'_>,
    lr: &[f32],
    param: Slot<'_>,
    rule: MomentumRule,
    chunk: Option<NonZeroUsize>,
) -> Result<()> {
    let lr = validate(&grad, &momentum, lr)?;
    ensure_len("param", param.len(), grad.len())?;
    param.check("param")?;

    run(grad, momentum, lr, rule, Some(param), chunk);
    Ok(())
}

fn validate(grad: &Slot<'_>, momentum: &Slot<'_>, lr: &[f32]) -> Result<f32> {
    let lr = learning_rate(lr)?;
    ensure_len("momentum", momentum.len(), grad.len())?;
    grad.check("grad")?;
    momentum.check("momentum")?;
    Ok(lr)
}

fn run(
    grad: Slot<'_>,
    momentum: Slot<'_>,
    lr: f32,
    rule: MomentumRule,
    param: Option<Slot<'_>>,
    chunk: Option<NonZeroUsize>,
) {
    match chunk {
        Some(chunk) if grad.len() > chunk.get() => {
            kernel::momentum_step_chunked(grad, momentum, lr, rule, param, chunk);
        }
        _ => kernel::momentum_step(grad.len(), grad, momentum, lr, rule, param),
    }
}
