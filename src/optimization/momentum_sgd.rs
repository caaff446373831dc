use std::num::NonZeroUsize;

use log::{debug, warn};

use super::{dense, kernel::MomentumRule, sparse};
use crate::{
    error::{Result, SgdErr},
    specs::MomentumSgdSpec,
    tensor::{Indices, RawIndices, Slot},
};

/// A momentum SGD operator instance.
///
/// Its configuration is resolved once when it's built and stays the same for every update
/// it runs afterwards. It holds no buffers, the momentum of every tensor is owned by the
/// caller and lent to each update.
#[derive(Debug, Clone, Copy)]
pub struct MomentumSgd {
    rule: MomentumRule,
    bounds_check: bool,
    parallel_chunk: Option<NonZeroUsize>,
}

impl MomentumSgd {
    /// Creates a new `MomentumSgd` operator.
    ///
    /// # Arguments
    /// * `spec` - The operator configuration.
    ///
    /// # Returns
    /// A new operator, or an `InvalidMomentum` error if the coefficient isn't in `[0, 1)`.
    pub fn new(spec: MomentumSgdSpec) -> Result<Self> {
        let MomentumSgdSpec {
            momentum,
            nesterov,
            bounds_check,
            parallel_chunk,
        } = spec;

        if !(0.0..1.0).contains(&momentum) {
            return Err(SgdErr::InvalidMomentum(momentum));
        }

        Ok(Self {
            rule: MomentumRule::new(momentum, nesterov),
            bounds_check,
            parallel_chunk,
        })
    }

    /// Creates a new `MomentumSgd` operator out of a json configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(MomentumSgdSpec::from_json(json)?)
    }

    /// Returns the momentum recurrence this operator applies.
    pub fn rule(&self) -> MomentumRule {
        self.rule
    }

    /// Computes the step and the new momentum of a dense tensor without touching its
    /// parameters.
    ///
    /// # Arguments
    /// * `grad` - The gradient, its output receives the step.
    /// * `momentum` - The velocity, same length as `grad`.
    /// * `lr` - A single element buffer holding the learning rate.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the buffer lengths don't agree.
    pub fn update_gradient(&self, grad: Slot<'_>, momentum: Slot<'_>, lr: &[f32]) -> Result<()> {
        debug!(len = grad.len(), nesterov = self.rule.nesterov; "momentum gradient update");

        dense::gradient_update(grad, momentum, lr, self.rule, self.parallel_chunk)
            .inspect_err(|e| warn!("rejected momentum gradient update: {e}"))
    }

    /// Computes the step and the new momentum of a dense tensor and descends its parameters.
    ///
    /// # Arguments
    /// * `grad` - The gradient, its output receives the step.
    /// * `momentum` - The velocity, same length as `grad`.
    /// * `lr` - A single element buffer holding the learning rate.
    /// * `param` - The parameters, same length as `grad`.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the buffer lengths don't agree.
    pub fn update(
        &self,
        grad: Slot<'_>,
        momentum: Slot<'_>,
        lr: &[f32],
        param: Slot<'_>,
    ) -> Result<()> {
        debug!(len = grad.len(), nesterov = self.rule.nesterov; "momentum parameter update");

        dense::parameter_update(grad, momentum, lr, param, self.rule, self.parallel_chunk)
            .inspect_err(|e| warn!("rejected momentum parameter update: {e}"))
    }

    /// Applies the update to the parameter rows selected by `indices`.
    ///
    /// See `sparse::indexed_update` for the handling of duplicate indices.
    ///
    /// # Arguments
    /// * `grad` - The gradient, `grad_rows` rows of equal size, its output receives the steps.
    /// * `grad_rows` - The first dimension of the gradient.
    /// * `momentum` - The velocity of every parameter, updated in place.
    /// * `lr` - A single element buffer holding the learning rate.
    /// * `param` - Every parameter, updated in place.
    /// * `indices` - One row identifier per gradient row.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the shapes don't agree, or an `IndexOutOfRange` error if
    /// bounds checking is enabled and an index doesn't name a parameter row.
    ///
    /// # Panics
    /// If bounds checking is disabled and an index doesn't name a parameter row.
    pub fn sparse_update(
        &self,
        grad: Slot<'_>,
        grad_rows: usize,
        momentum: &mut [f32],
        lr: &[f32],
        param: &mut [f32],
        indices: Indices<'_>,
    ) -> Result<()> {
        let dtype = indices.dtype();

        let layout = sparse::indexed_update(
            grad,
            grad_rows,
            momentum,
            lr,
            param,
            indices,
            self.rule,
            self.bounds_check,
        )
        .inspect_err(|e| warn!("rejected sparse momentum update: {e}"))?;

        debug!(
            rows = layout.rows,
            block_size = layout.block_size,
            param_rows = layout.param_rows;
            "sparse momentum update over {dtype} indices"
        );

        Ok(())
    }

    /// Same as `sparse_update` but resolves the width of type-erased indices first.
    ///
    /// # Returns
    /// An `UnsupportedIndexWidth` error if the indices aren't `i32` or `i64`, plus the
    /// errors of `sparse_update`.
    pub fn sparse_update_raw(
        &self,
        grad: Slot<'_>,
        grad_rows: usize,
        momentum: &mut [f32],
        lr: &[f32],
        param: &mut [f32],
        indices: RawIndices<'_>,
    ) -> Result<()> {
        let indices = Indices::try_from(indices)
            .inspect_err(|e| warn!("rejected sparse momentum update: {e}"))?;

        self.sparse_update(grad, grad_rows, momentum, lr, param, indices)
    }
}
