use std::num::NonZeroUsize;

use rayon::prelude::*;

use crate::tensor::Slot;

/// The momentum recurrence an operator applies: its coefficient and whether it looks ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumRule {
    pub momentum: f32,
    pub nesterov: bool,
}

impl MomentumRule {
    /// Creates a new `MomentumRule`.
    ///
    /// # Arguments
    /// * `momentum` - The fraction of the previous velocity carried into each step.
    /// * `nesterov` - Whether to use the Nesterov look-ahead step.
    pub fn new(momentum: f32, nesterov: bool) -> Self {
        Self { momentum, nesterov }
    }

    /// Computes the step and the new velocity of one element.
    ///
    /// # Arguments
    /// * `lr` - The learning rate.
    /// * `g` - The gradient of the element.
    /// * `m` - The current velocity of the element.
    ///
    /// # Returns
    /// The pair `(step, velocity)`.
    pub fn advance(&self, lr: f32, g: f32, m: f32) -> (f32, f32) {
        if self.nesterov {
            Nesterov::advance(lr, self.momentum, g, m)
        } else {
            Classic::advance(lr, self.momentum, g, m)
        }
    }
}

trait Recurrence {
    fn advance(lr: f32, mu: f32, g: f32, m: f32) -> (f32, f32);
}

struct Classic;

impl Recurrence for Classic {
    #[inline(always)]
    fn advance(lr: f32, mu: f32, g: f32, m: f32) -> (f32, f32) {
        let adjusted = lr * g + mu * m;
        (adjusted, adjusted)
    }
}

struct Nesterov;

impl Recurrence for Nesterov {
    #[inline(always)]
    fn advance(lr: f32, mu: f32, g: f32, m: f32) -> (f32, f32) {
        let m_new = mu * m + lr * g;
        ((1. + mu) * m_new - mu * m, m_new)
    }
}

/// Element access to one side of a resolved `Slot`.
trait Lane {
    fn read(&self, i: usize) -> f32;
    fn write(&mut self, i: usize, value: f32);
}

struct Aliased<'a>(&'a mut [f32]);

impl Lane for Aliased<'_> {
    #[inline(always)]
    fn read(&self, i: usize) -> f32 {
        self.0[i]
    }

    #[inline(always)]
    fn write(&mut self, i: usize, value: f32) {
        self.0[i] = value;
    }
}

struct Distinct<'a> {
    input: &'a [f32],
    output: &'a mut [f32],
}

impl Lane for Distinct<'_> {
    #[inline(always)]
    fn read(&self, i: usize) -> f32 {
        self.input[i]
    }

    #[inline(always)]
    fn write(&mut self, i: usize, value: f32) {
        self.output[i] = value;
    }
}

/// Where the step of each element goes once it's computed.
trait Descent {
    fn descend(&mut self, i: usize, step: f32);
}

struct Frozen;

impl Descent for Frozen {
    #[inline(always)]
    fn descend(&mut self, _: usize, _: f32) {}
}

struct Params<L: Lane>(L);

impl<L: Lane> Descent for Params<L> {
    #[inline(always)]
    fn descend(&mut self, i: usize, step: f32) {
        let p = self.0.read(i);
        self.0.write(i, p - step);
    }
}

/// Resolves a `Slot` into a concrete `Lane` so the loops below are monomorphized per aliasing
/// mode instead of matching on it for every element.
macro_rules! with_lane {
    ($slot:expr, $lane:ident => $body:expr) => {
        match $slot {
            Slot::InPlace(data) => {
                let $lane = Aliased(data);
                $body
            }
            Slot::Split { input, output } => {
                let $lane = Distinct { input, output };
                $body
            }
        }
    };
}

/// Applies one momentum SGD step to `len` elements.
///
/// The new velocity is written into `momentum`, the step into `grad` and, if given, `param`
/// is decremented by the step. Inputs are read before any output of the same element is
/// written, so in place and split slots give the same result.
///
/// # Arguments
/// * `len` - The amount of elements to update, every slot must hold exactly this many.
/// * `grad` - The gradient, its output receives the step.
/// * `momentum` - The velocity, its output receives the updated velocity.
/// * `lr` - The learning rate.
/// * `rule` - The momentum recurrence.
/// * `param` - The parameters to descend, if any.
pub fn momentum_step(
    len: usize,
    grad: Slot<'_>,
    momentum: Slot<'_>,
    lr: f32,
    rule: MomentumRule,
    param: Option<Slot<'_>>,
) {
    debug_assert_eq!(grad.len(), len);
    debug_assert_eq!(momentum.len(), len);
    debug_assert!(param.as_ref().is_none_or(|p| p.len() == len));

    with_lane!(grad, g => with_lane!(momentum, m => match param {
        None => sweep_rule(len, g, m, Frozen, lr, rule),
        Some(param) => with_lane!(param, p => sweep_rule(len, g, m, Params(p), lr, rule)),
    }))
}

/// Same as `momentum_step` but splits the buffers into chunks of `chunk` elements and
/// updates them on the rayon thread pool.
pub fn momentum_step_chunked(
    grad: Slot<'_>,
    momentum: Slot<'_>,
    lr: f32,
    rule: MomentumRule,
    param: Option<Slot<'_>>,
    chunk: NonZeroUsize,
) {
    let chunk = chunk.get();
    let grads = grad.into_chunks(chunk);
    let momenta = momentum.into_chunks(chunk);

    match param {
        None => grads.into_par_iter().zip(momenta).for_each(|(g, m)| {
            momentum_step(g.len(), g, m, lr, rule, None);
        }),
        Some(param) => grads
            .into_par_iter()
            .zip(momenta)
            .zip(param.into_chunks(chunk))
            .for_each(|((g, m), p)| {
                momentum_step(g.len(), g, m, lr, rule, Some(p));
            }),
    }
}

fn sweep_rule<G: Lane, M: Lane, D: Descent>(
    len: usize,
    grad: G,
    momentum: M,
    param: D,
    lr: f32,
    rule: MomentumRule,
) {
    if rule.nesterov {
        sweep::<Nesterov, _, _, _>(len, grad, momentum, param, lr, rule.momentum);
    } else {
        sweep::<Classic, _, _, _>(len, grad, momentum, param, lr, rule.momentum);
    }
}

#[inline(always)]
fn sweep<R: Recurrence, G: Lane, M: Lane, D: Descent>(
    len: usize,
    mut grad: G,
    mut momentum: M,
    mut param: D,
    lr: f32,
    mu: f32,
) {
    for i in 0..len {
        let g = grad.read(i);
        let m = momentum.read(i);
        let (step, velocity) = R::advance(lr, mu, g, m);

        momentum.write(i, velocity);
        grad.write(i, step);
        param.descend(i, step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LR: f32 = 0.1;

    fn assert_close(got: &[f32], expected: &[f32]) {
        assert_eq!(got.len(), expected.len());
        for (i, (g, e)) in got.iter().zip(expected).enumerate() {
            assert!((g - e).abs() < 1e-6, "element {i}: got {g}, expected {e}");
        }
    }

    #[test]
    fn test_classic_step() {
        let rule = MomentumRule::new(0.9, false);
        let mut grad = [1., 2., 3.];
        let mut momentum = [0.; 3];
        let mut param = [1.; 3];

        momentum_step(
            3,
            Slot::in_place(&mut grad),
            Slot::in_place(&mut momentum),
            LR,
            rule,
            Some(Slot::in_place(&mut param)),
        );

        assert_close(&momentum, &[0.1, 0.2, 0.3]);
        assert_close(&grad, &[0.1, 0.2, 0.3]);
        assert_close(&param, &[0.9, 0.8, 0.7]);
    }

    #[test]
    fn test_nesterov_step() {
        let rule = MomentumRule::new(0.5, true);
        let grad = [1., -2.];
        let momentum = [0.4, 0.2];
        let mut ng = [0.; 2];
        let mut nm = [0.; 2];

        momentum_step(
            2,
            Slot::split(&grad, &mut ng),
            Slot::split(&momentum, &mut nm),
            LR,
            rule,
            None,
        );

        // nm = 0.5 * m + 0.1 * g, ng = 1.5 * nm - 0.5 * m
        assert_close(&nm, &[0.3, -0.1]);
        assert_close(&ng, &[0.25, -0.25]);
        assert_eq!(momentum, [0.4, 0.2]);
    }

    #[test]
    fn test_split_param_keeps_input() {
        let rule = MomentumRule::new(0.9, false);
        let mut grad = [1., 1.];
        let mut momentum = [1., 0.];
        let param = [2., 2.];
        let mut param_out = [0.; 2];

        momentum_step(
            2,
            Slot::in_place(&mut grad),
            Slot::in_place(&mut momentum),
            LR,
            rule,
            Some(Slot::split(&param, &mut param_out)),
        );

        assert_close(&param_out, &[1.0, 1.9]);
        assert_eq!(param, [2., 2.]);
    }

    #[test]
    fn test_zero_momentum_is_plain_sgd() {
        let grad = [0.5, -1., 4.];
        let momentum = [3., -7., 0.25];

        for nesterov in [false, true] {
            let mut ng = [0.; 3];
            let mut nm = [0.; 3];
            momentum_step(
                3,
                Slot::split(&grad, &mut ng),
                Slot::split(&momentum, &mut nm),
                LR,
                MomentumRule::new(0., nesterov),
                None,
            );

            assert_close(&ng, &[0.05, -0.1, 0.4]);
            assert_close(&nm, &[0.05, -0.1, 0.4]);
        }
    }

    #[test]
    fn test_advance_matches_kernel() {
        let rule = MomentumRule::new(0.75, true);
        let mut grad = [2.];
        let mut momentum = [-1.];

        momentum_step(
            1,
            Slot::in_place(&mut grad),
            Slot::in_place(&mut momentum),
            LR,
            rule,
            None,
        );

        assert_eq!(rule.advance(LR, 2., -1.), (grad[0], momentum[0]));
    }

    #[test]
    fn test_chunked_matches_sequential() {
        let rule = MomentumRule::new(0.9, true);
        let grad: Vec<f32> = (0..37).map(|i| i as f32 * 0.25 - 3.).collect();
        let momentum: Vec<f32> = (0..37).map(|i| (i % 5) as f32 * 0.1).collect();

        let (mut seq_g, mut seq_m, mut seq_p) = (grad.clone(), momentum.clone(), vec![1.; 37]);
        momentum_step(
            37,
            Slot::in_place(&mut seq_g),
            Slot::in_place(&mut seq_m),
            LR,
            rule,
            Some(Slot::in_place(&mut seq_p)),
        );

        let (mut par_g, mut par_m, mut par_p) = (grad, momentum, vec![1.; 37]);
        momentum_step_chunked(
            Slot::in_place(&mut par_g),
            Slot::in_place(&mut par_m),
            LR,
            rule,
            Some(Slot::in_place(&mut par_p)),
            NonZeroUsize::new(8).unwrap(),
        );

        assert_eq!(seq_g, par_g);
        assert_eq!(seq_m, par_m);
        assert_eq!(seq_p, par_p);
    }
}
