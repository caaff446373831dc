//! Momentum SGD update kernels for a host tensor runtime.
//!
//! A host hands over borrowed buffers for one step of one tensor and gets them back
//! updated. Three operations are exposed through [`MomentumSgd`]: a gradient only update,
//! a dense parameter update and a sparse update over the parameter rows named by an index
//! list.
//!
//! ```
//! use momentum_sgd::{MomentumSgd, specs::MomentumSgdSpec, tensor::Slot};
//!
//! let op = MomentumSgd::new(MomentumSgdSpec {
//!     momentum: 0.9,
//!     ..Default::default()
//! })?;
//!
//! let mut grad = [1., 2., 3.];
//! let mut momentum = [0.; 3];
//! let mut param = [1.; 3];
//! op.update(
//!     Slot::in_place(&mut grad),
//!     Slot::in_place(&mut momentum),
//!     &[0.1],
//!     Slot::in_place(&mut param),
//! )?;
//!
//! assert!((param[2] - 0.7).abs() < 1e-6);
//! # Ok::<(), momentum_sgd::SgdErr>(())
//! ```

mod error;
pub mod optimization;
pub mod specs;
pub mod tensor;

pub use error::{Result, SgdErr};
pub use optimization::{MomentumRule, MomentumSgd};
