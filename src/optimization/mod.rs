pub mod dense;
pub mod kernel;
mod momentum_sgd;
pub mod sparse;

pub use kernel::MomentumRule;
pub use momentum_sgd::MomentumSgd;
pub use sparse::{RowIndex, RowLayout};
