mod optimizer;

pub use optimizer::MomentumSgdSpec;
