mod indices;
mod slot;

pub use indices::{ElementType, Indices, RawIndices};
pub use slot::Slot;
