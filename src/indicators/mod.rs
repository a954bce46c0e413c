pub mod classifier;
pub mod cycle;
pub mod registry;

pub use classifier::{classify, Classification};
pub use registry::Registry;
