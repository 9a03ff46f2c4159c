//! Optimizers - first-order updates of flat parameter vectors.

mod adam;

pub use adam::{Adam, AdamOptions};
