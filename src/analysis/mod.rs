//! Derived views over a normalized evaluation.
//!
//! Everything here is pure and computed on demand; nothing is stored back
//! into the evaluation.

pub mod aggregator;
pub mod resolver;

pub use aggregator::*;
pub use resolver::*;
