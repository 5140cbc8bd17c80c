//! Rule library: independent, stateless checks.
//!
//! Order-independent in correctness; the pipeline decides reporting order.

pub mod censor;
pub mod extract;
pub mod spam;

pub use censor::RegexCache;
