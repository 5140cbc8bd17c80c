//! Utility functions.

pub mod duration;

pub use duration::{format_duration_full, parse_duration};
