//! Database module exports.

pub mod models;
mod mongo;
mod repository;

pub use mongo::Database;
pub use repository::{CounterRepository, PolicyRepository, StrikeRepository, UntrustworthyRepository};
