//! Repository module - MongoDB implementations of the store traits.

mod counter_repository;
mod policy_repository;
mod strike_repository;
mod untrustworthy_repository;

pub use counter_repository::CounterRepository;
pub use policy_repository::PolicyRepository;
pub use strike_repository::StrikeRepository;
pub use untrustworthy_repository::UntrustworthyRepository;
