//! Service runtime - state wiring and event ingest.

pub mod dispatcher;
mod runtime;
pub mod webhook;

pub use dispatcher::AppState;
pub use runtime::run;
