//! CLI command implementations.

mod cache;
mod check;
mod config;
mod doctor;
mod serve;
mod transcript;

pub use cache::run_cache;
pub use check::run_check;
pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::run_serve;
pub use transcript::run_transcript;
