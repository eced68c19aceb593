mod config;
pub mod executor;
mod health;
mod worker;

pub use config::WorkerConfig;
pub use executor::{CommandOutcome, ExecutionFault};
pub use health::HealthSampler;
pub use worker::Worker;
