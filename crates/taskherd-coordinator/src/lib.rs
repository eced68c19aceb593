pub mod api;
mod config;
mod coordinator;
mod jobs;
mod registry;
mod scheduler;

pub use config::{ApiConfig, CoordinatorConfig, NetworkConfig};
pub use coordinator::Coordinator;
pub use registry::{WorkerView, CPU_ELIGIBLE_BELOW, MEM_ELIGIBLE_BELOW};
pub use scheduler::Assignment;
