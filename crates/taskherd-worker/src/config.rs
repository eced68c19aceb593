use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub coordinator_address: String,
    /// Working directory every command runs in. Typically a directory shared
    /// across the cluster, e.g. over NFS.
    pub shared_dir: PathBuf,
    pub health_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            coordinator_address: "127.0.0.1:5000".to_string(),
            shared_dir: PathBuf::from("./shared"),
            health_interval_secs: 5,
        }
    }
}

impl WorkerConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: WorkerConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
