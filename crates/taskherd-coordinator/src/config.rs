use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub network: NetworkConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub http_port: u16,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            network: NetworkConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            api: ApiConfig { http_port: 8080 },
        }
    }
}

impl CoordinatorConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: CoordinatorConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.network.port, 5000);
        assert_eq!(config.api.http_port, 8080);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = CoordinatorConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: CoordinatorConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.network.host, config.network.host);
        assert_eq!(parsed.network.port, config.network.port);
    }
}
