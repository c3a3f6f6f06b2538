use std::time::Duration;

use beacon_core_base::{DiscoveryError, Result, ServiceInstanceInfo};
use serde::{Deserialize, Serialize};

use crate::resolver::BalanceStrategy;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// 本地服务身份
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    pub address: String,
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String, // grpc, http
    pub id: Option<String>,
    pub node: Option<String>,
    pub version: Option<String>,
}

fn default_protocol() -> String {
    "grpc".to_string()
}

impl ServiceConfig {
    /// 构建本地服务实例，未配置 ID 时生成随机 ID
    pub fn to_instance(&self) -> ServiceInstanceInfo {
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.name, uuid::Uuid::new_v4()));
        let mut instance = ServiceInstanceInfo::new(&self.name, id, &self.address, self.port)
            .with_protocol(&self.protocol);
        if let Some(node) = &self.node {
            instance = instance.with_node(node);
        }
        if let Some(version) = &self.version {
            instance.version = version.clone();
        }
        instance
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub balancer: BalanceStrategy,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl ResolverConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            balancer: BalanceStrategy::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DiscoveryError::config(format!("failed to read {path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DiscoveryError::config(e.to_string()))
    }
}
