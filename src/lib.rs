//! Beacon Core Library
//!
//! 客户端服务发现与解析层：可插拔的服务目录、带过滤和一次性语义的生命周期事件分发、
//! 以及基于限时缓存和负载均衡的服务名解析。

pub mod config;
pub mod discovery;
pub mod logging;
pub mod resolver;

// 后台任务运行时
pub mod runtime;

// Re-exports
pub use beacon_core_base::{Context, DiscoveryError, Result, ServiceInfo, ServiceInstanceInfo};
pub use config::{Config, ResolverConfig, ServiceConfig};

pub use discovery::{BaseDiscovery, Discovery, EventHandler, EventType, FakeDiscovery};
pub use resolver::{
    BalanceStrategy, Balancer, DEFAULT_CACHE_TTL, RandomBalancer, Resolver, ResolverCache,
    RoundRobinBalancer,
};

pub use runtime::{RunningTasks, RuntimeConfig, TaskRuntime};
