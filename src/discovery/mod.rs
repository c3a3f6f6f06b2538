//! 服务发现模块
//!
//! 提供生命周期事件分发、可插拔的服务目录契约以及一个内存参考实现。
//! 具体的远程后端（Consul、Kubernetes 等）只需要实现 [`Discovery`]。

pub mod base;
pub mod event;
pub mod fake;
pub mod filter;

use async_trait::async_trait;
use beacon_core_base::{Context, Result, ServiceInfo};

pub use base::BaseDiscovery;
pub use event::{Callback, EventHandler, EventType, Filter};
pub use fake::FakeDiscovery;

/// 服务发现后端契约
///
/// 由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait Discovery: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &str {
        "discovery"
    }

    /// 全部已知服务的快照
    async fn services(&self, ctx: &Context) -> Result<Vec<ServiceInfo>>;

    /// 按名称查找服务
    ///
    /// 名称未知时返回 [`DiscoveryError::NotFound`](beacon_core_base::DiscoveryError::NotFound)，
    /// 其余错误原样传播。
    async fn service_by_name(&self, ctx: &Context, name: &str) -> Result<ServiceInfo>;

    /// 后台运行循环
    ///
    /// 运行直到 `ctx` 被取消；正常停止返回 `Ok(())`。
    async fn run(&self, ctx: Context) -> Result<()>;
}
