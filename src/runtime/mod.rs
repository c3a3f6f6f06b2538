//! 后台任务运行时
//!
//! 为发现后端提供受管后台任务契约：启动、取消、等待完成。
//! 解析与分发核心本身从不启动或停止后端，由应用通过本模块管理。
//!
//! # 使用示例
//! ```rust,no_run
//! use std::sync::Arc;
//! use beacon_core::discovery::FakeDiscovery;
//! use beacon_core::runtime::TaskRuntime;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! TaskRuntime::new("my-service")
//!     .add_discovery("discovery", Arc::new(FakeDiscovery::default()))
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```

pub mod config;
pub mod runtime;
pub mod task;

pub use config::RuntimeConfig;
pub use runtime::{RunningTasks, TaskRuntime};
pub use task::{DiscoveryTask, SpawnTask, Task, TaskResult};
