//! 任务定义模块
//!
//! 提供统一的后台任务抽象，发现后端的运行循环通过 [`DiscoveryTask`] 接入

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use beacon_core_base::Context;

use crate::discovery::Discovery;

/// 任务执行结果
pub type TaskResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// 任务 trait
///
/// 所有需要在运行时中管理的任务都必须实现此 trait
pub trait Task: Send {
    /// 获取任务名称
    fn name(&self) -> &str;

    /// 获取任务依赖
    ///
    /// 依赖的任务会在此任务之前启动，默认无依赖
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// 运行任务
    ///
    /// # 参数
    /// * `ctx` - 任务上下文，被取消时任务应该优雅退出
    fn run(self: Box<Self>, ctx: Context) -> Pin<Box<dyn Future<Output = TaskResult> + Send>>;
}

// -------- Discovery Task --------

/// 发现后端任务
///
/// 将实现了 [`Discovery`] 的后端运行循环包装成 `Task`
pub struct DiscoveryTask {
    name: String,
    dependencies: Vec<String>,
    discovery: Arc<dyn Discovery>,
}

impl DiscoveryTask {
    pub fn new(name: impl Into<String>, discovery: Arc<dyn Discovery>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            discovery,
        }
    }

    /// 设置任务依赖
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }
}

impl Task for DiscoveryTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn run(self: Box<Self>, ctx: Context) -> Pin<Box<dyn Future<Output = TaskResult> + Send>> {
        Box::pin(async move { self.discovery.run(ctx).await.map_err(Into::into) })
    }
}

// -------- Spawn Task --------

/// Spawn 任务
///
/// 用闭包延迟构建 Future，以便在 run 时传入任务上下文
pub struct SpawnTask {
    name: String,
    dependencies: Vec<String>,
    future_fn: Box<
        dyn FnOnce(Context) -> Pin<Box<dyn Future<Output = TaskResult> + Send>> + Send + 'static,
    >,
}

impl SpawnTask {
    /// 创建新的 spawn 任务（不关心取消信号）
    pub fn new<Fut>(name: impl Into<String>, future: Fut) -> Self
    where
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            future_fn: Box::new(move |_ctx| Box::pin(future)),
        }
    }

    /// 创建新的 spawn 任务（需要任务上下文）
    ///
    /// # 示例
    /// ```rust
    /// use beacon_core::runtime::task::SpawnTask;
    ///
    /// let task = SpawnTask::with_context("my-task", |ctx| async move {
    ///     ctx.done().await;
    ///     Ok(())
    /// });
    /// ```
    pub fn with_context<F, Fut>(name: impl Into<String>, future_fn: F) -> Self
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            future_fn: Box::new(move |ctx| Box::pin(future_fn(ctx))),
        }
    }

    /// 设置任务依赖
    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }
}

impl Task for SpawnTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn run(self: Box<Self>, ctx: Context) -> Pin<Box<dyn Future<Output = TaskResult> + Send>> {
        (self.future_fn)(ctx)
    }
}
