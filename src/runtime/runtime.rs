//! 后台任务运行时实现
//!
//! 统一管理发现后端等后台任务的生命周期：按依赖顺序启动、取消、
//! 等待完成，以及带超时的优雅停机。

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use beacon_core_base::Context;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::discovery::Discovery;
use crate::runtime::config::RuntimeConfig;
use crate::runtime::task::{DiscoveryTask, SpawnTask, Task, TaskResult};

/// 后台任务运行时
///
/// # 使用示例
/// ```rust,no_run
/// use std::sync::Arc;
/// use beacon_core::discovery::FakeDiscovery;
/// use beacon_core::runtime::TaskRuntime;
///
/// # async fn demo() -> anyhow::Result<()> {
/// let discovery = Arc::new(FakeDiscovery::default());
/// let running = TaskRuntime::new("my-service")
///     .add_discovery("in-memory-discovery", discovery)
///     .start()?;
///
/// running.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct TaskRuntime {
    name: String,
    tasks: Vec<Box<dyn Task>>,
    config: RuntimeConfig,
}

impl TaskRuntime {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            config: RuntimeConfig::default(),
        }
    }

    /// 设置运行时配置
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// 添加任务
    pub fn add_task(mut self, task: Box<dyn Task>) -> Self {
        info!(task_name = %task.name(), "Adding task to runtime");
        self.tasks.push(task);
        self
    }

    /// 添加发现后端的运行循环
    pub fn add_discovery(self, name: impl Into<String>, discovery: Arc<dyn Discovery>) -> Self {
        self.add_task(Box::new(DiscoveryTask::new(name, discovery)))
    }

    /// 添加 spawn 任务（不关心取消信号）
    pub fn add_spawn<Fut>(self, name: impl Into<String>, future: Fut) -> Self
    where
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.add_task(Box::new(SpawnTask::new(name, future)))
    }

    /// 添加 spawn 任务（接收任务上下文）
    pub fn add_spawn_with_context<F, Fut>(self, name: impl Into<String>, future_fn: F) -> Self
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.add_task(Box::new(SpawnTask::with_context(name, future_fn)))
    }

    /// 按依赖顺序启动所有任务
    ///
    /// 依赖缺失或存在循环依赖时不会启动任何任务。
    pub fn start(self) -> Result<RunningTasks> {
        let sorted = topological_sort(self.tasks)?;
        info!(
            runtime = %self.name,
            task_count = sorted.len(),
            "Starting task runtime"
        );

        let ctx = Context::background();
        let mut join_set = JoinSet::new();
        for task in sorted {
            let task_name = task.name().to_string();
            let task_future = task.run(ctx.child());

            join_set.spawn(async move {
                let result = task_future.await;
                match &result {
                    Ok(_) => info!(task_name = %task_name, "Task completed"),
                    Err(e) => error!(task_name = %task_name, error = %e, "Task failed"),
                }
                (task_name, result)
            });
        }

        Ok(RunningTasks {
            name: self.name,
            ctx,
            join_set,
            config: self.config,
        })
    }

    /// 启动任务，等待 `shutdown` 完成后优雅停机
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let running = self.start()?;
        shutdown.await;
        info!(runtime = %running.name, "Shutdown signal received");
        running.shutdown().await
    }
}

/// 已启动的任务集合
#[derive(Debug)]
pub struct RunningTasks {
    name: String,
    ctx: Context,
    join_set: JoinSet<(String, TaskResult)>,
    config: RuntimeConfig,
}

impl RunningTasks {
    /// 向所有任务发送取消信号
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// 仍在运行的任务数量
    pub fn len(&self) -> usize {
        self.join_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.join_set.is_empty()
    }

    /// 等待所有任务结束
    ///
    /// 任一任务失败时返回错误，列出失败的任务名称。
    pub async fn wait(&mut self) -> Result<()> {
        let mut failed = Vec::new();
        while let Some(joined) = self.join_set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((task_name, Err(e))) => {
                    warn!(task_name = %task_name, error = %e, "Task completed with error");
                    failed.push(task_name);
                }
                Err(e) => {
                    warn!(error = %e, "Task join error");
                    failed.push(format!("<join error: {e}>"));
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("Tasks failed: {:?}", failed))
        }
    }

    /// 优雅停机：取消所有任务并在超时时间内等待结束，超时后强制中止
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel();
        let timeout = self.config.shutdown_timeout;
        let outcome = tokio::time::timeout(timeout, self.wait()).await;
        match outcome {
            Ok(result) => {
                info!(runtime = %self.name, "Task runtime stopped");
                result
            }
            Err(_) => {
                warn!(runtime = %self.name, "Tasks shutdown timeout, forcing exit");
                self.join_set.abort_all();
                Err(anyhow::anyhow!("Tasks shutdown timeout after {:?}", timeout))
            }
        }
    }
}

/// 按依赖关系对任务做拓扑排序（Kahn 算法）
fn topological_sort(tasks: Vec<Box<dyn Task>>) -> Result<Vec<Box<dyn Task>>> {
    let task_names: Vec<String> = tasks.iter().map(|t| t.name().to_string()).collect();
    let mut task_map: HashMap<String, Box<dyn Task>> = HashMap::new();
    let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();

    for task in tasks {
        let name = task.name().to_string();
        if task_map.contains_key(&name) {
            return Err(anyhow::anyhow!("Task '{}' is registered twice", name));
        }
        dependencies.insert(name.clone(), task.dependencies());
        task_map.insert(name, task);
    }

    // task -> 依赖它的任务列表
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();

    for name in &task_names {
        let deps = dependencies.get(name).map(Vec::as_slice).unwrap_or_default();
        in_degree.insert(name.as_str(), deps.len());
        for dep in deps {
            if !task_map.contains_key(dep) {
                return Err(anyhow::anyhow!(
                    "Task '{}' depends on '{}', but '{}' is not registered",
                    name,
                    dep,
                    dep
                ));
            }
            dependents.entry(dep.as_str()).or_default().push(name.as_str());
        }
    }

    // 保持注册顺序，便于预测启动顺序
    let mut queue: VecDeque<&str> = task_names
        .iter()
        .map(String::as_str)
        .filter(|name| in_degree.get(name).copied() == Some(0))
        .collect();

    let mut sorted = Vec::with_capacity(task_names.len());
    let mut processed: HashSet<&str> = HashSet::new();

    while let Some(current) = queue.pop_front() {
        if !processed.insert(current) {
            continue;
        }
        if let Some(task) = task_map.remove(current) {
            sorted.push(task);
        }
        for dependent in dependents.get(current).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(*dependent);
                }
            }
        }
    }

    if sorted.len() != task_names.len() {
        let remaining: Vec<&String> = task_names
            .iter()
            .filter(|name| !processed.contains(name.as_str()))
            .collect();
        return Err(anyhow::anyhow!(
            "Circular dependency detected. Tasks involved: {:?}",
            remaining
        ));
    }

    if sorted.len() > 1 {
        let order: Vec<&str> = sorted.iter().map(|t| t.name()).collect();
        info!(task_order = ?order, "Tasks sorted by dependencies");
    }

    Ok(sorted)
}
