//! 内存服务发现后端
//!
//! 并发安全的可变服务目录，既用作测试替身，也是一个最小可用的自包含后端。
//! 它同时演示了后端必须遵守的事件发送约定：实例只有在完整写入目录之后
//! 才会通知给订阅者。

use std::collections::HashMap;

use async_trait::async_trait;
use beacon_core_base::{Context, DiscoveryError, Result, ServiceInfo, ServiceInstanceInfo};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::discovery::{BaseDiscovery, Discovery, EventHandler, EventType};

/// 内存服务发现后端
#[derive(Debug, Default)]
pub struct FakeDiscovery {
    base: BaseDiscovery,
    services: RwLock<HashMap<String, ServiceInfo>>,
}

impl FakeDiscovery {
    /// 创建内存后端
    ///
    /// # 参数
    /// * `local` - 本地服务实例信息
    pub fn new(local: ServiceInstanceInfo) -> Self {
        Self {
            base: BaseDiscovery::new(local),
            services: RwLock::new(HashMap::new()),
        }
    }

    /// 订阅事件处理器，必须在后端被共享之前调用
    pub fn subscribe<I>(&mut self, handlers: I)
    where
        I: IntoIterator<Item = EventHandler>,
    {
        self.base.subscribe(handlers);
    }

    /// 设置本地实例元数据，必须在运行循环启动之前调用
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.base.set_metadata(key, value);
    }

    /// 事件分发器
    pub fn base(&self) -> &BaseDiscovery {
        &self.base
    }

    /// 本地实例信息
    pub fn local_instance(&self) -> &ServiceInstanceInfo {
        self.base.local_instance()
    }

    /// 新增或替换服务
    ///
    /// 目录更新完成后，按实例顺序为每个实例依次触发 `Discovered`、`Up`。
    /// 实例未填写服务名时使用 `info.name`。
    pub async fn add_service(&self, mut info: ServiceInfo) {
        for instance in &mut info.instances {
            if instance.service_name.is_empty() {
                instance.service_name = info.name.clone();
            }
        }
        let name = info.name.clone();
        let instances = info.instances.clone();

        {
            let mut services = self.services.write().await;
            services.insert(name.clone(), info);
        }

        info!(
            service = %name,
            instances = instances.len(),
            "Service added to in-memory catalog"
        );

        let ctx = Context::background();
        for instance in &instances {
            self.base
                .trigger_event_with_context(&ctx, EventType::Discovered, instance);
            self.base.trigger_event_with_context(&ctx, EventType::Up, instance);
        }
    }

    /// 移除服务
    ///
    /// 目录更新完成后，为每个原有实例依次触发 `Down`、`Removed`。
    pub async fn remove_service(&self, name: &str) -> Result<ServiceInfo> {
        let removed = {
            let mut services = self.services.write().await;
            services.remove(name)
        }
        .ok_or_else(|| DiscoveryError::not_found(name))?;

        info!(
            service = %name,
            instances = removed.instances.len(),
            "Service removed from in-memory catalog"
        );

        let ctx = Context::background();
        for instance in &removed.instances {
            self.base.trigger_event_with_context(&ctx, EventType::Down, instance);
            self.base
                .trigger_event_with_context(&ctx, EventType::Removed, instance);
        }
        Ok(removed)
    }

    /// 更新实例健康状态
    ///
    /// 供健康检查组件调用：状态实际发生变化时触发 `Up` 或 `Down`，
    /// 返回是否发生了变化。
    pub async fn set_instance_health(
        &self,
        service: &str,
        instance_id: &str,
        healthy: bool,
    ) -> Result<bool> {
        let updated = {
            let mut services = self.services.write().await;
            let info = services
                .get_mut(service)
                .ok_or_else(|| DiscoveryError::not_found(service))?;
            let instance = info
                .instances
                .iter_mut()
                .find(|inst| inst.id == instance_id)
                .ok_or_else(|| DiscoveryError::not_found(format!("{service}/{instance_id}")))?;
            if instance.healthy == healthy {
                None
            } else {
                instance.healthy = healthy;
                Some(instance.clone())
            }
        };

        let Some(instance) = updated else {
            return Ok(false);
        };

        debug!(
            service = %service,
            instance_id = %instance_id,
            healthy,
            "Instance health changed"
        );
        let event_type = if healthy { EventType::Up } else { EventType::Down };
        self.base.trigger_event(event_type, &instance);
        Ok(true)
    }
}

#[async_trait]
impl Discovery for FakeDiscovery {
    fn name(&self) -> &str {
        "in-memory"
    }

    /// 按服务名排序返回，保证迭代顺序确定
    async fn services(&self, ctx: &Context) -> Result<Vec<ServiceInfo>> {
        ctx.check()?;
        let services = self.services.read().await;
        let mut list: Vec<ServiceInfo> = services.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn service_by_name(&self, ctx: &Context, name: &str) -> Result<ServiceInfo> {
        ctx.check()?;
        let services = self.services.read().await;
        services
            .get(name)
            .cloned()
            .ok_or_else(|| DiscoveryError::not_found(name))
    }

    async fn run(&self, ctx: Context) -> Result<()> {
        info!(
            local = %self.local_instance().addr(),
            "In-memory discovery started"
        );
        ctx.done().await;
        info!("In-memory discovery stopped");
        Ok(())
    }
}
