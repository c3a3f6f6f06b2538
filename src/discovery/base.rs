//! 事件分发器
//!
//! 每个发现后端实例持有一个 [`BaseDiscovery`]，负责订阅登记和同步扇出。
//! 订阅需要 `&mut self`，因此所有订阅必须在后端被共享（放入 `Arc`）
//! 并开始触发事件之前完成；分发表在触发期间只读，无需加锁。

use std::sync::Arc;

use beacon_core_base::{Context, ServiceInstanceInfo};
use tracing::{debug, trace};

use crate::discovery::event::{EventHandler, EventType};

/// 事件分发器
#[derive(Debug, Default)]
pub struct BaseDiscovery {
    handlers: [Vec<Arc<EventHandler>>; EventType::COUNT],
    local: ServiceInstanceInfo,
}

impl BaseDiscovery {
    /// 创建分发器
    ///
    /// # 参数
    /// * `local` - 本地服务实例信息
    pub fn new(local: ServiceInstanceInfo) -> Self {
        Self {
            handlers: Default::default(),
            local,
        }
    }

    /// 订阅事件处理器
    ///
    /// 每个处理器登记到它声明的所有事件类型下；未声明任何事件类型的处理器
    /// 不会收到任何事件。传入 `None` 是空操作。
    pub fn subscribe<I>(&mut self, handlers: I)
    where
        I: IntoIterator<Item = EventHandler>,
    {
        for handler in handlers {
            self.subscribe_shared(Arc::new(handler));
        }
    }

    /// 订阅一个共享的事件处理器
    ///
    /// 同一个处理器可以跨多个分发器共享，一次性语义在所有分发器间生效。
    pub fn subscribe_shared(&mut self, handler: Arc<EventHandler>) {
        if handler.event_types().is_empty() {
            debug!(handler = %handler.name(), "Handler declares no event types, it will never fire");
            return;
        }
        for event_type in handler.event_types() {
            self.handlers[event_type.index()].push(handler.clone());
        }
        debug!(
            handler = %handler.name(),
            events = ?handler.event_types(),
            once = handler.is_once(),
            "Handler subscribed"
        );
    }

    /// 触发事件（使用后台上下文）
    pub fn trigger_event(&self, event_type: EventType, instance: &ServiceInstanceInfo) -> usize {
        self.trigger_event_with_context(&Context::background(), event_type, instance)
    }

    /// 触发事件
    ///
    /// 按订阅顺序同步调用监听该事件类型的处理器，返回实际执行的回调数量。
    /// 回调运行在调用方上下文中，长耗时工作应由回调自行转移。
    pub fn trigger_event_with_context(
        &self,
        ctx: &Context,
        event_type: EventType,
        instance: &ServiceInstanceInfo,
    ) -> usize {
        let mut invoked = 0;
        for handler in &self.handlers[event_type.index()] {
            if handler.handle(ctx, event_type, instance) {
                invoked += 1;
            } else {
                trace!(
                    handler = %handler.name(),
                    event = %event_type,
                    instance_id = %instance.id,
                    "Handler skipped"
                );
            }
        }
        debug!(
            event = %event_type,
            service = %instance.service_name,
            instance_id = %instance.id,
            invoked,
            "Event dispatched"
        );
        invoked
    }

    /// 设置本地实例元数据
    ///
    /// 只能在后端运行循环启动之前调用。
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.local.metadata.insert(key.into(), value.into());
    }

    /// 本地实例信息
    pub fn local_instance(&self) -> &ServiceInstanceInfo {
        &self.local
    }

    /// 某事件类型下登记的处理器数量
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers[event_type.index()].len()
    }
}
