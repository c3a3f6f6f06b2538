//! 生命周期事件类型与事件处理器

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use beacon_core_base::{Context, ServiceInstanceInfo};

/// 实例生命周期事件类型
///
/// 集合是封闭的，分发表按 [`EventType::COUNT`] 定长分配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// 实例被发现
    Discovered,
    /// 实例可达
    Up,
    /// 实例不可达
    Down,
    /// 实例从目录中移除
    Removed,
}

impl EventType {
    /// 事件类型数量（用于分发表大小）
    pub const COUNT: usize = 4;

    /// 全部事件类型，顺序与 [`EventType::index`] 一致
    pub const ALL: [EventType; Self::COUNT] = [
        EventType::Discovered,
        EventType::Up,
        EventType::Down,
        EventType::Removed,
    ];

    /// 在分发表中的下标
    pub const fn index(self) -> usize {
        match self {
            EventType::Discovered => 0,
            EventType::Up => 1,
            EventType::Down => 2,
            EventType::Removed => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Discovered => "discovered",
            EventType::Up => "up",
            EventType::Down => "down",
            EventType::Removed => "removed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 事件过滤器：所有过滤器都通过时回调才会执行
pub type Filter = Arc<dyn Fn(&Context, &ServiceInstanceInfo) -> bool + Send + Sync>;

/// 事件回调
pub type Callback = Arc<dyn Fn(&Context, EventType, &ServiceInstanceInfo) + Send + Sync>;

/// 事件处理器
///
/// 在订阅之前通过 `on` / `with_filter` / `once` 完成配置；
/// 订阅后由分发器持有，不再修改。
///
/// # 示例
/// ```rust
/// use beacon_core::discovery::{EventHandler, EventType, filter};
///
/// let handler = EventHandler::new(|_ctx, event, inst| {
///     println!("{event}: {}", inst.addr());
/// })
/// .on(EventType::Up)
/// .with_filter(filter::by_service("orders"))
/// .once();
/// assert!(handler.is_once());
/// ```
pub struct EventHandler {
    name: String,
    event_types: Vec<EventType>,
    filters: Vec<Filter>,
    callback: Callback,
    once: bool,
    fired: AtomicBool,
}

impl EventHandler {
    /// 创建事件处理器
    ///
    /// 新建的处理器不监听任何事件，需要通过 [`EventHandler::on`] 显式声明。
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Context, EventType, &ServiceInstanceInfo) + Send + Sync + 'static,
    {
        Self {
            name: "anonymous".to_string(),
            event_types: Vec::new(),
            filters: Vec::new(),
            callback: Arc::new(callback),
            once: false,
            fired: AtomicBool::new(false),
        }
    }

    /// 设置名称（用于日志）
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 监听一个事件类型
    pub fn on(mut self, event_type: EventType) -> Self {
        if !self.event_types.contains(&event_type) {
            self.event_types.push(event_type);
        }
        self
    }

    /// 监听多个事件类型
    pub fn on_events(self, event_types: impl IntoIterator<Item = EventType>) -> Self {
        event_types.into_iter().fold(self, EventHandler::on)
    }

    /// 追加过滤器
    ///
    /// 过滤器按添加顺序求值，遇到第一个失败即短路，开销大的过滤器应放在最后。
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Context, &ServiceInstanceInfo) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// 回调最多执行一次
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn event_types(&self) -> &[EventType] {
        &self.event_types
    }

    pub fn is_once(&self) -> bool {
        self.once
    }

    /// 一次性处理器是否已经触发过
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// 是否通过全部过滤器
    pub fn matches(&self, ctx: &Context, instance: &ServiceInstanceInfo) -> bool {
        self.filters.iter().all(|filter| filter(ctx, instance))
    }

    /// 处理一个事件，返回回调是否被执行
    ///
    /// 一次性处理器使用原子 test-and-set，并发触发下回调也只会执行一次。
    pub fn handle(&self, ctx: &Context, event_type: EventType, instance: &ServiceInstanceInfo) -> bool {
        if !self.matches(ctx, instance) {
            return false;
        }
        if self.once
            && self
                .fired
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return false;
        }
        (self.callback)(ctx, event_type, instance);
        true
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("name", &self.name)
            .field("event_types", &self.event_types)
            .field("filters", &self.filters.len())
            .field("once", &self.once)
            .field("fired", &self.has_fired())
            .finish()
    }
}
