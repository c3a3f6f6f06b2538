//! 解析结果缓存
//!
//! `service name -> (addresses, expiry)` 的限时缓存。过期采用读时惰性淘汰，
//! 没有后台清扫任务；需要时可由调用方显式调用 [`ResolverCache::purge_expired`]。

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::discovery::{EventHandler, EventType};

#[derive(Debug, Clone)]
struct CacheEntry {
    addrs: Vec<String>,
    expires_at: Instant,
}

/// 解析结果缓存
#[derive(Debug)]
pub struct ResolverCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResolverCache {
    /// 创建缓存
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 读取可用的缓存条目
    ///
    /// 条目过期或地址列表为空都视为未命中；过期条目会被顺带移除。
    pub fn get(&self, service_name: &str) -> Option<Vec<String>> {
        let now = Instant::now();
        match self.entries.get(service_name) {
            Some(entry) if now < entry.expires_at => {
                return (!entry.addrs.is_empty()).then(|| entry.addrs.clone());
            }
            Some(_) => {}
            None => return None,
        }
        self.entries
            .remove_if(service_name, |_, entry| now >= entry.expires_at);
        None
    }

    /// 写入缓存，有效期为 TTL
    pub fn insert(&self, service_name: impl Into<String>, addrs: Vec<String>) {
        let entry = CacheEntry {
            addrs,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(service_name.into(), entry);
    }

    /// 使某个服务的缓存失效
    pub fn invalidate(&self, service_name: &str) -> bool {
        self.entries.remove(service_name).is_some()
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// 移除所有过期条目，返回移除数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }

    /// 条目数量（包含尚未淘汰的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 创建缓存失效处理器
    ///
    /// 监听 `Down` 与 `Removed`，丢弃受影响服务的缓存条目。
    /// 需要在后端被共享之前订阅到它的分发器上。
    pub fn invalidation_handler(cache: &Arc<ResolverCache>) -> EventHandler {
        let cache = cache.clone();
        EventHandler::new(move |_ctx, event, instance| {
            if cache.invalidate(&instance.service_name) {
                debug!(
                    service = %instance.service_name,
                    event = %event,
                    instance_id = %instance.id,
                    "Resolver cache invalidated"
                );
            }
        })
        .with_name("resolver-cache-invalidation")
        .on_events([EventType::Down, EventType::Removed])
    }
}
