//! 服务解析模块
//!
//! 把逻辑服务名解析为可拨号的 `host:port` 列表：先查限时缓存，未命中时回源
//! 到发现后端，最后交给可插拔的均衡器排序。

pub mod balancer;
pub mod cache;

use std::sync::Arc;
use std::time::Duration;

use beacon_core_base::{Context, DiscoveryError, Result};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::discovery::{Discovery, EventHandler};

pub use balancer::{BalanceStrategy, Balancer, RandomBalancer, RoundRobinBalancer};
pub use cache::ResolverCache;

/// 默认缓存有效期
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// 服务解析器
///
/// 与具体后端无关，均衡器可插拔。缓存命中永不失败；回源时的错误
/// （包括 `NotFound` 和上下文取消）原样返回，不会被替换成空列表。
pub struct Resolver {
    discovery: Arc<dyn Discovery>,
    cache: Arc<ResolverCache>,
    balancer: Option<Arc<dyn Balancer<String>>>,
}

impl Resolver {
    /// 创建解析器（默认 TTL，不做均衡）
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self {
            discovery,
            cache: Arc::new(ResolverCache::new(DEFAULT_CACHE_TTL)),
            balancer: None,
        }
    }

    /// 从配置创建解析器
    pub fn from_config(discovery: Arc<dyn Discovery>, config: &ResolverConfig) -> Self {
        let resolver = Self::new(discovery).with_cache_ttl(config.cache_ttl());
        match config.balancer.build() {
            Some(balancer) => resolver.with_balancer(balancer),
            None => resolver,
        }
    }

    /// 设置均衡器
    pub fn with_balancer(mut self, balancer: Arc<dyn Balancer<String>>) -> Self {
        self.balancer = Some(balancer);
        self
    }

    /// 设置缓存有效期（会丢弃已有缓存）
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Arc::new(ResolverCache::new(ttl));
        self
    }

    /// 使用外部共享的缓存
    ///
    /// 先创建缓存并把 [`ResolverCache::invalidation_handler`] 订阅到后端，
    /// 再把后端放入 `Arc` 构建解析器。
    pub fn with_cache(mut self, cache: Arc<ResolverCache>) -> Self {
        self.cache = cache;
        self
    }

    /// 解析缓存
    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// 使某个服务的缓存失效
    pub fn invalidate(&self, service_name: &str) -> bool {
        self.cache.invalidate(service_name)
    }

    /// 解析服务地址
    ///
    /// # 参数
    /// * `ctx` - 执行上下文，回源时传递给后端
    /// * `service_name` - 逻辑服务名
    ///
    /// # 返回
    /// `host:port` 列表；配置了均衡器时，每次调用（包括缓存命中）都会经过均衡器
    pub async fn lookup_services(&self, ctx: &Context, service_name: &str) -> Result<Vec<String>> {
        let addrs = match self.cache.get(service_name) {
            Some(addrs) => {
                debug!(service = %service_name, "Resolver cache hit");
                addrs
            }
            None => {
                debug!(service = %service_name, "Resolver cache miss, querying discovery backend");
                let addrs = self.query_backend(ctx, service_name).await?;
                self.cache.insert(service_name, addrs.clone());
                debug!(service = %service_name, addrs = ?addrs, "Resolver cache updated");
                addrs
            }
        };

        Ok(match &self.balancer {
            Some(balancer) => balancer.balance(service_name, &addrs),
            None => addrs,
        })
    }

    async fn query_backend(&self, ctx: &Context, service_name: &str) -> Result<Vec<String>> {
        let result = tokio::select! {
            biased;
            _ = ctx.done() => Err(ctx.check().err().unwrap_or(DiscoveryError::Cancelled)),
            result = self.discovery.service_by_name(ctx, service_name) => result,
        };

        match result {
            Ok(info) => Ok(info.addrs()),
            Err(e) => {
                warn!(
                    service = %service_name,
                    backend = %self.discovery.name(),
                    error = %e,
                    "Failed to resolve service"
                );
                Err(e)
            }
        }
    }

    /// 创建绑定到本解析器缓存的失效处理器
    pub fn invalidation_handler(&self) -> EventHandler {
        ResolverCache::invalidation_handler(&self.cache)
    }
}
