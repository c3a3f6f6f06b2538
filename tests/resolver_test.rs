//! 服务解析器测试

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::discovery::{Discovery, EventType, FakeDiscovery};
use beacon_core::resolver::{DEFAULT_CACHE_TTL, Resolver, ResolverCache, RoundRobinBalancer};
use beacon_core::{
    BalanceStrategy, Context, DiscoveryError, ResolverConfig, Result, ServiceInfo,
    ServiceInstanceInfo,
};
use tokio::sync::Mutex;
use tokio_test::{assert_err, assert_ok};

/// 统计调用次数的后端桩
#[derive(Default)]
struct CountingDiscovery {
    services: Mutex<Vec<ServiceInfo>>,
    failure: Mutex<Option<DiscoveryError>>,
    calls: AtomicUsize,
}

impl CountingDiscovery {
    fn with_service(info: ServiceInfo) -> Self {
        Self {
            services: Mutex::new(vec![info]),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn set_service(&self, info: ServiceInfo) {
        let mut services = self.services.lock().await;
        services.retain(|s| s.name != info.name);
        services.push(info);
    }

    async fn fail_with(&self, err: Option<DiscoveryError>) {
        *self.failure.lock().await = err;
    }
}

#[async_trait]
impl Discovery for CountingDiscovery {
    async fn services(&self, ctx: &Context) -> Result<Vec<ServiceInfo>> {
        ctx.check()?;
        Ok(self.services.lock().await.clone())
    }

    async fn service_by_name(&self, ctx: &Context, name: &str) -> Result<ServiceInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.check()?;
        if let Some(err) = self.failure.lock().await.clone() {
            return Err(err);
        }
        self.services
            .lock()
            .await
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| DiscoveryError::not_found(name))
    }

    async fn run(&self, ctx: Context) -> Result<()> {
        ctx.done().await;
        Ok(())
    }
}

/// 永不返回的后端，用于验证取消传播
struct HangingDiscovery;

#[async_trait]
impl Discovery for HangingDiscovery {
    async fn services(&self, _ctx: &Context) -> Result<Vec<ServiceInfo>> {
        std::future::pending().await
    }

    async fn service_by_name(&self, _ctx: &Context, _name: &str) -> Result<ServiceInfo> {
        std::future::pending().await
    }

    async fn run(&self, _ctx: Context) -> Result<()> {
        Ok(())
    }
}

fn svc(addrs: &[&str]) -> ServiceInfo {
    let instances = addrs
        .iter()
        .enumerate()
        .map(|(i, ip)| ServiceInstanceInfo::new("svc", format!("svc-{i}"), *ip, 8080))
        .collect();
    ServiceInfo::new("svc", instances)
}

#[tokio::test]
async fn second_lookup_within_ttl_is_served_from_cache() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1", "10.0.0.2"])));
    let resolver = Resolver::new(backend.clone());
    let ctx = Context::background();

    let expected = vec!["10.0.0.1:8080".to_string(), "10.0.0.2:8080".to_string()];
    assert_eq!(assert_ok!(resolver.lookup_services(&ctx, "svc").await), expected);
    assert_eq!(assert_ok!(resolver.lookup_services(&ctx, "svc").await), expected);
    assert_eq!(backend.calls(), 1);
    assert_eq!(resolver.cache().ttl(), DEFAULT_CACHE_TTL);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_triggers_backend_requery() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1"])));
    let resolver = Resolver::new(backend.clone()).with_cache_ttl(Duration::from_secs(60));
    let ctx = Context::background();

    assert_ok!(resolver.lookup_services(&ctx, "svc").await);
    backend.set_service(svc(&["10.0.0.9"])).await;

    tokio::time::advance(Duration::from_secs(59)).await;
    assert_eq!(
        assert_ok!(resolver.lookup_services(&ctx, "svc").await),
        vec!["10.0.0.1:8080".to_string()]
    );
    assert_eq!(backend.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(
        assert_ok!(resolver.lookup_services(&ctx, "svc").await),
        vec!["10.0.0.9:8080".to_string()]
    );
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn empty_cached_list_forces_requery() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1"])));
    let resolver = Resolver::new(backend.clone());
    resolver.cache().insert("svc", Vec::new());

    let addrs = assert_ok!(resolver.lookup_services(&Context::background(), "svc").await);
    assert_eq!(addrs, vec!["10.0.0.1:8080".to_string()]);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn empty_backend_result_is_not_reused() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&[])));
    let resolver = Resolver::new(backend.clone());
    let ctx = Context::background();

    assert!(assert_ok!(resolver.lookup_services(&ctx, "svc").await).is_empty());
    assert!(assert_ok!(resolver.lookup_services(&ctx, "svc").await).is_empty());
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn not_found_is_propagated_and_not_cached() {
    let backend = Arc::new(CountingDiscovery::default());
    let resolver = Resolver::new(backend.clone());
    let ctx = Context::background();

    let err = assert_err!(resolver.lookup_services(&ctx, "ghost").await);
    assert!(err.is_not_found());
    assert!(resolver.cache().is_empty());

    assert_err!(resolver.lookup_services(&ctx, "ghost").await);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn backend_errors_surface_unchanged_but_cache_hits_never_fail() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1"])));
    let resolver = Resolver::new(backend.clone());
    let ctx = Context::background();

    assert_ok!(resolver.lookup_services(&ctx, "svc").await);
    backend.fail_with(Some(DiscoveryError::backend("connection refused"))).await;

    // 命中缓存，不受后端故障影响
    assert_ok!(resolver.lookup_services(&ctx, "svc").await);

    resolver.invalidate("svc");
    let err = assert_err!(resolver.lookup_services(&ctx, "svc").await);
    assert_eq!(err, DiscoveryError::backend("connection refused"));
}

#[tokio::test]
async fn cancellation_is_not_swallowed() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1"])));
    let resolver = Resolver::new(backend.clone());

    let ctx = Context::background();
    ctx.cancel();
    let err = assert_err!(resolver.lookup_services(&ctx, "svc").await);
    assert_eq!(err, DiscoveryError::Cancelled);
    assert!(resolver.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_a_hanging_backend() {
    let resolver = Resolver::new(Arc::new(HangingDiscovery));
    let ctx = Context::with_timeout(Duration::from_millis(100));

    let err = assert_err!(resolver.lookup_services(&ctx, "svc").await);
    assert_eq!(err, DiscoveryError::DeadlineExceeded);
}

#[tokio::test]
async fn balancer_is_applied_on_every_call_including_cache_hits() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["a", "b", "c"])));
    let resolver = Resolver::new(backend.clone()).with_balancer(Arc::new(RoundRobinBalancer::new()));
    let ctx = Context::background();

    let mut firsts = Vec::new();
    for _ in 0..4 {
        let addrs = assert_ok!(resolver.lookup_services(&ctx, "svc").await);
        assert_eq!(addrs.len(), 3);
        firsts.push(addrs[0].clone());
    }
    assert_eq!(firsts, vec!["b:8080", "c:8080", "a:8080", "b:8080"]);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn resolver_from_config_uses_ttl_and_strategy() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1", "10.0.0.2"])));
    let config = ResolverConfig {
        cache_ttl_secs: 30,
        balancer: BalanceStrategy::None,
    };
    let resolver = Resolver::from_config(backend, &config);
    assert_eq!(resolver.cache().ttl(), Duration::from_secs(30));

    let ctx = Context::background();
    for _ in 0..3 {
        assert_eq!(
            assert_ok!(resolver.lookup_services(&ctx, "svc").await),
            vec!["10.0.0.1:8080".to_string(), "10.0.0.2:8080".to_string()]
        );
    }
}

#[tokio::test]
async fn invalidation_handler_drops_entries_on_down_and_removal() {
    let cache = Arc::new(ResolverCache::new(DEFAULT_CACHE_TTL));
    let mut discovery = FakeDiscovery::default();
    discovery.subscribe([ResolverCache::invalidation_handler(&cache)]);
    let discovery = Arc::new(discovery);
    let resolver = Resolver::new(discovery.clone()).with_cache(cache);
    let ctx = Context::background();

    discovery
        .add_service(ServiceInfo::new(
            "svc",
            vec![ServiceInstanceInfo::new("svc", "svc-1", "10.0.0.1", 8080)],
        ))
        .await;
    assert_ok!(resolver.lookup_services(&ctx, "svc").await);
    assert_eq!(resolver.cache().len(), 1);

    assert_ok!(discovery.set_instance_health("svc", "svc-1", false).await);
    assert!(resolver.cache().is_empty());

    assert_ok!(resolver.lookup_services(&ctx, "svc").await);
    assert_ok!(discovery.remove_service("svc").await);
    assert!(resolver.cache().is_empty());
    assert!(assert_err!(resolver.lookup_services(&ctx, "svc").await).is_not_found());
}

#[tokio::test]
async fn resolver_bound_handler_ignores_other_events() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1"])));
    let resolver = Resolver::new(backend.clone());
    let ctx = Context::background();
    assert_ok!(resolver.lookup_services(&ctx, "svc").await);

    let handler = resolver.invalidation_handler();
    let inst = ServiceInstanceInfo::new("svc", "svc-0", "10.0.0.1", 8080);
    assert!(!handler.event_types().contains(&EventType::Up));
    assert!(handler.handle(&ctx, EventType::Down, &inst));
    assert!(resolver.cache().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lookups_share_one_cache() {
    let backend = Arc::new(CountingDiscovery::with_service(svc(&["10.0.0.1", "10.0.0.2"])));
    let resolver = Arc::new(Resolver::new(backend.clone()));

    let lookups = (0..32).map(|_| {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.lookup_services(&Context::background(), "svc").await })
    });
    for result in futures::future::join_all(lookups).await {
        let addrs = result.unwrap().unwrap();
        assert_eq!(addrs, vec!["10.0.0.1:8080".to_string(), "10.0.0.2:8080".to_string()]);
    }

    // 并发未命中允许重复回源，但缓存最终只有一个条目
    assert!(backend.calls() >= 1);
    assert_eq!(resolver.cache().len(), 1);
}
