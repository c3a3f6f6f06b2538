//! 常用事件过滤器

use beacon_core_base::{Context, ServiceInstanceInfo};

/// 只接受指定服务的实例
pub fn by_service(
    service_name: &str,
) -> impl Fn(&Context, &ServiceInstanceInfo) -> bool + Send + Sync + use<> {
    let service_name = service_name.to_string();
    move |_ctx, instance| instance.service_name == service_name
}

/// 只接受健康实例
pub fn healthy() -> impl Fn(&Context, &ServiceInstanceInfo) -> bool + Send + Sync {
    |_ctx, instance| instance.healthy
}

/// 只接受元数据中 `key` 等于 `value` 的实例
pub fn by_metadata(
    key: &str,
    value: &str,
) -> impl Fn(&Context, &ServiceInstanceInfo) -> bool + Send + Sync + use<> {
    let key = key.to_string();
    let value = value.to_string();
    move |_ctx, instance| instance.metadata.get(&key).is_some_and(|v| *v == value)
}
