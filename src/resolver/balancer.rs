//! 负载均衡模块
//!
//! 均衡器对解析得到的地址列表重新排序，调用方总是取第一个地址即可自然地在实例间轮转。

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 负载均衡器 trait
pub trait Balancer<T>: Send + Sync {
    /// 返回重新排序后的地址列表
    ///
    /// # 参数
    /// * `service_cluster` - 服务名
    /// * `addrs` - 候选地址
    fn balance(&self, service_cluster: &str, addrs: &[T]) -> Vec<T>;
}

/// 将 `addrs` 旋转为以 `start` 开头的新列表，保持其余元素相对顺序
fn rotate<T: Clone>(addrs: &[T], start: usize) -> Vec<T> {
    let mut rotated = Vec::with_capacity(addrs.len());
    rotated.extend_from_slice(&addrs[start..]);
    rotated.extend_from_slice(&addrs[..start]);
    rotated
}

/// 轮询均衡器
///
/// 每个均衡器实例只有一个计数器，不按服务区分：共享同一实例的不同服务
/// 会交替推进同一个计数器。
#[derive(Debug, Default)]
pub struct RoundRobinBalancer {
    counter: AtomicU64,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Clone> Balancer<T> for RoundRobinBalancer {
    fn balance(&self, _service_cluster: &str, addrs: &[T]) -> Vec<T> {
        if addrs.is_empty() {
            return Vec::new();
        }
        let next = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let start = (next % addrs.len() as u64) as usize;
        rotate(addrs, start)
    }
}

/// 随机均衡器
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomBalancer;

impl<T: Clone> Balancer<T> for RandomBalancer {
    fn balance(&self, _service_cluster: &str, addrs: &[T]) -> Vec<T> {
        if addrs.is_empty() {
            return Vec::new();
        }
        let start = rand::thread_rng().gen_range(0..addrs.len());
        rotate(addrs, start)
    }
}

/// 负载均衡策略
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStrategy {
    /// 轮询
    #[default]
    RoundRobin,
    /// 随机
    Random,
    /// 不做均衡，保持后端返回顺序
    None,
}

impl BalanceStrategy {
    /// 构建对应的均衡器
    pub fn build(self) -> Option<Arc<dyn Balancer<String>>> {
        match self {
            BalanceStrategy::RoundRobin => Some(Arc::new(RoundRobinBalancer::new())),
            BalanceStrategy::Random => Some(Arc::new(RandomBalancer)),
            BalanceStrategy::None => None,
        }
    }
}

impl FromStr for BalanceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round_robin" | "roundrobin" | "rr" => Ok(BalanceStrategy::RoundRobin),
            "random" => Ok(BalanceStrategy::Random),
            "none" | "" => Ok(BalanceStrategy::None),
            _ => Err(format!("Unknown balance strategy: {}", s)),
        }
    }
}
