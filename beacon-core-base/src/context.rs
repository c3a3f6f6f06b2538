//! 执行上下文
//!
//! 在后端调用、过滤器和事件回调之间传递取消信号、截止时间和少量键值。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{DiscoveryError, Result};

/// 全局请求 ID 计数器
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// 可取消、可设置截止时间的执行上下文
///
/// 克隆得到的上下文共享同一个取消令牌；需要独立取消时使用 [`Context::child`]。
#[derive(Debug, Clone)]
pub struct Context {
    request_id: u64,
    deadline: Option<Instant>,
    token: CancellationToken,
    values: HashMap<String, String>,
}

impl Context {
    /// 创建根上下文（无截止时间，不会自行取消）
    pub fn background() -> Self {
        Self {
            request_id: next_request_id(),
            deadline: None,
            token: CancellationToken::new(),
            values: HashMap::new(),
        }
    }

    /// 创建从现在起 `timeout` 后到期的上下文
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// 创建带绝对截止时间的上下文
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::background()
        }
    }

    /// 派生子上下文
    ///
    /// 取消父上下文会同时取消子上下文，反之不会。
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id,
            deadline: self.deadline,
            token: self.token.child_token(),
            values: self.values.clone(),
        }
    }

    /// 派生一个截止时间不晚于 `timeout` 的子上下文
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let mut child = self.child();
        child.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        child
    }

    /// 附加一个键值
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// 读取键值
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 底层取消令牌
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// 取消此上下文及其所有子上下文
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 检查上下文是否仍然有效
    ///
    /// 取消优先于超时报告。
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(DiscoveryError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// 等待上下文结束（被取消或到达截止时间）
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
