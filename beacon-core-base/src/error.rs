//! 服务发现与解析层的统一错误类型
//!
//! 调用方唯一需要特殊处理的错误是 [`DiscoveryError::NotFound`]，
//! 其余后端/传输错误原样向上传播，本层从不重试，也从不降级为空结果。

use thiserror::Error;

/// 服务发现统一错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// 服务在后端当前视图中不存在
    #[error("service not found: {service}")]
    NotFound { service: String },

    /// 执行上下文已被取消
    #[error("context cancelled")]
    Cancelled,

    /// 执行上下文已超过截止时间
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// 后端或传输层错误
    #[error("discovery backend error: {0}")]
    Backend(String),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

impl DiscoveryError {
    /// 创建服务不存在错误
    pub fn not_found(service: impl Into<String>) -> Self {
        DiscoveryError::NotFound {
            service: service.into(),
        }
    }

    /// 创建后端错误
    pub fn backend(msg: impl Into<String>) -> Self {
        DiscoveryError::Backend(msg.into())
    }

    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        DiscoveryError::Config(msg.into())
    }

    /// 是否为服务不存在错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, DiscoveryError::NotFound { .. })
    }

    /// 是否由上下文取消或超时引起
    pub fn is_context_error(&self) -> bool {
        matches!(
            self,
            DiscoveryError::Cancelled | DiscoveryError::DeadlineExceeded
        )
    }
}

/// 服务发现结果类型
pub type Result<T> = std::result::Result<T, DiscoveryError>;
