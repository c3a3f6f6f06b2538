//! Beacon Core Base
//!
//! 服务发现各层共享的基础类型：服务实例值对象、执行上下文和错误类型。

pub mod context;
pub mod error;
pub mod types;

pub use context::Context;
pub use error::{DiscoveryError, Result};
pub use types::{ServiceInfo, ServiceInstanceInfo};
