//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 安装全局 fmt 订阅器
///
/// `RUST_LOG` 优先于 `default_directive`。重复调用是安全的，
/// 返回本次调用是否真正完成了安装。
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// 安装输出到测试捕获的订阅器
pub fn init_for_tests() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("beacon_core=debug"))
        .with_test_writer()
        .try_init()
        .is_ok()
}
