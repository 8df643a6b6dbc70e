//! 日志初始化
//!
//! `RUST_LOG` 优先；未设置时使用 `info`（详细模式为 `debug`）

use tracing_subscriber::EnvFilter;

/// 初始化日志（重复调用无副作用）
pub fn init() {
    init_with_level("info");
}

/// 初始化详细日志
pub fn init_verbose() {
    init_with_level("debug");
}

fn init_with_level(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
