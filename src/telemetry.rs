//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 日志初始化
//!
//! 库本身只通过 `tracing` 宏输出事件，是否安装订阅者由应用决定。
//! 这里提供的函数方便应用和测试快速接入控制台日志。

use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 默认日志级别
pub const DEFAULT_FILTER: &str = "info";

/// 安装控制台日志订阅者
///
/// 过滤规则优先读取 `RUST_LOG`，未设置时使用 `info`。
/// 多次调用只有第一次生效；已有全局订阅者时静默跳过
pub fn setup_logging() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        install(filter);
    });
}

/// 使用指定的过滤规则安装订阅者，例如 `"oxfetch=debug"`
pub fn init_tracing(filter: &str) {
    INIT.call_once(|| install(EnvFilter::new(filter)));
}

fn install(filter: EnvFilter) {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(filter)
        .try_init()
        .ok();
}
