//! 日志初始化
//!
//! 控制器各层只通过 `tracing` 宏输出日志，本身从不安装 subscriber。
//! 应用程序在入口处调用一次 [`init_logger!`](crate::init_logger) 即可：
//!
//! - 默认级别 `info`，`RUST_LOG` 环境变量优先
//! - 通过 `tracing-log` 桥接 `log` crate 的记录（如 `socketcan` 内部日志）
//! - 重复调用是无害的，只有第一次生效

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 默认日志级别
pub const DEFAULT_DIRECTIVE: &str = "info";

/// 按 `RUST_LOG`（缺省为 `info`）初始化全局日志
pub fn init_logging() {
    init_logging_with_default(DEFAULT_DIRECTIVE);
}

/// 按 `RUST_LOG`（缺省为 `default_directive`）初始化全局日志
pub fn init_logging_with_default(default_directive: &str) {
    INIT.call_once(|| {
        let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), default_directive);

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .finish();

        if tracing::subscriber::set_global_default(subscriber).is_err() {
            // 宿主程序已经装好了自己的 subscriber
            return;
        }
        let _ = tracing_log::LogTracer::init();
    });
}

/// 解析过滤指令：`env` 非空且合法时使用它，否则回退到 `default_directive`
pub fn build_filter(env: Option<&str>, default_directive: &str) -> EnvFilter {
    env.filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive))
}

/// 初始化日志
///
/// ```rust
/// hostcan::init_logger!();
/// hostcan::init_logger!("hostcan_driver=debug");
/// ```
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::logging::init_logging()
    };
    ($default:expr) => {
        $crate::logging::init_logging_with_default($default)
    };
}
