//! 控制器配置

use std::time::Duration;

/// 控制器配置
///
/// # Example
///
/// ```
/// use hostcan_driver::ControllerConfig;
/// use std::time::Duration;
///
/// let config = ControllerConfig::default();
/// assert_eq!(config.max_filters, 32);
/// assert_eq!(config.poll_interval(), Duration::from_millis(1));
/// assert_eq!(config.confirm_timeout(), Some(Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// 过滤器表容量
    pub max_filters: usize,
    /// 接收分发线程无数据时的休眠间隔（微秒）
    pub poll_interval_us: u64,
    /// 同步发送等待确认的上限（毫秒）
    ///
    /// `None` 或 `Some(0)` 表示一直等。TOML 里没法写 `None`（省略该键会取默认的
    /// 1000），所以配置文件用 `confirm_timeout_ms = 0` 表示无界。
    pub confirm_timeout_ms: Option<u64>,
    /// 提升接收分发线程优先级（需要 `realtime` feature）
    pub realtime: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_filters: 32,
            poll_interval_us: 1_000,
            confirm_timeout_ms: Some(1_000),
            realtime: false,
        }
    }
}

impl ControllerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    /// 同步发送等待确认的上限，`None` 表示无界
    pub fn confirm_timeout(&self) -> Option<Duration> {
        match self.confirm_timeout_ms {
            None | Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
        }
    }
}
