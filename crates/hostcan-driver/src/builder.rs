//! Builder 模式实现
//!
//! 提供链式构造 [`Controller`] 实例的便捷方式。

use crate::config::ControllerConfig;
use crate::controller::Controller;
use crate::error::ControllerError;
use crate::mode::ModeFlags;
use crate::timing::TimingParams;
use hostcan_transport::Transport;
use std::time::Duration;
use tracing::debug;

/// Controller Builder（链式构造）
///
/// # Example
///
/// ```
/// use hostcan_driver::{ControllerBuilder, ModeFlags};
/// use hostcan_transport::VirtualBus;
///
/// let bus = VirtualBus::new();
/// let controller = ControllerBuilder::new()
///     .max_filters(8)
///     .mode(ModeFlags::LOOPBACK)
///     .auto_start(true)
///     .build_with(bus.open("vcan0"))
///     .unwrap();
///
/// assert!(controller.is_started());
/// assert_eq!(controller.mode(), ModeFlags::LOOPBACK);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ControllerBuilder {
    /// 主机接口名称（`build()` 使用）
    interface: Option<String>,
    config: ControllerConfig,
    mode: Option<ModeFlags>,
    timing: Option<TimingParams>,
    timing_data: Option<TimingParams>,
    auto_start: bool,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置主机接口名称（如 "can0" 或 "vcan0"）
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// 整体替换控制器配置
    pub fn config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_filters(mut self, max_filters: usize) -> Self {
        self.config.max_filters = max_filters;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_us = interval.as_micros() as u64;
        self
    }

    /// 同步发送等待确认的上限，`None` 表示一直等
    pub fn confirm_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.confirm_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.config.realtime = realtime;
        self
    }

    /// 创建后设置的模式
    pub fn mode(mut self, mode: ModeFlags) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn timing(mut self, timing: TimingParams) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn timing_data(mut self, timing: TimingParams) -> Self {
        self.timing_data = Some(timing);
        self
    }

    /// 创建完成后是否立即启动
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// 在给定传输通道上构建
    pub fn build_with<T: Transport>(self, transport: T) -> Result<Controller, ControllerError> {
        let controller = Controller::new(transport, self.config)?;

        if let Some(mode) = self.mode {
            controller.set_mode(mode)?;
        }
        if let Some(timing) = self.timing {
            controller.set_timing(timing)?;
        }
        if let Some(timing) = self.timing_data {
            controller.set_timing_data(timing)?;
        }
        if self.auto_start {
            controller.start()?;
        }

        debug!(
            "Controller on '{}' built (mode: {}, started: {})",
            controller.interface(),
            controller.mode(),
            controller.is_started()
        );
        Ok(controller)
    }

    /// 打开主机 SocketCAN 接口并构建
    ///
    /// # Errors
    /// - `ControllerError::InvalidArgument`: 未设置接口名称
    /// - `ControllerError::TransportIo`: 接口不存在、未启动或无法打开
    #[cfg(target_os = "linux")]
    pub fn build(self) -> Result<Controller, ControllerError> {
        let interface = self.interface.clone().ok_or_else(|| {
            ControllerError::InvalidArgument("interface name is required".to_string())
        })?;
        let transport = hostcan_transport::SocketCanTransport::open(interface)?;
        self.build_with(transport)
    }
}
