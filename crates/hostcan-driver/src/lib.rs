//! 软件 CAN 控制器
//!
//! 把通用 CAN 控制器 API 桥接到主机传输通道（Linux Raw CAN Socket 或进程内虚拟总线）：
//! - 接收分发线程：读取传输层，完成发送确认，按过滤器表扇出回调
//! - 发送闸门：同一时刻最多一帧未确认，支持同步等待与异步回调
//! - 状态机：启动/停止、模式、位时序
//!
//! # 使用场景
//!
//! 需要在主机上用统一的控制器 API 收发 CAN / CAN FD 帧。

mod builder;
mod config;
mod context;
mod controller;
mod dispatcher;
mod error;
pub mod filter;
mod gate;
pub mod metrics;
pub mod mode;
pub mod timing;

pub use builder::ControllerBuilder;
pub use config::ControllerConfig;
pub use controller::{CAPABILITIES, Controller, StateChangeCallback};
pub use error::ControllerError;
pub use filter::{FilterHandle, FilterRule, FilterTable, FrameCallback};
pub use gate::TxCallback;
pub use metrics::{ControllerMetrics, MetricsSnapshot};
pub use mode::{BusState, ControllerStatus, ErrorCounters, ModeFlags};
pub use timing::{CORE_CLOCK_HZ, TimingParams};
