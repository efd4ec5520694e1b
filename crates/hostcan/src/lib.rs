//! # hostcan
//!
//! 在主机上实现的软件 CAN 控制器：把通用的 CAN 控制器 API（启动/停止、模式、
//! 位时序、接收过滤器、发送确认）桥接到 Linux Raw CAN Socket。
//!
//! ## 分层
//!
//! - [`frame`]：通用帧与主机线格式之间的编解码
//! - [`transport`]：主机传输通道（SocketCAN / 进程内虚拟总线）
//! - [`driver`]：控制器本体（接收分发线程、过滤器表、发送闸门、状态机）
//!
//! ## 快速开始
//!
//! ```rust
//! use hostcan::prelude::*;
//! use std::time::Duration;
//!
//! let bus = VirtualBus::new();
//! let controller = ControllerBuilder::new()
//!     .mode(ModeFlags::LOOPBACK)
//!     .auto_start(true)
//!     .build_with(bus.open("vcan0"))
//!     .unwrap();
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! controller
//!     .add_filter(FilterRule::accept_all(IdType::Standard), move |frame: Frame| {
//!         let _ = tx.send(frame.id);
//!     })
//!     .unwrap();
//!
//! controller
//!     .send_blocking(&Frame::new_standard(0x123, &[1, 2, 3]), Duration::from_millis(100))
//!     .unwrap();
//! assert_eq!(rx.try_recv().unwrap(), 0x123);
//! ```

pub mod logging;

pub use hostcan_driver as driver;
pub use hostcan_frame as frame;
pub use hostcan_transport as transport;

pub use hostcan_driver::{
    BusState, CAPABILITIES, Controller, ControllerBuilder, ControllerConfig, ControllerError,
    ErrorCounters, FilterHandle, FilterRule, FrameCallback, MetricsSnapshot, ModeFlags,
    StateChangeCallback, TimingParams, TxCallback,
};
pub use hostcan_frame::{Frame, FrameError, IdType};
pub use hostcan_transport::{TransportError, VirtualBus};

#[cfg(target_os = "linux")]
pub use hostcan_transport::SocketCanTransport;

/// 常用类型
pub mod prelude {
    pub use crate::{
        BusState, Controller, ControllerBuilder, ControllerConfig, ControllerError, FilterHandle,
        FilterRule, Frame, IdType, ModeFlags, TimingParams, VirtualBus,
    };

    #[cfg(target_os = "linux")]
    pub use crate::SocketCanTransport;
}
