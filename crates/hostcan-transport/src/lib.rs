//! # hostcan Transport Layer
//!
//! 主机传输通道抽象：把宿主操作系统的 Raw CAN Socket（或进程内虚拟总线）
//! 视为一个收发不透明线格式帧的全双工通道。
//!
//! 控制器核心只通过 [`RxChannel`] / [`TxChannel`] 两个 trait 使用传输层，
//! 不关心帧在内核里如何流转。发送确认（本节点发出的帧被总线接受后回显）
//! 通过 [`RxUnit::confirmed`] 这个布尔信号传递。

use std::time::Duration;
use thiserror::Error;

pub use hostcan_frame::{CAN_MTU, CANFD_MTU, FrameError, WireFrame};

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::{SocketCanRx, SocketCanTransport, SocketCanTx};

pub mod virtual_bus;

pub use virtual_bus::{NodeControl, VirtualBus, VirtualRx, VirtualTransport, VirtualTx};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Frame Error: {0}")]
    Frame(#[from] FrameError),
    #[error("Transport closed")]
    Closed,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NotFound,
    NotUp,
    AccessDenied,
    UnsupportedConfig,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            DeviceErrorKind::NotFound | DeviceErrorKind::NotUp | DeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for DeviceError {
    fn from(message: String) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for DeviceError {
    fn from(message: &str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// 从传输层读到的一个单元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxUnit {
    /// 线格式帧
    pub frame: WireFrame,
    /// 是否为本节点发送帧的回显确认（而不是总线上其他节点发来的帧）
    pub confirmed: bool,
}

impl RxUnit {
    pub fn inbound(frame: WireFrame) -> Self {
        Self {
            frame,
            confirmed: false,
        }
    }

    pub fn confirmation(frame: WireFrame) -> Self {
        Self {
            frame,
            confirmed: true,
        }
    }
}

/// 接收端通道（接收分发线程独占）
pub trait RxChannel: Send {
    /// 在 `timeout` 内等待数据可读
    ///
    /// 返回 `Ok(true)` 表示随后的 [`read`](Self::read) 至少能读到一个单元。
    fn poll(&mut self, timeout: Duration) -> Result<bool, TransportError>;

    /// 非阻塞读取一个单元，没有数据时返回 `Ok(None)`
    fn read(&mut self) -> Result<Option<RxUnit>, TransportError>;
}

/// 发送端通道
pub trait TxChannel: Send {
    /// 写入一帧的前 `mtu` 字节，返回实际写入的字节数
    fn write(&mut self, frame: &WireFrame, mtu: usize) -> Result<usize, TransportError>;

    /// 打开/关闭 CAN FD 帧收发
    fn set_fd_mode(&mut self, enabled: bool) -> Result<(), TransportError>;

    /// 传输句柄是否仍然有效
    fn is_open(&self) -> bool {
        true
    }
}

/// 可分离为收发两端的传输通道
pub trait Transport {
    type Rx: RxChannel + 'static;
    type Tx: TxChannel + 'static;

    /// 主机接口名称（如 "vcan0"）
    fn interface(&self) -> &str;

    /// 分离为独立的 RX 和 TX 通道
    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_is_fatal() {
        assert!(DeviceError::new(DeviceErrorKind::NotFound, "x").is_fatal());
        assert!(DeviceError::new(DeviceErrorKind::NotUp, "x").is_fatal());
        assert!(!DeviceError::new(DeviceErrorKind::InvalidFrame, "x").is_fatal());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Device(DeviceError::new(DeviceErrorKind::NotUp, "vcan0 is down"));
        assert_eq!(format!("{}", err), "Device Error: NotUp: vcan0 is down");

        let err: TransportError = DeviceError::from("boom").into();
        assert!(matches!(
            err,
            TransportError::Device(DeviceError {
                kind: DeviceErrorKind::Unknown,
                ..
            })
        ));

        assert_eq!(format!("{}", TransportError::Closed), "Transport closed");
    }

    #[test]
    fn test_rx_unit_constructors() {
        let frame = WireFrame::default();
        assert!(!RxUnit::inbound(frame).confirmed);
        assert!(RxUnit::confirmation(frame).confirmed);
    }
}
