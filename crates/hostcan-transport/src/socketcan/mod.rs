//! SocketCAN 传输实现
//!
//! 基于 Linux 内核 Raw CAN Socket。打开接口时开启 `CAN_RAW_RECV_OWN_MSGS`，
//! 使本 socket 发出的帧被内核回显回来，并在 `recvmsg` 的 flags 中带上
//! `MSG_CONFIRM` 标记，以此作为发送确认。
//!
//! ## 依赖
//!
//! - `socketcan` crate（版本 3.5）：打开 socket
//! - `nix`：`poll` / `recvmsg` / `write`
//! - `libc`：socket 选项常量
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **接口配置**：波特率由系统工具（`ip link`）完成，不在应用层设置

use crate::{DeviceError, DeviceErrorKind, Transport, TransportError};
use socketcan::{CanSocket, Socket};
use std::os::unix::io::{AsRawFd, RawFd};
use tracing::{trace, warn};

mod interface_check;
mod split;

pub use interface_check::check_interface_status;
pub use split::{SocketCanRx, SocketCanTx};

/// 设置一个 `SOL_CAN_RAW` 层的布尔型 socket 选项
pub(crate) fn set_raw_option(fd: RawFd, option: libc::c_int, enabled: bool) -> std::io::Result<()> {
    let value: libc::c_int = enabled as libc::c_int;
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_CAN_RAW,
            option,
            &value as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// SocketCAN 传输
///
/// # 示例
///
/// ```no_run
/// use hostcan_transport::{SocketCanTransport, Transport};
///
/// let transport = SocketCanTransport::open("vcan0").unwrap();
/// let (rx, tx) = transport.split().unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanTransport {
    socket: CanSocket,
    interface: String,
}

impl SocketCanTransport {
    /// 打开主机 CAN 接口
    ///
    /// 在打开 socket 之前检查接口是否存在且已启动。
    ///
    /// # 错误
    /// - `TransportError::Device`: 接口不存在、未启动或无法打开
    /// - `TransportError::Io`: 开启回显确认失败
    pub fn open(interface: impl Into<String>) -> Result<Self, TransportError> {
        let interface = interface.into();

        match check_interface_status(&interface) {
            Ok(true) => {
                trace!(
                    "CAN interface '{}' is UP, proceeding with initialization",
                    interface
                );
            },
            Ok(false) => {
                return Err(DeviceError::new(
                    DeviceErrorKind::NotUp,
                    format!(
                        "CAN interface '{}' exists but is not UP. Please start it first:\n  sudo ip link set up {}",
                        interface, interface
                    ),
                )
                .into());
            },
            Err(e) => return Err(e),
        }

        let socket = CanSocket::open(&interface).map_err(|e| {
            let kind = if e.kind() == std::io::ErrorKind::PermissionDenied {
                DeviceErrorKind::AccessDenied
            } else {
                DeviceErrorKind::Backend
            };
            DeviceError::new(
                kind,
                format!("Failed to open CAN interface '{}': {}", interface, e),
            )
        })?;

        let fd = socket.as_raw_fd();

        // 回环默认开启，这里显式确认：发送确认依赖它
        if let Err(e) = set_raw_option(fd, libc::CAN_RAW_LOOPBACK, true) {
            warn!("Failed to enable CAN_RAW_LOOPBACK on '{}': {}", interface, e);
        }

        // 没有本地回显就永远等不到发送确认，必须成功
        set_raw_option(fd, libc::CAN_RAW_RECV_OWN_MSGS, true).map_err(|e| {
            TransportError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to enable CAN_RAW_RECV_OWN_MSGS on '{}': {}", interface, e),
            ))
        })?;

        trace!(
            "SocketCAN interface '{}' opened (CAN_RAW_RECV_OWN_MSGS=1)",
            interface
        );

        Ok(Self { socket, interface })
    }
}

impl Transport for SocketCanTransport {
    type Rx = SocketCanRx;
    type Tx = SocketCanTx;

    fn interface(&self) -> &str {
        &self.interface
    }

    /// 分离为独立的 RX 和 TX 通道
    ///
    /// RX 端持有 socket 的 `dup()` 副本，两个 FD 共享同一个
    /// "打开文件描述"，因此 `CAN_RAW_FD_FRAMES` 在 TX 端设置后对 RX 端同样生效。
    /// 两端都不使用 `O_NONBLOCK`：RX 用 `poll` 等待，`recvmsg` 用 `MSG_DONTWAIT`。
    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError> {
        let rx = SocketCanRx::dup_from(&self.socket, self.interface.clone()).map_err(|e| {
            TransportError::Io(std::io::Error::other(format!(
                "Failed to dup SocketCAN socket for RX: {}",
                e
            )))
        })?;

        trace!(
            "SocketCanTransport split into RX and TX channels (interface: {})",
            self.interface
        );

        Ok((rx, SocketCanTx::new(self.socket, self.interface)))
    }
}
