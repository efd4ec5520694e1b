//! SocketCAN 收发两端
//!
//! # ⚠️ `dup()` 的共享状态
//!
//! RX 端持有 TX socket 的 `dup()` 副本（`OwnedFd`），两者共享同一个"打开文件描述"：
//! - `O_NONBLOCK` 共享，所以两端都不设置它，非阻塞读只用 `MSG_DONTWAIT`
//! - `CAN_RAW_FD_FRAMES` 等 socket 选项共享，TX 端切换 FD 模式后 RX 端立即能收 FD 帧

use super::set_raw_option;
use crate::{CAN_MTU, CANFD_MTU, RxChannel, RxUnit, TransportError, TxChannel, WireFrame};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::socket::{MsgFlags, SockaddrStorage, recvmsg};
use socketcan::CanSocket;
use std::io::IoSliceMut;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tracing::{trace, warn};

/// 接收端（接收分发线程独占）
#[derive(Debug)]
pub struct SocketCanRx {
    fd: OwnedFd,
    interface: String,
}

impl SocketCanRx {
    /// 复制 `socket` 的文件描述符作为接收端
    pub(crate) fn dup_from(socket: &CanSocket, interface: String) -> std::io::Result<Self> {
        // SAFETY: socket 在本函数内存活，借用只用于 dup
        let borrowed = unsafe { BorrowedFd::borrow_raw(socket.as_raw_fd()) };
        let fd = borrowed.try_clone_to_owned()?;
        Ok(Self { fd, interface })
    }
}

impl RxChannel for SocketCanRx {
    fn poll(&mut self, timeout: Duration) -> Result<bool, TransportError> {
        let pollfd = PollFd::new(self.fd.as_fd(), PollFlags::POLLIN);

        // PollTimeout 为毫秒数（u16，最大 65535ms）
        let timeout_ms = timeout.as_millis().min(65535) as u16;
        match poll(&mut [pollfd], PollTimeout::from(timeout_ms)) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(true),
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(TransportError::Io(std::io::Error::other(format!(
                "poll failed on '{}': {}",
                self.interface, e
            )))),
        }
    }

    fn read(&mut self) -> Result<Option<RxUnit>, TransportError> {
        loop {
            let fd = self.fd.as_raw_fd();
            let mut frame_buf = [0u8; CANFD_MTU];
            let mut iov = [IoSliceMut::new(&mut frame_buf)];

            let (received, flags) =
                match recvmsg::<SockaddrStorage>(fd, &mut iov, None, MsgFlags::MSG_DONTWAIT) {
                    Ok(msg) => (msg.bytes, msg.flags),
                    Err(Errno::EAGAIN) | Err(Errno::EINTR) => return Ok(None),
                    Err(e) => {
                        return Err(TransportError::Io(std::io::Error::other(format!(
                            "recvmsg failed on '{}': {}",
                            self.interface, e
                        ))));
                    },
                };

            // recvmsg 返回后 iov 不再使用，可以安全地读 frame_buf
            if received != CAN_MTU && received != CANFD_MTU {
                warn!(
                    "Ignoring {} byte read on '{}' (expected {} or {})",
                    received, self.interface, CAN_MTU, CANFD_MTU
                );
                continue;
            }

            let frame = WireFrame::from_bytes(&frame_buf[..received])?;
            if frame.is_error_frame() {
                warn!(
                    "CAN error frame received on '{}' (can_id=0x{:08X}), ignoring",
                    self.interface, frame.can_id
                );
                continue;
            }

            let confirmed = flags.bits() & libc::MSG_CONFIRM != 0;
            return Ok(Some(RxUnit { frame, confirmed }));
        }
    }
}

/// 发送端
#[derive(Debug)]
pub struct SocketCanTx {
    socket: CanSocket,
    interface: String,
}

impl SocketCanTx {
    pub(crate) fn new(socket: CanSocket, interface: String) -> Self {
        Self { socket, interface }
    }
}

impl TxChannel for SocketCanTx {
    fn write(&mut self, frame: &WireFrame, mtu: usize) -> Result<usize, TransportError> {
        let bytes = frame.to_bytes(mtu);
        let fd = unsafe { BorrowedFd::borrow_raw(self.socket.as_raw_fd()) };

        let written =
            nix::unistd::write(fd, &bytes[..mtu]).map_err(|e| TransportError::Io(e.into()))?;

        if written != mtu {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                format!(
                    "short write on '{}': {} of {} bytes",
                    self.interface, written, mtu
                ),
            )));
        }

        trace!(
            "SocketCAN '{}' wrote can_id=0x{:X}, len={}, mtu={}",
            self.interface, frame.can_id, frame.len, mtu
        );
        Ok(written)
    }

    fn set_fd_mode(&mut self, enabled: bool) -> Result<(), TransportError> {
        set_raw_option(self.socket.as_raw_fd(), libc::CAN_RAW_FD_FRAMES, enabled)?;
        trace!(
            "SocketCAN '{}' CAN_RAW_FD_FRAMES={}",
            self.interface, enabled as i32
        );
        Ok(())
    }
}
