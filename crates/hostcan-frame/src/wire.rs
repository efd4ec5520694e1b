//! 主机线格式
//!
//! 与 Linux `struct can_frame` / `struct canfd_frame` 的内存布局一致：
//!
//! ```text
//! offset 0..4   can_id   (主机字节序，bit 31 EFF / bit 30 RTR / bit 29 ERR)
//! offset 4      len      (数据字节数，不是 DLC)
//! offset 5      flags    (仅 FD：BRS / ESI / FDF；CAN 2.0 为填充字节)
//! offset 6..8   保留
//! offset 8..    data     (CAN 2.0: 8 字节；CAN FD: 64 字节)
//! ```

use crate::FrameError;
use crate::dlc::{CAN_MAX_DATA_LEN, CANFD_MAX_DATA_LEN};
use bilge::prelude::*;

/// CAN 2.0 帧的线上长度（`sizeof(struct can_frame)`）
pub const CAN_MTU: usize = 16;

/// CAN FD 帧的线上长度（`sizeof(struct canfd_frame)`）
pub const CANFD_MTU: usize = 72;

/// 波特率切换
pub const CANFD_BRS: u8 = 0x01;
/// 发送节点错误被动
pub const CANFD_ESI: u8 = 0x02;
/// FD 帧格式标记
pub const CANFD_FDF: u8 = 0x04;

const HEADER_LEN: usize = 8;

/// `can_id` 字段位域
///
/// bilge 默认使用 LSB first 位序：
/// - Bit 0-28: 标识符（标准帧只使用低 11 位）
/// - Bit 29: ERR（错误帧）
/// - Bit 30: RTR（远程帧）
/// - Bit 31: EFF（扩展帧）
#[bitsize(32)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq, Eq)]
pub struct CanIdWord {
    pub id: u29,
    pub error: bool,
    pub remote: bool,
    pub extended: bool,
}

/// 主机 Raw CAN Socket 上的一帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireFrame {
    /// 带标志位的 CAN ID
    pub can_id: u32,
    /// 数据字节数
    pub len: u8,
    /// FD 标志位
    pub flags: u8,
    /// 数据
    pub data: [u8; CANFD_MAX_DATA_LEN],
}

impl Default for WireFrame {
    fn default() -> Self {
        Self {
            can_id: 0,
            len: 0,
            flags: 0,
            data: [0; CANFD_MAX_DATA_LEN],
        }
    }
}

impl WireFrame {
    /// 解析 `can_id` 位域
    pub fn id_word(&self) -> CanIdWord {
        CanIdWord::from(self.can_id)
    }

    pub fn is_fd(&self) -> bool {
        self.flags & CANFD_FDF != 0
    }

    pub fn is_error_frame(&self) -> bool {
        self.id_word().error()
    }

    /// 序列化为 `mtu` 字节（`CAN_MTU` 或 `CANFD_MTU`）
    ///
    /// 返回固定 72 字节缓冲区，调用方只使用前 `mtu` 字节。
    /// 按 CAN 2.0 MTU 序列化时 flags 字节写 0，数据截断到 8 字节。
    pub fn to_bytes(&self, mtu: usize) -> [u8; CANFD_MTU] {
        let mut buf = [0u8; CANFD_MTU];
        buf[..4].copy_from_slice(&self.can_id.to_ne_bytes());

        if mtu == CANFD_MTU {
            buf[4] = self.len;
            buf[5] = self.flags;
            buf[HEADER_LEN..].copy_from_slice(&self.data);
        } else {
            buf[4] = self.len.min(CAN_MAX_DATA_LEN as u8);
            buf[HEADER_LEN..CAN_MTU].copy_from_slice(&self.data[..CAN_MAX_DATA_LEN]);
        }

        buf
    }

    /// 从原始字节解析（长度必须正好是 `CAN_MTU` 或 `CANFD_MTU`）
    ///
    /// # 错误
    /// - `FrameError::InvalidWireSize`: 长度既不是 16 也不是 72
    /// - `FrameError::InvalidWireLength`: `len` 字段超过该格式的最大数据长度
    pub fn from_bytes(buf: &[u8]) -> Result<Self, FrameError> {
        let max = match buf.len() {
            CAN_MTU => CAN_MAX_DATA_LEN,
            CANFD_MTU => CANFD_MAX_DATA_LEN,
            len => return Err(FrameError::InvalidWireSize { len }),
        };

        let len = buf[4];
        if len as usize > max {
            return Err(FrameError::InvalidWireLength { len, max });
        }

        let mut can_id = [0u8; 4];
        can_id.copy_from_slice(&buf[..4]);

        let mut frame = Self {
            can_id: u32::from_ne_bytes(can_id),
            len,
            flags: if buf.len() == CANFD_MTU { buf[5] } else { 0 },
            ..Self::default()
        };
        frame.data[..max].copy_from_slice(&buf[HEADER_LEN..HEADER_LEN + max]);
        Ok(frame)
    }
}
