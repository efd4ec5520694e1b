//! 帧编解码
//!
//! [`to_wire`] / [`from_wire`] 是纯函数字段映射，对所有输入都有定义；
//! [`FrameCodec`] 在此之上根据当前是否处于 FD 模式选择 MTU，并在帧进入传输层之前
//! 拒绝超出该模式 DLC 上限的帧。

use crate::dlc::{CAN_MAX_DATA_LEN, CAN_MAX_DLC, CANFD_MAX_DLC, bytes_to_dlc, dlc_to_bytes};
use crate::frame::{Frame, IdType};
use crate::wire::{CAN_MTU, CANFD_BRS, CANFD_FDF, CANFD_MTU, CanIdWord, WireFrame};
use crate::{EXTENDED_ID_MASK, FrameError};
use bilge::prelude::*;

/// 通用帧 -> 线格式
pub fn to_wire(frame: &Frame) -> WireFrame {
    let word = CanIdWord::new(
        u29::new(frame.id & EXTENDED_ID_MASK),
        false,
        frame.rtr,
        frame.id_type.is_extended(),
    );

    let mut flags = 0;
    if frame.fd {
        flags |= CANFD_FDF;
    }
    if frame.brs {
        flags |= CANFD_BRS;
    }

    let len = if frame.fd {
        dlc_to_bytes(frame.dlc)
    } else {
        (frame.dlc as usize).min(CAN_MAX_DATA_LEN)
    };

    let mut wire = WireFrame {
        can_id: u32::from(word),
        len: len as u8,
        flags,
        ..WireFrame::default()
    };

    // 远程帧不携带数据
    if !frame.rtr {
        wire.data[..len].copy_from_slice(&frame.data[..len]);
    }

    wire
}

/// 线格式 -> 通用帧
pub fn from_wire(wire: &WireFrame) -> Frame {
    let word = wire.id_word();
    let len = (wire.len as usize).min(wire.data.len());

    let mut frame = Frame {
        id: word.id().value(),
        id_type: if word.extended() {
            IdType::Extended
        } else {
            IdType::Standard
        },
        dlc: bytes_to_dlc(len),
        rtr: word.remote(),
        fd: wire.flags & CANFD_FDF != 0,
        brs: wire.flags & CANFD_BRS != 0,
        ..Frame::default()
    };

    if !frame.rtr {
        frame.data[..len].copy_from_slice(&wire.data[..len]);
    }

    frame
}

/// 按 MTU 编码后的帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedFrame {
    pub wire: WireFrame,
    /// 写入传输层的字节数（`CAN_MTU` 或 `CANFD_MTU`）
    pub mtu: usize,
}

impl EncodedFrame {
    pub fn is_fd(&self) -> bool {
        self.mtu == CANFD_MTU
    }
}

/// 感知 FD 模式的编解码器
///
/// 只有 FD 模式开启 **且** 帧本身带 FD 标记时才使用 CAN FD MTU 和 DLC 上限 15，
/// 其余情况一律按 CAN 2.0 处理（DLC 上限 8）。
///
/// # 示例
///
/// ```rust
/// use hostcan_frame::{Frame, FrameCodec, FrameError, CAN_MTU};
///
/// let codec = FrameCodec::new(false);
/// let encoded = codec.encode(&Frame::new_standard(0x123, &[1, 2])).unwrap();
/// assert_eq!(encoded.mtu, CAN_MTU);
///
/// let mut too_long = Frame::new_standard(0x123, &[]);
/// too_long.dlc = 9;
/// assert_eq!(
///     codec.encode(&too_long),
///     Err(FrameError::DlcTooLarge { dlc: 9, max: 8 })
/// );
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCodec {
    fd_mode: bool,
}

impl FrameCodec {
    pub const fn new(fd_mode: bool) -> Self {
        Self { fd_mode }
    }

    pub const fn fd_mode(&self) -> bool {
        self.fd_mode
    }

    fn uses_fd(&self, frame: &Frame) -> bool {
        self.fd_mode && frame.fd
    }

    /// 该帧在当前模式下允许的最大 DLC
    pub fn max_dlc(&self, frame: &Frame) -> u8 {
        if self.uses_fd(frame) {
            CANFD_MAX_DLC
        } else {
            CAN_MAX_DLC
        }
    }

    /// 该帧在当前模式下使用的 MTU
    pub fn mtu(&self, frame: &Frame) -> usize {
        if self.uses_fd(frame) { CANFD_MTU } else { CAN_MTU }
    }

    /// 检查 DLC 是否超出当前模式的上限
    pub fn check_dlc(&self, frame: &Frame) -> Result<(), FrameError> {
        let max = self.max_dlc(frame);
        if frame.dlc > max {
            return Err(FrameError::DlcTooLarge {
                dlc: frame.dlc,
                max,
            });
        }
        Ok(())
    }

    /// 编码
    ///
    /// # 错误
    /// - `FrameError::DlcTooLarge`: DLC 超出当前模式上限
    /// - `FrameError::InvalidId`: 标识符超出其类型范围
    pub fn encode(&self, frame: &Frame) -> Result<EncodedFrame, FrameError> {
        self.check_dlc(frame)?;
        frame.validate_id()?;

        let mut wire = to_wire(frame);
        let mtu = self.mtu(frame);
        if mtu == CAN_MTU {
            // 按 CAN 2.0 发送时不携带 FD 标志
            wire.flags = 0;
        }

        Ok(EncodedFrame { wire, mtu })
    }

    /// 解码（总是成功）
    pub fn decode(&self, wire: &WireFrame) -> Frame {
        from_wire(wire)
    }
}
