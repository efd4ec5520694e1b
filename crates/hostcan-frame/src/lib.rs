//! # hostcan Frame
//!
//! CAN / CAN FD 帧模型与主机 Raw CAN Socket 线格式之间的编解码（无硬件依赖）
//!
//! ## 模块
//!
//! - `dlc`: DLC 与数据字节数之间的换算
//! - `frame`: 通用帧表示 [`Frame`] 与标识符类型 [`IdType`]
//! - `wire`: 主机线格式 [`WireFrame`]（与 Linux `struct canfd_frame` 布局一致）
//! - `codec`: 纯函数编解码与按模式选择 MTU 的 [`FrameCodec`]
//!
//! ## 字节序
//!
//! `can_id` 字段使用主机字节序（与内核 `struct can_frame` 一致），
//! 标志位（EFF/RTR/ERR）位于 `can_id` 的高 3 位。

pub mod codec;
pub mod dlc;
pub mod frame;
pub mod wire;

pub use codec::{EncodedFrame, FrameCodec, from_wire, to_wire};
pub use dlc::*;
pub use frame::{Frame, IdType};
pub use wire::{CAN_MTU, CANFD_BRS, CANFD_ESI, CANFD_FDF, CANFD_MTU, CanIdWord, WireFrame};

use thiserror::Error;

/// 标准帧（11-bit）标识符掩码
pub const STANDARD_ID_MASK: u32 = 0x7FF;

/// 扩展帧（29-bit）标识符掩码
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// 帧编解码错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("DLC of {dlc} exceeds maximum ({max})")]
    DlcTooLarge { dlc: u8, max: u8 },

    #[error("Payload of {len} bytes exceeds maximum ({max})")]
    PayloadTooLong { len: usize, max: usize },

    #[error("Invalid {id_type:?} CAN ID: 0x{id:X}")]
    InvalidId { id: u32, id_type: IdType },

    #[error("Invalid wire frame size: {len} bytes (expected {classic} or {fd})", classic = CAN_MTU, fd = CANFD_MTU)]
    InvalidWireSize { len: usize },

    #[error("Invalid wire payload length: {len} (max {max})")]
    InvalidWireLength { len: u8, max: usize },
}
