//! 通用 CAN 帧表示

use crate::dlc::{CAN_MAX_DATA_LEN, CAN_MAX_DLC, CANFD_MAX_DATA_LEN, bytes_to_dlc, dlc_to_bytes};
use crate::{EXTENDED_ID_MASK, FrameError, STANDARD_ID_MASK};

/// 标识符类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, num_enum::IntoPrimitive, num_enum::TryFromPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum IdType {
    /// 11-bit 标准帧
    #[default]
    Standard = 0,
    /// 29-bit 扩展帧
    Extended = 1,
}

impl IdType {
    /// 该类型允许的最大标识符
    pub const fn max_id(self) -> u32 {
        match self {
            Self::Standard => STANDARD_ID_MASK,
            Self::Extended => EXTENDED_ID_MASK,
        }
    }

    pub const fn is_extended(self) -> bool {
        matches!(self, Self::Extended)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Extended => "extended",
        }
    }
}

/// CAN / CAN FD 帧的统一抽象
///
/// # 设计特性
///
/// - **Copy trait**：值语义。接收分发时每个回调拿到自己的副本，
///   某个回调修改自己的副本不会影响其他回调看到的数据
/// - **固定 64 字节**：同时容纳 CAN 2.0 与 CAN FD 帧，避免堆分配
/// - **未使用部分为 0**：构造器保证有效数据之后的字节全为 0，因此 `==` 可直接比较帧
///
/// # 示例
///
/// ```rust
/// use hostcan_frame::{Frame, IdType};
///
/// let frame = Frame::new_standard(0x123, &[0xAA, 0xBB]);
/// assert_eq!(frame.id, 0x123);
/// assert_eq!(frame.id_type, IdType::Standard);
/// assert_eq!(frame.dlc, 2);
/// assert_eq!(frame.data_slice(), &[0xAA, 0xBB]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// CAN ID（不含任何标志位）
    pub id: u32,

    /// 标识符类型
    pub id_type: IdType,

    /// 数据长度码 (0-15)
    pub dlc: u8,

    /// 帧数据（固定 64 字节，未使用部分为 0）
    pub data: [u8; CANFD_MAX_DATA_LEN],

    /// 远程帧（RTR）
    pub rtr: bool,

    /// CAN FD 帧（FDF）
    pub fd: bool,

    /// 波特率切换（BRS，仅对 FD 帧有意义）
    pub brs: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            id: 0,
            id_type: IdType::Standard,
            dlc: 0,
            data: [0; CANFD_MAX_DATA_LEN],
            rtr: false,
            fd: false,
            brs: false,
        }
    }
}

impl Frame {
    /// 创建 CAN 2.0 标准数据帧（超过 8 字节的部分被截断）
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new_classic(id as u32, IdType::Standard, data)
    }

    /// 创建 CAN 2.0 扩展数据帧（超过 8 字节的部分被截断）
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new_classic(id, IdType::Extended, data)
    }

    fn new_classic(id: u32, id_type: IdType, data: &[u8]) -> Self {
        let len = data.len().min(CAN_MAX_DATA_LEN);
        let mut frame = Self {
            id,
            id_type,
            dlc: len as u8,
            ..Self::default()
        };
        frame.data[..len].copy_from_slice(&data[..len]);
        frame
    }

    /// 创建 CAN FD 数据帧
    ///
    /// 数据长度不是合法 FD 长度时（如 10 字节），DLC 向上取整，多出的部分补 0。
    ///
    /// # 错误
    /// - `FrameError::PayloadTooLong`: 数据超过 64 字节
    pub fn new_fd(id: u32, id_type: IdType, data: &[u8], brs: bool) -> Result<Self, FrameError> {
        if data.len() > CANFD_MAX_DATA_LEN {
            return Err(FrameError::PayloadTooLong {
                len: data.len(),
                max: CANFD_MAX_DATA_LEN,
            });
        }

        let mut frame = Self {
            id,
            id_type,
            dlc: bytes_to_dlc(data.len()),
            fd: true,
            brs,
            ..Self::default()
        };
        frame.data[..data.len()].copy_from_slice(data);
        Ok(frame)
    }

    /// 创建远程帧（RTR，不携带数据，DLC 上限为 8）
    pub fn new_remote(id: u32, id_type: IdType, dlc: u8) -> Self {
        Self {
            id,
            id_type,
            dlc: dlc.min(CAN_MAX_DLC),
            rtr: true,
            ..Self::default()
        }
    }

    /// 有效数据长度（字节）
    ///
    /// 远程帧为 0；CAN 2.0 帧最多 8 字节；FD 帧按 DLC 映射表换算。
    pub fn data_len(&self) -> usize {
        if self.rtr {
            0
        } else if self.fd {
            dlc_to_bytes(self.dlc)
        } else {
            (self.dlc as usize).min(CAN_MAX_DATA_LEN)
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.data_len()]
    }

    pub fn is_extended(&self) -> bool {
        self.id_type.is_extended()
    }

    /// 检查标识符是否在该类型的范围内
    pub fn validate_id(&self) -> Result<(), FrameError> {
        if self.id > self.id_type.max_id() {
            return Err(FrameError::InvalidId {
                id: self.id,
                id_type: self.id_type,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_standard() {
        let frame = Frame::new_standard(0x123, &[1, 2, 3, 4]);
        assert_eq!(frame.id, 0x123);
        assert_eq!(frame.id_type, IdType::Standard);
        assert_eq!(frame.dlc, 4);
        assert_eq!(frame.data_slice(), &[1, 2, 3, 4]);
        assert!(!frame.fd && !frame.rtr && !frame.brs);
    }

    #[test]
    fn test_new_extended_truncates_to_eight_bytes() {
        let frame = Frame::new_extended(0x12345678, &[0xFF; 12]);
        assert!(frame.is_extended());
        assert_eq!(frame.dlc, 8);
        assert_eq!(frame.data_len(), 8);
        assert!(frame.data[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_new_fd_rounds_dlc_up() {
        let frame = Frame::new_fd(0x100, IdType::Standard, &[0xAB; 10], true).unwrap();
        assert_eq!(frame.dlc, 9);
        assert_eq!(frame.data_len(), 12);
        assert_eq!(&frame.data_slice()[..10], &[0xAB; 10]);
        assert_eq!(&frame.data_slice()[10..], &[0, 0]);
        assert!(frame.fd && frame.brs);
    }

    #[test]
    fn test_new_fd_rejects_oversized_payload() {
        let result = Frame::new_fd(0x100, IdType::Standard, &[0; 65], false);
        assert_eq!(
            result,
            Err(FrameError::PayloadTooLong { len: 65, max: 64 })
        );
    }

    #[test]
    fn test_remote_frame_has_no_payload() {
        let frame = Frame::new_remote(0x7FF, IdType::Standard, 12);
        assert!(frame.rtr);
        assert_eq!(frame.dlc, 8);
        assert!(frame.data_slice().is_empty());
    }

    #[test]
    fn test_validate_id() {
        assert!(Frame::new_standard(0x7FF, &[]).validate_id().is_ok());

        let mut frame = Frame::new_standard(0, &[]);
        frame.id = 0x800;
        assert_eq!(
            frame.validate_id(),
            Err(FrameError::InvalidId {
                id: 0x800,
                id_type: IdType::Standard
            })
        );

        assert!(Frame::new_extended(0x1FFF_FFFF, &[]).validate_id().is_ok());
        assert!(Frame::new_extended(0x2000_0000, &[]).validate_id().is_err());
    }

    #[test]
    fn test_id_type_primitive_conversion() {
        assert_eq!(u8::from(IdType::Extended), 1);
        assert_eq!(IdType::try_from(0u8).unwrap(), IdType::Standard);
        assert!(IdType::try_from(2u8).is_err());
    }
}
