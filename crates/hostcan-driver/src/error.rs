//! 控制器错误类型定义

use crate::mode::ModeFlags;
use hostcan_frame::FrameError;
use hostcan_transport::TransportError;
use thiserror::Error;

/// 控制器错误类型
///
/// 所有错误都是检测到它的那个操作的同步返回值。
#[derive(Error, Debug)]
pub enum ControllerError {
    /// 参数非法（DLC 超出当前模式上限、标识符越界、位时序越界等）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 过滤器表已满
    #[error("Filter table full (max {max} filters)")]
    CapacityExhausted { max: usize },

    /// 控制器未启动
    #[error("Controller is not running")]
    NotRunning,

    /// 控制器已启动，不允许修改配置
    #[error("Controller is busy (stop it first)")]
    Busy,

    /// 重复的启动/停止
    #[error("Controller is already in the requested state")]
    Already,

    /// 请求了不支持的模式位
    #[error("Unsupported mode flags: {mode}")]
    Unsupported { mode: ModeFlags },

    /// 传输句柄已失效
    #[error("Transport unavailable")]
    TransportUnavailable,

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 传输层 IO 错误
    #[error("Transport error: {0}")]
    TransportIo(#[from] TransportError),
}

impl From<FrameError> for ControllerError {
    fn from(e: FrameError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostcan_frame::IdType;

    #[test]
    fn test_controller_error_display() {
        assert_eq!(
            format!("{}", ControllerError::CapacityExhausted { max: 32 }),
            "Filter table full (max 32 filters)"
        );
        assert_eq!(format!("{}", ControllerError::Timeout), "Operation timeout");
        assert_eq!(
            format!("{}", ControllerError::NotRunning),
            "Controller is not running"
        );

        let msg = format!(
            "{}",
            ControllerError::Unsupported {
                mode: ModeFlags::LISTEN_ONLY
            }
        );
        assert!(msg.contains("LISTEN_ONLY"), "got: {}", msg);
    }

    #[test]
    fn test_from_frame_error() {
        let err: ControllerError = FrameError::DlcTooLarge { dlc: 9, max: 8 }.into();
        match err {
            ControllerError::InvalidArgument(msg) => assert!(msg.contains('9'), "got: {}", msg),
            other => panic!("Expected InvalidArgument, got: {:?}", other),
        }

        let err: ControllerError = FrameError::InvalidId {
            id: 0x800,
            id_type: IdType::Standard,
        }
        .into();
        assert!(matches!(err, ControllerError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_transport_error() {
        let err: ControllerError = TransportError::Closed.into();
        assert!(matches!(err, ControllerError::TransportIo(TransportError::Closed)));
    }
}
