//! 输入验证模块
//!
//! 解析命令行里的 CAN ID 与十六进制数据

use anyhow::{Context, Result};
use hostcan::{Frame, IdType};

/// 解析整数参数，支持 `0x` 前缀的十六进制
pub fn parse_int(value: &str) -> Result<u32, String> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", value, e))
}

/// 解析十六进制数据（允许 `.`、`:`、空格分隔，如 `DE:AD:BE:EF`）
pub fn parse_data(value: &str) -> Result<Vec<u8>> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '.' | ':' | ' ' | '_'))
        .collect();
    hex::decode(&cleaned).with_context(|| format!("invalid hex data '{}'", value))
}

/// 按参数构造一帧
///
/// # 错误
/// - 标识符超出类型范围
/// - CAN 2.0 帧超过 8 字节，或 FD 帧超过 64 字节
pub fn build_frame(id: u32, extended: bool, fd: bool, brs: bool, data: &[u8]) -> Result<Frame> {
    let id_type = if extended {
        IdType::Extended
    } else {
        IdType::Standard
    };

    let frame = if fd {
        Frame::new_fd(id, id_type, data, brs)?
    } else {
        if data.len() > 8 {
            anyhow::bail!("CAN 2.0 frames carry at most 8 bytes, got {} (use --fd)", data.len());
        }
        if extended {
            Frame::new_extended(id, data)
        } else {
            Frame {
                id,
                ..Frame::new_standard(0, data)
            }
        }
    };

    frame.validate_id()?;
    Ok(frame)
}
