//! 控制器模式与总线状态定义
//!
//! 模式位的取值与通用 CAN 控制器 API 保持一致：
//!
//! | 位 | 模式 |
//! |---|---|
//! | 0 (无位) | NORMAL |
//! | bit 0 | LOOPBACK |
//! | bit 1 | LISTEN_ONLY |
//! | bit 2 | FD |
//! | bit 3 | ONE_SHOT |
//! | bit 4 | TRIPLE_SAMPLE |
//!
//! 主机传输只支持 `NORMAL | LOOPBACK | FD`。

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// 控制器模式位集合
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ModeFlags: u32 {
        const LOOPBACK = 1 << 0;
        const LISTEN_ONLY = 1 << 1;
        const FD = 1 << 2;
        const ONE_SHOT = 1 << 3;
        const TRIPLE_SAMPLE = 1 << 4;
    }
}

impl ModeFlags {
    /// 不带任何位的普通模式
    pub const NORMAL: Self = Self::empty();

    pub const fn is_normal(self) -> bool {
        self.is_empty()
    }

    pub const fn is_loopback(self) -> bool {
        self.contains(Self::LOOPBACK)
    }

    pub const fn is_fd(self) -> bool {
        self.contains(Self::FD)
    }
}

impl fmt::Display for ModeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_normal() {
            return f.write_str("NORMAL");
        }

        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }

        let unknown = self.bits() & !Self::all().bits();
        if unknown != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "0x{:X}", unknown)?;
        }
        Ok(())
    }
}

/// 总线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusState {
    ErrorActive,
    ErrorWarning,
    ErrorPassive,
    BusOff,
    Stopped,
}

impl BusState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ErrorActive => "error-active",
            Self::ErrorWarning => "error-warning",
            Self::ErrorPassive => "error-passive",
            Self::BusOff => "bus-off",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for BusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 收发错误计数器（主机传输不上报，恒为 0）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorCounters {
    pub tx_err_cnt: u8,
    pub rx_err_cnt: u8,
}

/// 控制器运行状态快照
///
/// 由控制线程整体替换（`ArcSwap::store`），接收分发线程无锁读取。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerStatus {
    pub started: bool,
    pub mode: ModeFlags,
}

impl ControllerStatus {
    /// 回环副本是否应当进入过滤器分发
    pub fn loopback_active(&self) -> bool {
        self.started && self.mode.is_loopback()
    }
}
