//! 位时序参数
//!
//! 主机传输的位时序由系统工具（`ip link`）配置，控制器只校验并保存参数，
//! 不会下发到接口。

use crate::error::ControllerError;

/// 核心时钟频率（Hz）
pub const CORE_CLOCK_HZ: u32 = 16_000_000;

/// 位时序参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingParams {
    /// 同步跳转宽度
    pub sjw: u16,
    /// 传播段
    pub prop_seg: u16,
    /// 相位缓冲段 1
    pub phase_seg1: u16,
    /// 相位缓冲段 2
    pub phase_seg2: u16,
    /// 预分频
    pub prescaler: u16,
}

impl TimingParams {
    /// 允许的最小值
    pub const MIN: Self = Self {
        sjw: 1,
        prop_seg: 1,
        phase_seg1: 1,
        phase_seg2: 1,
        prescaler: 1,
    };

    /// 允许的最大值
    pub const MAX: Self = Self {
        sjw: 15,
        prop_seg: 15,
        phase_seg1: 15,
        phase_seg2: 15,
        prescaler: 0xFFFF,
    };

    /// 每位的时间量子数（同步段固定 1 tq）
    pub fn total_tq(&self) -> u32 {
        1 + self.prop_seg as u32 + self.phase_seg1 as u32 + self.phase_seg2 as u32
    }

    /// 给定核心时钟下的波特率（prescaler 为 0 时返回 0）
    pub fn bitrate(&self, core_clock_hz: u32) -> u32 {
        if self.prescaler == 0 {
            return 0;
        }
        core_clock_hz / (self.prescaler as u32 * self.total_tq())
    }

    /// 检查每个字段都在 [`MIN`](Self::MIN)..=[`MAX`](Self::MAX) 之内
    pub fn validate(&self) -> Result<(), ControllerError> {
        let fields = [
            ("sjw", self.sjw, Self::MIN.sjw, Self::MAX.sjw),
            ("prop_seg", self.prop_seg, Self::MIN.prop_seg, Self::MAX.prop_seg),
            ("phase_seg1", self.phase_seg1, Self::MIN.phase_seg1, Self::MAX.phase_seg1),
            ("phase_seg2", self.phase_seg2, Self::MIN.phase_seg2, Self::MAX.phase_seg2),
            ("prescaler", self.prescaler, Self::MIN.prescaler, Self::MAX.prescaler),
        ];

        for (name, value, min, max) in fields {
            if !(min..=max).contains(&value) {
                return Err(ControllerError::InvalidArgument(format!(
                    "timing {} = {} out of range [{}, {}]",
                    name, value, min, max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_validate() {
        assert!(TimingParams::MIN.validate().is_ok());
        assert!(TimingParams::MAX.validate().is_ok());
        // 全 0（Default）不合法
        assert!(TimingParams::default().validate().is_err());
    }

    #[test]
    fn test_out_of_range_field() {
        let timing = TimingParams {
            sjw: 16,
            ..TimingParams::MIN
        };
        match timing.validate() {
            Err(ControllerError::InvalidArgument(msg)) => assert!(msg.contains("sjw"), "got: {}", msg),
            other => panic!("Expected InvalidArgument, got: {:?}", other),
        }
    }

    #[test]
    fn test_bitrate() {
        // 16 MHz / (1 * (1 + 6 + 7 + 2)) = 1 Mbit/s
        let timing = TimingParams {
            sjw: 1,
            prop_seg: 6,
            phase_seg1: 7,
            phase_seg2: 2,
            prescaler: 1,
        };
        assert_eq!(timing.total_tq(), 16);
        assert_eq!(timing.bitrate(CORE_CLOCK_HZ), 1_000_000);
        assert_eq!(TimingParams::default().bitrate(CORE_CLOCK_HZ), 0);
    }
}
