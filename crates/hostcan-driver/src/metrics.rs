//! 控制器性能指标
//!
//! 原子计数器，任何线程都可以无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 控制器实时指标
///
/// # 使用示例
///
/// ```rust
/// use hostcan_driver::ControllerMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = ControllerMetrics::new();
/// metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_frames_total, 1);
/// ```
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// 从传输层读到的单元总数（含发送确认）
    pub rx_frames_total: AtomicU64,

    /// 进入过滤器分发的帧数（真实接收帧 + 回环副本）
    pub rx_frames_dispatched: AtomicU64,

    /// 作为回环副本分发的发送确认数
    pub rx_loopback_frames: AtomicU64,

    /// 收到的发送确认数
    pub tx_confirmations: AtomicU64,

    /// 成功写出的帧数
    pub tx_frames_total: AtomicU64,

    /// 写出失败次数
    pub tx_errors: AtomicU64,

    /// 在超时内没拿到发送权的次数
    pub tx_permit_timeouts: AtomicU64,

    /// 同步发送等确认超时的次数
    pub tx_confirm_timeouts: AtomicU64,

    /// 回调被调用的总次数
    pub filter_matches: AtomicU64,

    /// 传输层读错误次数
    pub transport_errors: AtomicU64,
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_frames_dispatched: self.rx_frames_dispatched.load(Ordering::Relaxed),
            rx_loopback_frames: self.rx_loopback_frames.load(Ordering::Relaxed),
            tx_confirmations: self.tx_confirmations.load(Ordering::Relaxed),
            tx_frames_total: self.tx_frames_total.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            tx_permit_timeouts: self.tx_permit_timeouts.load(Ordering::Relaxed),
            tx_confirm_timeouts: self.tx_confirm_timeouts.load(Ordering::Relaxed),
            filter_matches: self.filter_matches.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.rx_frames_total.store(0, Ordering::Relaxed);
        self.rx_frames_dispatched.store(0, Ordering::Relaxed);
        self.rx_loopback_frames.store(0, Ordering::Relaxed);
        self.tx_confirmations.store(0, Ordering::Relaxed);
        self.tx_frames_total.store(0, Ordering::Relaxed);
        self.tx_errors.store(0, Ordering::Relaxed);
        self.tx_permit_timeouts.store(0, Ordering::Relaxed);
        self.tx_confirm_timeouts.store(0, Ordering::Relaxed);
        self.filter_matches.store(0, Ordering::Relaxed);
        self.transport_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_frames_total: u64,
    pub rx_frames_dispatched: u64,
    pub rx_loopback_frames: u64,
    pub tx_confirmations: u64,
    pub tx_frames_total: u64,
    pub tx_errors: u64,
    pub tx_permit_timeouts: u64,
    pub tx_confirm_timeouts: u64,
    pub filter_matches: u64,
    pub transport_errors: u64,
}

impl MetricsSnapshot {
    /// 尚未确认的已写出帧数
    pub fn tx_unconfirmed(&self) -> u64 {
        self.tx_frames_total.saturating_sub(self.tx_confirmations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_metrics_default() {
        let snapshot = ControllerMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = ControllerMetrics::new();
        metrics.tx_frames_total.fetch_add(3, Ordering::Relaxed);
        metrics.tx_confirmations.fetch_add(2, Ordering::Relaxed);
        assert_eq!(metrics.snapshot().tx_unconfirmed(), 1);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_concurrent_increment() {
        let metrics = Arc::new(ControllerMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.filter_matches.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().filter_matches, 4000);
    }
}
