//! 发送闸门
//!
//! - **空闲许可**：容量为 1 的 crossbeam 通道，预先放入一个令牌。取走令牌即获得发送权，
//!   同一时刻最多只有一帧"已写出但未确认"
//! - **待完成项**：发送前登记，收到发送确认时由接收分发线程取出、归还令牌，再完成

use crate::error::ControllerError;
use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::trace;

/// 异步发送完成回调（在接收分发线程上调用）
pub type TxCallback = Box<dyn FnOnce(Result<(), ControllerError>) + Send + 'static>;

/// 一次发送的完成方式
pub(crate) enum Completion {
    /// 调用方提供的回调
    Callback(TxCallback),
    /// 同步发送：唤醒正在等待的调用方
    Waiter(Sender<()>),
}

pub(crate) struct TxGate {
    permit_tx: Sender<()>,
    permit_rx: Receiver<()>,
    pending: Mutex<Option<Completion>>,
}

impl TxGate {
    pub(crate) fn new() -> Self {
        let (permit_tx, permit_rx) = bounded(1);
        // 初始为空闲
        let _ = permit_tx.try_send(());
        Self {
            permit_tx,
            permit_rx,
            pending: Mutex::new(None),
        }
    }

    /// 在 `timeout` 内获取发送权
    pub(crate) fn acquire(&self, timeout: Duration) -> bool {
        self.permit_rx.recv_timeout(timeout).is_ok()
    }

    /// 归还发送权（许可最多为 1，多余的归还被忽略）
    pub(crate) fn release(&self) {
        let _ = self.permit_tx.try_send(());
    }

    /// 是否空闲
    pub(crate) fn is_idle(&self) -> bool {
        !self.permit_rx.is_empty()
    }

    pub(crate) fn set_pending(&self, completion: Completion) {
        *self.pending.lock() = Some(completion);
    }

    /// 写出失败时撤销登记
    pub(crate) fn clear_pending(&self) {
        self.pending.lock().take();
    }

    /// 收到发送确认：完成待完成项并归还发送权
    ///
    /// 返回是否存在待完成项。
    pub(crate) fn complete(&self) -> bool {
        // 先取出再归还发送权：调用方被唤醒时闸门已经空闲
        let completion = self.pending.lock().take();
        let had_pending = completion.is_some();
        self.release();

        match completion {
            Some(Completion::Callback(callback)) => callback(Ok(())),
            Some(Completion::Waiter(waiter)) => {
                // 同步发送方可能已经超时离开
                let _ = waiter.try_send(());
            },
            None => trace!("TX confirmation without pending completion"),
        }

        had_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_single_permit() {
        let gate = TxGate::new();
        assert!(gate.is_idle());
        assert!(gate.acquire(Duration::ZERO));
        assert!(!gate.is_idle());
        assert!(!gate.acquire(Duration::from_millis(5)));

        gate.release();
        // 重复归还不会产生第二个许可
        gate.release();
        assert!(gate.acquire(Duration::ZERO));
        assert!(!gate.acquire(Duration::ZERO));
    }

    #[test]
    fn test_complete_invokes_callback_and_releases() {
        let gate = TxGate::new();
        assert!(gate.acquire(Duration::ZERO));

        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        gate.set_pending(Completion::Callback(Box::new(move |result: Result<(), ControllerError>| {
            assert!(result.is_ok());
            fired_clone.store(true, Ordering::SeqCst);
        })));

        assert!(gate.complete());
        assert!(fired.load(Ordering::SeqCst));
        assert!(gate.is_idle());
    }

    #[test]
    fn test_complete_wakes_waiter() {
        let gate = TxGate::new();
        assert!(gate.acquire(Duration::ZERO));

        let (done_tx, done_rx) = bounded(1);
        gate.set_pending(Completion::Waiter(done_tx));
        assert!(gate.complete());
        assert!(done_rx.try_recv().is_ok());
    }

    #[test]
    fn test_complete_with_abandoned_waiter() {
        let gate = TxGate::new();
        assert!(gate.acquire(Duration::ZERO));

        let (done_tx, done_rx) = bounded(1);
        gate.set_pending(Completion::Waiter(done_tx));
        drop(done_rx);

        assert!(gate.complete());
        assert!(gate.is_idle());
    }

    #[test]
    fn test_clear_pending() {
        let gate = TxGate::new();
        assert!(gate.acquire(Duration::ZERO));
        gate.set_pending(Completion::Callback(Box::new(|_: Result<(), ControllerError>| panic!("must not fire"))));
        gate.clear_pending();
        assert!(!gate.complete());
    }
}
