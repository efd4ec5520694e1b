//! 控制器共享上下文
//!
//! 控制线程（公共 API 调用方）与接收分发线程之间共享的全部状态。

use crate::filter::FilterTable;
use crate::gate::TxGate;
use crate::metrics::ControllerMetrics;
use crate::mode::ControllerStatus;
use arc_swap::ArcSwap;
use std::sync::Arc;

pub(crate) struct ControllerContext {
    /// 接收过滤器表
    pub(crate) filters: FilterTable,
    /// 发送闸门
    pub(crate) gate: TxGate,
    /// 启动状态与模式（控制线程整体替换，分发线程无锁读取）
    pub(crate) status: ArcSwap<ControllerStatus>,
    /// 性能指标
    pub(crate) metrics: ControllerMetrics,
}

impl ControllerContext {
    pub(crate) fn new(max_filters: usize) -> Self {
        Self {
            filters: FilterTable::new(max_filters),
            gate: TxGate::new(),
            status: ArcSwap::from_pointee(ControllerStatus::default()),
            metrics: ControllerMetrics::new(),
        }
    }

    pub(crate) fn status(&self) -> ControllerStatus {
        **self.status.load()
    }

    pub(crate) fn set_status(&self, status: ControllerStatus) {
        self.status.store(Arc::new(status));
    }
}
