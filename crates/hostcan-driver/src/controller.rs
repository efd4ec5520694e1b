//! 软件 CAN 控制器
//!
//! 对外的 [`Controller`] 结构体，封装接收分发线程、过滤器表与发送闸门。

use crate::config::ControllerConfig;
use crate::context::ControllerContext;
use crate::error::ControllerError;
use crate::filter::{FilterHandle, FilterRule, FrameCallback};
use crate::gate::{Completion, TxCallback};
use crate::metrics::MetricsSnapshot;
use crate::mode::{BusState, ControllerStatus, ErrorCounters, ModeFlags};
use crate::timing::{CORE_CLOCK_HZ, TimingParams};
use crossbeam_channel::bounded;
use hostcan_frame::{Frame, FrameCodec, IdType};
use hostcan_transport::{Transport, TransportError, TxChannel};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 总线状态变化回调
pub type StateChangeCallback = Box<dyn Fn(BusState, ErrorCounters) + Send + Sync + 'static>;

/// 支持的模式位（NORMAL 为空集，总是支持）
pub const CAPABILITIES: ModeFlags = ModeFlags::LOOPBACK.union(ModeFlags::FD);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程负责 join，本线程带超时等待结果
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Thread join timeout",
            ))),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "Thread panicked during join",
            ))),
        }
    }
}

/// 只允许在停止状态下修改的配置
#[derive(Default)]
struct ControlState {
    timing: TimingParams,
    timing_data: TimingParams,
    state_change_callback: Option<StateChangeCallback>,
}

/// 软件 CAN 控制器
///
/// 创建时把传输通道分离为收发两端，并启动接收分发线程；drop 时通知该线程退出，
/// 最多等待 2 秒。
///
/// # 示例
///
/// ```rust
/// use hostcan_driver::{Controller, ControllerConfig, FilterRule, ModeFlags};
/// use hostcan_frame::{Frame, IdType};
/// use hostcan_transport::VirtualBus;
/// use std::time::Duration;
///
/// let bus = VirtualBus::new();
/// let controller = Controller::new(bus.open("vcan0"), ControllerConfig::default()).unwrap();
///
/// let (tx, rx) = crossbeam_channel::unbounded();
/// controller
///     .add_filter(FilterRule::exact(0x123, IdType::Standard), move |frame: Frame| {
///         let _ = tx.send(frame);
///     })
///     .unwrap();
///
/// controller.set_mode(ModeFlags::LOOPBACK).unwrap();
/// controller.start().unwrap();
///
/// let frame = Frame::new_standard(0x123, &[0xAA, 0xBB]);
/// controller.send(&frame, Duration::from_millis(100), None).unwrap();
/// assert_eq!(rx.try_recv().unwrap(), frame);
/// ```
pub struct Controller {
    ctx: Arc<ControllerContext>,
    tx: Mutex<Box<dyn TxChannel>>,
    control: Mutex<ControlState>,
    interface: String,
    config: ControllerConfig,
    is_running: Arc<AtomicBool>,
    rx_thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// 在传输通道上创建控制器（初始为停止状态，模式 NORMAL）
    ///
    /// # 错误
    /// - `ControllerError::TransportIo`: 分离传输通道或启动分发线程失败
    pub fn new<T>(transport: T, config: ControllerConfig) -> Result<Self, ControllerError>
    where
        T: Transport,
    {
        let interface = transport.interface().to_string();
        let (rx, tx) = transport.split()?;

        let ctx = Arc::new(ControllerContext::new(config.max_filters));
        let is_running = Arc::new(AtomicBool::new(true));

        let ctx_clone = ctx.clone();
        let is_running_clone = is_running.clone();
        let poll_interval = config.poll_interval();
        let realtime = config.realtime;

        let rx_thread = std::thread::Builder::new()
            .name(format!("hostcan-rx-{}", interface))
            .spawn(move || {
                crate::dispatcher::rx_loop(rx, ctx_clone, poll_interval, realtime, is_running_clone);
            })
            .map_err(TransportError::Io)?;

        info!(
            "Controller on '{}' created (max_filters={}, poll_interval={:?})",
            interface, config.max_filters, poll_interval
        );

        Ok(Self {
            ctx,
            tx: Mutex::new(Box::new(tx)),
            control: Mutex::new(ControlState::default()),
            interface,
            config,
            is_running,
            rx_thread: Some(rx_thread),
        })
    }

    /// 主机接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ==================== 状态机 ====================

    /// 停止 → 启动
    ///
    /// # 错误
    /// - `ControllerError::Already`: 已经启动
    pub fn start(&self) -> Result<(), ControllerError> {
        let _control = self.control.lock();
        let status = self.ctx.status();
        if status.started {
            return Err(ControllerError::Already);
        }

        self.ctx.set_status(ControllerStatus {
            started: true,
            ..status
        });
        debug!("Controller on '{}' started (mode: {})", self.interface, status.mode);
        Ok(())
    }

    /// 启动 → 停止
    ///
    /// 已写出、尚未确认的帧不受影响，确认到达时照常完成。
    ///
    /// # 错误
    /// - `ControllerError::Already`: 已经停止
    pub fn stop(&self) -> Result<(), ControllerError> {
        let _control = self.control.lock();
        let status = self.ctx.status();
        if !status.started {
            return Err(ControllerError::Already);
        }

        self.ctx.set_status(ControllerStatus {
            started: false,
            ..status
        });
        debug!("Controller on '{}' stopped", self.interface);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.ctx.status().started
    }

    /// 设置模式
    ///
    /// # 错误
    /// - `ControllerError::Unsupported`: 包含 [`CAPABILITIES`] 之外的位
    /// - `ControllerError::Busy`: 控制器已启动
    /// - `ControllerError::TransportIo`: 传输层切换 FD 模式失败（模式保持不变）
    pub fn set_mode(&self, mode: ModeFlags) -> Result<(), ControllerError> {
        if !CAPABILITIES.contains(mode) {
            return Err(ControllerError::Unsupported {
                mode: mode.difference(CAPABILITIES),
            });
        }

        let _control = self.control.lock();
        let status = self.ctx.status();
        if status.started {
            return Err(ControllerError::Busy);
        }

        self.tx.lock().set_fd_mode(mode.is_fd())?;
        self.ctx.set_status(ControllerStatus { mode, ..status });

        debug!("Controller on '{}' mode set to {}", self.interface, mode);
        Ok(())
    }

    pub fn mode(&self) -> ModeFlags {
        self.ctx.status().mode
    }

    pub fn capabilities(&self) -> ModeFlags {
        CAPABILITIES
    }

    /// 设置仲裁段位时序（只校验并保存）
    ///
    /// # 错误
    /// - `ControllerError::Busy`: 控制器已启动
    /// - `ControllerError::InvalidArgument`: 参数超出 [`TimingParams::MIN`]..=[`TimingParams::MAX`]
    pub fn set_timing(&self, timing: TimingParams) -> Result<(), ControllerError> {
        let mut control = self.control.lock();
        if self.ctx.status().started {
            return Err(ControllerError::Busy);
        }
        timing.validate()?;
        control.timing = timing;
        debug!("Controller on '{}' timing set to {:?}", self.interface, timing);
        Ok(())
    }

    /// 设置 FD 数据段位时序（只校验并保存）
    pub fn set_timing_data(&self, timing: TimingParams) -> Result<(), ControllerError> {
        let mut control = self.control.lock();
        if self.ctx.status().started {
            return Err(ControllerError::Busy);
        }
        timing.validate()?;
        control.timing_data = timing;
        debug!("Controller on '{}' data timing set to {:?}", self.interface, timing);
        Ok(())
    }

    pub fn timing(&self) -> TimingParams {
        self.control.lock().timing
    }

    pub fn timing_data(&self) -> TimingParams {
        self.control.lock().timing_data
    }

    pub fn timing_min(&self) -> TimingParams {
        TimingParams::MIN
    }

    pub fn timing_max(&self) -> TimingParams {
        TimingParams::MAX
    }

    /// 核心时钟频率（Hz）
    pub fn core_clock(&self) -> u32 {
        CORE_CLOCK_HZ
    }

    /// 总线状态与错误计数
    ///
    /// 主机传输不上报错误状态：停止时为 `Stopped`，启动时为 `ErrorActive`，计数恒为 0。
    pub fn state(&self) -> (BusState, ErrorCounters) {
        let state = if self.ctx.status().started {
            BusState::ErrorActive
        } else {
            BusState::Stopped
        };
        (state, ErrorCounters::default())
    }

    /// 从 bus-off 恢复
    ///
    /// 主机传输不会进入 bus-off，启动状态下直接成功。
    ///
    /// # 错误
    /// - `ControllerError::NotRunning`: 控制器未启动
    pub fn recover(&self, timeout: Duration) -> Result<(), ControllerError> {
        let _ = timeout;
        if !self.ctx.status().started {
            return Err(ControllerError::NotRunning);
        }
        Ok(())
    }

    /// 注册状态变化回调
    ///
    /// 主机传输不上报状态变化，回调只会被保存，不会被调用。
    pub fn set_state_change_callback(&self, callback: Option<StateChangeCallback>) {
        self.control.lock().state_change_callback = callback;
    }

    pub fn has_state_change_callback(&self) -> bool {
        self.control.lock().state_change_callback.is_some()
    }

    // ==================== 过滤器 ====================

    /// 注册接收过滤器
    ///
    /// 回调在接收分发线程上同步调用，不能阻塞，也不能在回调里对同一个控制器
    /// 调用 `add_filter` / `remove_filter`。
    ///
    /// 在回调里同步发送（`send` 不带回调）会卡住分发线程：回环模式下本帧的
    /// 发送权此时还没归还，内层发送最多等待自己的 `timeout` 后返回 `Timeout`；
    /// 拿到发送权时则要等满 [`ControllerConfig::confirm_timeout_ms`]，因为确认
    /// 只能由被卡住的分发线程交付，期间发送权一直被占用。需要在回调里回复时，
    /// 使用 [`send_with_callback`](Self::send_with_callback) 或把帧转交给其他线程。
    ///
    /// # 错误
    /// - `ControllerError::InvalidArgument`: id / mask 超出标识符类型范围
    /// - `ControllerError::CapacityExhausted`: 过滤器表已满
    pub fn add_filter(
        &self,
        rule: FilterRule,
        callback: impl FrameCallback + 'static,
    ) -> Result<FilterHandle, ControllerError> {
        rule.validate().map_err(ControllerError::InvalidArgument)?;
        self.ctx
            .filters
            .add(rule, callback)
            .ok_or(ControllerError::CapacityExhausted {
                max: self.ctx.filters.capacity(),
            })
    }

    /// 移除过滤器（句柄越界或已空时什么也不做）
    ///
    /// 返回后，被移除的回调不会再被调用。
    pub fn remove_filter(&self, handle: FilterHandle) {
        self.ctx.filters.remove(handle);
    }

    /// 过滤器表容量（与标识符类型无关）
    pub fn max_filters(&self, id_type: IdType) -> usize {
        let _ = id_type;
        self.ctx.filters.capacity()
    }

    // ==================== 发送 ====================

    /// 发送一帧
    ///
    /// - `timeout`: 等待发送权（上一帧被确认）的最长时间，`Duration::ZERO` 表示不等待
    /// - `callback`: 提供时立即返回，确认到达后在接收分发线程上以 `Ok(())` 调用；
    ///   不提供时阻塞到确认到达（上限为 [`ControllerConfig::confirm_timeout_ms`]）
    ///
    /// 不要在发送完成回调或过滤器回调里做同步发送：确认由接收分发线程交付，
    /// 分发线程被自己卡住后，内层发送只能等到 `confirm_timeout_ms` 超时，
    /// 此期间发送权被占用、分发暂停。`confirm_timeout_ms` 为无界时会永久卡死。
    ///
    /// # 错误
    /// - `ControllerError::InvalidArgument`: DLC 超出当前模式上限，或标识符越界
    /// - `ControllerError::TransportUnavailable`: 传输句柄已失效
    /// - `ControllerError::NotRunning`: 控制器未启动
    /// - `ControllerError::Timeout`: `timeout` 内没拿到发送权，或同步等待确认超时
    /// - `ControllerError::TransportIo`: 写出失败（不会有确认，回调也不会被调用）
    pub fn send(
        &self,
        frame: &Frame,
        timeout: Duration,
        callback: Option<TxCallback>,
    ) -> Result<(), ControllerError> {
        let status = self.ctx.status();
        let encoded = FrameCodec::new(status.mode.is_fd()).encode(frame)?;

        if !self.tx.lock().is_open() {
            return Err(ControllerError::TransportUnavailable);
        }
        if !status.started {
            return Err(ControllerError::NotRunning);
        }

        if !self.ctx.gate.acquire(timeout) {
            self.ctx.metrics.tx_permit_timeouts.fetch_add(1, Ordering::Relaxed);
            return Err(ControllerError::Timeout);
        }

        // 先登记再写出：确认可能在 write 返回之前就到达
        let waiter = match callback {
            Some(callback) => {
                self.ctx.gate.set_pending(Completion::Callback(callback));
                None
            },
            None => {
                let (done_tx, done_rx) = bounded(1);
                self.ctx.gate.set_pending(Completion::Waiter(done_tx));
                Some(done_rx)
            },
        };

        let written = self.tx.lock().write(&encoded.wire, encoded.mtu);
        if let Err(e) = written {
            // 不会有确认，撤销登记并归还发送权
            self.ctx.gate.clear_pending();
            self.ctx.gate.release();
            self.ctx.metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
            error!("TX on '{}' failed: {}", self.interface, e);
            return Err(e.into());
        }

        self.ctx.metrics.tx_frames_total.fetch_add(1, Ordering::Relaxed);
        trace!(
            "TX frame: id=0x{:X}, dlc={}, mtu={}",
            frame.id, frame.dlc, encoded.mtu
        );

        let Some(done) = waiter else {
            return Ok(());
        };

        let confirmed = match self.config.confirm_timeout() {
            Some(limit) => done.recv_timeout(limit).is_ok(),
            None => done.recv().is_ok(),
        };

        if !confirmed {
            self.ctx.metrics.tx_confirm_timeouts.fetch_add(1, Ordering::Relaxed);
            warn!(
                "TX on '{}': no confirmation for id=0x{:X} within {:?}",
                self.interface,
                frame.id,
                self.config.confirm_timeout()
            );
            return Err(ControllerError::Timeout);
        }
        Ok(())
    }

    /// 同步发送（等待确认）
    pub fn send_blocking(&self, frame: &Frame, timeout: Duration) -> Result<(), ControllerError> {
        self.send(frame, timeout, None)
    }

    /// 异步发送，确认到达后调用 `callback`
    ///
    /// `callback` 在接收分发线程上运行，此时发送权已归还；在其中可以继续
    /// `send_with_callback`，但同步发送会卡住分发线程（见 [`send`](Self::send)）。
    pub fn send_with_callback<F>(
        &self,
        frame: &Frame,
        timeout: Duration,
        callback: F,
    ) -> Result<(), ControllerError>
    where
        F: FnOnce(Result<(), ControllerError>) + Send + 'static,
    {
        self.send(frame, timeout, Some(Box::new(callback)))
    }

    // ==================== 诊断 ====================

    /// 性能指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.ctx.metrics.reset();
    }

    /// 接收分发线程是否仍在运行
    pub fn is_healthy(&self) -> bool {
        self.rx_thread.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// 发送闸门是否空闲（没有未确认的帧）
    pub fn is_tx_idle(&self) -> bool {
        self.ctx.gate.is_idle()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("interface", &self.interface)
            .field("status", &self.ctx.status())
            .field("filters", &self.ctx.filters)
            .finish()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // Release: 分发线程看到 false 时，之前的写入都可见
        self.is_running.store(false, Ordering::Release);

        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.rx_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "RX thread on '{}' panicked or failed to shut down within {:?}",
                self.interface, join_timeout
            );
        }

        trace!("[Auto-Drop] Controller on '{}' closed", self.interface);
    }
}
