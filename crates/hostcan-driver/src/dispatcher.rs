//! 接收分发线程
//!
//! 从控制器创建起一直运行，直到控制器被 drop：
//!
//! 1. 传输层报告可读时逐个读取单元
//! 2. 发送确认：回环开启且控制器已启动时，把该帧作为自收帧送入过滤器分发；
//!    然后归还发送权、完成待完成项
//! 3. 真实接收帧：解码后送入过滤器分发
//! 4. 无数据：退出内层循环，休眠一个轮询间隔

use crate::context::ControllerContext;
use hostcan_frame::from_wire;
use hostcan_transport::{RxChannel, RxUnit, TransportError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, trace, warn};

/// 接收分发循环
///
/// # 参数
/// - `rx`: 接收通道（本线程独占）
/// - `ctx`: 共享上下文
/// - `poll_interval`: 无数据时的休眠间隔
/// - `realtime`: 是否尝试提升线程优先级
/// - `is_running`: 运行标志，每个轮询周期检查一次
pub(crate) fn rx_loop(
    mut rx: impl RxChannel,
    ctx: Arc<ControllerContext>,
    poll_interval: Duration,
    realtime: bool,
    is_running: Arc<AtomicBool>,
) {
    if realtime {
        raise_priority();
    }

    loop {
        // Acquire: 看到 false 时也能看到 drop 之前的所有写入
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        loop {
            match rx.poll(Duration::ZERO) {
                Ok(true) => {},
                Ok(false) => break,
                Err(e) => {
                    if handle_transport_error(&ctx, e) {
                        is_running.store(false, Ordering::Release);
                    }
                    break;
                },
            }

            match rx.read() {
                Ok(Some(unit)) => handle_unit(&ctx, unit),
                Ok(None) => break,
                Err(e) => {
                    if handle_transport_error(&ctx, e) {
                        is_running.store(false, Ordering::Release);
                    }
                    break;
                },
            }
        }

        // 使用 spin_sleep 获得比 thread::sleep 更精确的短休眠
        spin_sleep::sleep(poll_interval);
    }

    trace!("RX thread exited");
}

/// 处理一个接收单元
///
/// 回环副本先于发送完成分发：同步发送返回时，匹配的回调已经执行完毕。
pub(crate) fn handle_unit(ctx: &ControllerContext, unit: RxUnit) {
    ctx.metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);

    if unit.confirmed {
        ctx.metrics.tx_confirmations.fetch_add(1, Ordering::Relaxed);
        if ctx.status().loopback_active() {
            ctx.metrics.rx_loopback_frames.fetch_add(1, Ordering::Relaxed);
            dispatch(ctx, &unit);
        }
        ctx.gate.complete();
        return;
    }

    dispatch(ctx, &unit);
}

fn dispatch(ctx: &ControllerContext, unit: &RxUnit) {
    let frame = from_wire(&unit.frame);
    trace!(
        "RX frame: id=0x{:X}, dlc={}, fd={}, loopback={}",
        frame.id, frame.dlc, frame.fd, unit.confirmed
    );

    ctx.metrics.rx_frames_dispatched.fetch_add(1, Ordering::Relaxed);
    let matched = ctx.filters.dispatch(&frame);
    ctx.metrics.filter_matches.fetch_add(matched as u64, Ordering::Relaxed);
}

/// 记录传输层错误，返回是否为致命错误（分发线程应当退出）
fn handle_transport_error(ctx: &ControllerContext, e: TransportError) -> bool {
    ctx.metrics.transport_errors.fetch_add(1, Ordering::Relaxed);

    let is_fatal = match &e {
        TransportError::Closed => true,
        TransportError::Device(device) => device.is_fatal(),
        _ => false,
    };

    if is_fatal {
        error!("RX thread: fatal transport error: {}, stopping dispatcher", e);
    } else {
        warn!("RX thread: transport error: {}", e);
    }
    is_fatal
}

#[cfg(feature = "realtime")]
fn raise_priority() {
    use thread_priority::*;
    use tracing::info;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => info!("RX thread priority set to MAX (realtime)"),
        Err(e) => warn!(
            "Failed to set RX thread priority: {}. \
            On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
            e
        ),
    }
}

#[cfg(not(feature = "realtime"))]
fn raise_priority() {
    warn!("Realtime dispatcher requested but the `realtime` feature is disabled");
}
