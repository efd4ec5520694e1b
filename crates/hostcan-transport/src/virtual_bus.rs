//! 进程内虚拟 CAN 总线
//!
//! 行为模拟开启了 `CAN_RAW_RECV_OWN_MSGS` 的 vcan 接口：
//!
//! - 节点写入的帧投递给总线上所有其他节点（普通接收帧）
//! - 同时回显给写入节点本身，并标记为发送确认
//! - FD 帧只投递给开启了 FD 模式的节点；未开启 FD 模式的节点写入 FD MTU 会失败
//!
//! 测试通过 [`NodeControl`] 在节点被控制器接管后继续注入故障：
//! 抑制回显、让写入失败、注入接收帧、关闭节点。
//!
//! # 示例
//!
//! ```rust
//! use hostcan_transport::{CAN_MTU, RxChannel, Transport, TxChannel, VirtualBus, WireFrame};
//! use std::time::Duration;
//!
//! let bus = VirtualBus::new();
//! let (mut a_rx, mut a_tx) = bus.open("a").split().unwrap();
//! let (mut b_rx, _b_tx) = bus.open("b").split().unwrap();
//!
//! let frame = WireFrame { can_id: 0x123, len: 1, ..WireFrame::default() };
//! a_tx.write(&frame, CAN_MTU).unwrap();
//!
//! assert!(b_rx.poll(Duration::from_millis(10)).unwrap());
//! assert!(!b_rx.read().unwrap().unwrap().confirmed);
//! assert!(a_rx.read().unwrap().unwrap().confirmed);
//! ```

use crate::{
    CAN_MTU, CANFD_MTU, DeviceError, DeviceErrorKind, RxChannel, RxUnit, Transport,
    TransportError, TxChannel, WireFrame,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// 单个节点的共享状态
#[derive(Debug)]
struct Node {
    name: String,
    inbox: Sender<RxUnit>,
    fd_mode: AtomicBool,
    echo: AtomicBool,
    fail_writes: AtomicBool,
    open: AtomicBool,
    frames_written: AtomicU64,
}

#[derive(Debug, Default)]
struct BusInner {
    nodes: Mutex<Vec<Arc<Node>>>,
}

/// 虚拟总线句柄（可克隆，所有克隆共享同一条总线）
#[derive(Debug, Clone, Default)]
pub struct VirtualBus {
    inner: Arc<BusInner>,
}

impl VirtualBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在总线上打开一个新节点
    pub fn open(&self, name: impl Into<String>) -> VirtualTransport {
        let (inbox, inbox_rx) = unbounded();
        let node = Arc::new(Node {
            name: name.into(),
            inbox,
            fd_mode: AtomicBool::new(false),
            echo: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            open: AtomicBool::new(true),
            frames_written: AtomicU64::new(0),
        });

        self.inner.nodes.lock().push(node.clone());
        trace!("Virtual bus node '{}' attached", node.name);

        VirtualTransport {
            bus: self.clone(),
            node,
            inbox: inbox_rx,
        }
    }

    /// 当前挂在总线上的节点数
    pub fn node_count(&self) -> usize {
        self.inner.nodes.lock().len()
    }

    /// 以"外部节点"身份向所有节点投递一帧
    pub fn inject(&self, frame: WireFrame) {
        for node in self.inner.nodes.lock().iter() {
            if node.open.load(Ordering::Acquire) && (!frame.is_fd() || node.fd_mode.load(Ordering::Acquire)) {
                let _ = node.inbox.send(RxUnit::inbound(frame));
            }
        }
    }

    fn deliver(&self, from: &Arc<Node>, frame: WireFrame, is_fd: bool) {
        let nodes = self.inner.nodes.lock();
        for node in nodes.iter() {
            if Arc::ptr_eq(node, from) {
                if node.echo.load(Ordering::Acquire) {
                    let _ = node.inbox.send(RxUnit::confirmation(frame));
                }
                continue;
            }

            if !node.open.load(Ordering::Acquire) {
                continue;
            }
            if is_fd && !node.fd_mode.load(Ordering::Acquire) {
                continue;
            }
            let _ = node.inbox.send(RxUnit::inbound(frame));
        }
    }

    fn detach(&self, node: &Arc<Node>) {
        self.inner.nodes.lock().retain(|n| !Arc::ptr_eq(n, node));
        trace!("Virtual bus node '{}' detached", node.name);
    }
}

/// 虚拟总线上的一个节点（分离前）
#[derive(Debug)]
pub struct VirtualTransport {
    bus: VirtualBus,
    node: Arc<Node>,
    inbox: Receiver<RxUnit>,
}

impl VirtualTransport {
    /// 获取故障注入句柄
    pub fn control(&self) -> NodeControl {
        NodeControl {
            node: self.node.clone(),
        }
    }
}

impl Transport for VirtualTransport {
    type Rx = VirtualRx;
    type Tx = VirtualTx;

    fn interface(&self) -> &str {
        &self.node.name
    }

    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError> {
        let rx = VirtualRx {
            bus: self.bus.clone(),
            node: self.node.clone(),
            inbox: self.inbox,
            pending: None,
        };
        let tx = VirtualTx {
            bus: self.bus,
            node: self.node,
        };
        Ok((rx, tx))
    }
}

/// 虚拟节点接收端
#[derive(Debug)]
pub struct VirtualRx {
    bus: VirtualBus,
    node: Arc<Node>,
    inbox: Receiver<RxUnit>,
    /// poll 时预取的单元（crossbeam 通道没有 peek）
    pending: Option<RxUnit>,
}

impl RxChannel for VirtualRx {
    fn poll(&mut self, timeout: Duration) -> Result<bool, TransportError> {
        if self.pending.is_some() || !self.inbox.is_empty() {
            return Ok(true);
        }

        match self.inbox.recv_timeout(timeout) {
            Ok(unit) => {
                self.pending = Some(unit);
                Ok(true)
            },
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn read(&mut self) -> Result<Option<RxUnit>, TransportError> {
        if let Some(unit) = self.pending.take() {
            return Ok(Some(unit));
        }
        Ok(self.inbox.try_recv().ok())
    }
}

impl Drop for VirtualRx {
    fn drop(&mut self) {
        self.node.open.store(false, Ordering::Release);
        self.bus.detach(&self.node);
    }
}

/// 虚拟节点发送端
#[derive(Debug)]
pub struct VirtualTx {
    bus: VirtualBus,
    node: Arc<Node>,
}

impl TxChannel for VirtualTx {
    fn write(&mut self, frame: &WireFrame, mtu: usize) -> Result<usize, TransportError> {
        if !self.node.open.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        if self.node.fail_writes.load(Ordering::Acquire) {
            return Err(TransportError::Io(std::io::Error::other(format!(
                "injected write failure on '{}'",
                self.node.name
            ))));
        }

        let is_fd = match mtu {
            CAN_MTU => false,
            CANFD_MTU => true,
            _ => {
                return Err(TransportError::Device(DeviceError::new(
                    DeviceErrorKind::InvalidFrame,
                    format!("invalid MTU {} for '{}'", mtu, self.node.name),
                )));
            },
        };

        // 与内核一致：未开启 CAN_RAW_FD_FRAMES 时写 FD MTU 返回 EINVAL
        if is_fd && !self.node.fd_mode.load(Ordering::Acquire) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("CAN FD frames not enabled on '{}'", self.node.name),
            )));
        }

        // 经过一次线格式序列化，保证对端看到的与真实 socket 一致
        let bytes = frame.to_bytes(mtu);
        let wire = WireFrame::from_bytes(&bytes[..mtu])?;

        self.node.frames_written.fetch_add(1, Ordering::Relaxed);
        self.bus.deliver(&self.node, wire, is_fd);

        trace!(
            "Virtual bus '{}' wrote can_id=0x{:X}, len={}",
            self.node.name, wire.can_id, wire.len
        );
        Ok(mtu)
    }

    fn set_fd_mode(&mut self, enabled: bool) -> Result<(), TransportError> {
        self.node.fd_mode.store(enabled, Ordering::Release);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.node.open.load(Ordering::Acquire)
    }
}

/// 节点故障注入句柄
#[derive(Debug, Clone)]
pub struct NodeControl {
    node: Arc<Node>,
}

impl NodeControl {
    /// 是否回显本节点发出的帧（关闭后发送永远得不到确认）
    pub fn set_echo(&self, enabled: bool) {
        self.node.echo.store(enabled, Ordering::Release);
    }

    /// 让后续写入全部失败
    pub fn set_fail_writes(&self, enabled: bool) {
        self.node.fail_writes.store(enabled, Ordering::Release);
    }

    /// 关闭节点（传输句柄失效）
    pub fn close(&self) {
        self.node.open.store(false, Ordering::Release);
    }

    /// 直接向本节点注入一个接收单元
    pub fn inject(&self, unit: RxUnit) {
        let _ = self.node.inbox.send(unit);
    }

    /// 本节点成功写入的帧数
    pub fn frames_written(&self) -> u64 {
        self.node.frames_written.load(Ordering::Relaxed)
    }

    pub fn fd_mode(&self) -> bool {
        self.node.fd_mode.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.node.open.load(Ordering::Acquire)
    }
}
