//! 接收过滤器表
//!
//! 固定容量的槽位数组，句柄就是槽位下标。所有读写都在同一把互斥锁下进行，
//! 一次分发会在整个扇出期间持有该锁，因此：
//!
//! - `remove` 返回之后，被移除的回调不会再被调用
//! - 回调内部**不能**对同一个控制器调用 `add_filter` / `remove_filter`（锁不可重入）
//!
//! # 使用示例
//!
//! ```rust
//! use hostcan_driver::filter::{FilterRule, FilterTable};
//! use hostcan_frame::{Frame, IdType};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! let table = FilterTable::new(4);
//! let count = Arc::new(AtomicU64::new(0));
//! let count_clone = count.clone();
//!
//! let handle = table
//!     .add(FilterRule::new(0x100, 0x700, IdType::Standard), move |_frame: Frame| {
//!         count_clone.fetch_add(1, Ordering::Relaxed);
//!     })
//!     .unwrap();
//! assert_eq!(handle.index(), 0);
//!
//! table.dispatch(&Frame::new_standard(0x1AB, &[]));
//! assert_eq!(count.load(Ordering::Relaxed), 1);
//! ```

use hostcan_frame::{Frame, IdType};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 帧回调 Trait
///
/// 在接收分发线程上同步调用，每个回调拿到自己的帧副本。
///
/// # 性能要求
///
/// - **非阻塞**: 回调执行期间过滤器表被锁住，下一帧也在等待
/// - **Channel 模式**: 推荐使用 `crossbeam_channel::Sender::try_send` 把帧转交给其他线程
///
/// 闭包 `Fn(Frame) + Send + Sync` 自动实现此 trait。
pub trait FrameCallback: Send + Sync {
    /// 收到匹配的帧时调用
    fn on_frame(&self, frame: Frame);
}

impl<F> FrameCallback for F
where
    F: Fn(Frame) + Send + Sync,
{
    fn on_frame(&self, frame: Frame) {
        self(frame)
    }
}

/// 过滤规则
///
/// 匹配条件：`frame.id_type == rule.id_type && (frame.id & mask) == (rule.id & mask)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterRule {
    pub id: u32,
    pub mask: u32,
    pub id_type: IdType,
}

impl FilterRule {
    pub const fn new(id: u32, mask: u32, id_type: IdType) -> Self {
        Self { id, mask, id_type }
    }

    /// 精确匹配一个标识符
    pub const fn exact(id: u32, id_type: IdType) -> Self {
        Self::new(id, id_type.max_id(), id_type)
    }

    /// 匹配某一类型的全部帧
    pub const fn accept_all(id_type: IdType) -> Self {
        Self::new(0, 0, id_type)
    }

    pub fn matches(&self, frame: &Frame) -> bool {
        frame.id_type == self.id_type && (frame.id & self.mask) == (self.id & self.mask)
    }

    /// 检查 id / mask 没有超出该标识符类型的位宽
    pub fn validate(&self) -> Result<(), String> {
        let max = self.id_type.max_id();
        if self.id > max || self.mask > max {
            return Err(format!(
                "filter id 0x{:X} / mask 0x{:X} exceeds {} range (max 0x{:X})",
                self.id,
                self.mask,
                self.id_type.as_str(),
                max
            ));
        }
        Ok(())
    }
}

/// 过滤器句柄（槽位下标，移除前一直有效）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterHandle(pub usize);

impl FilterHandle {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FilterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct FilterEntry {
    rule: FilterRule,
    callback: Arc<dyn FrameCallback>,
}

/// 过滤器表
pub struct FilterTable {
    slots: Mutex<Vec<Option<FilterEntry>>>,
    capacity: usize,
}

impl FilterTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: Mutex::new(slots),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 已占用的槽位数
    pub fn len(&self) -> usize {
        self.slots.lock().iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 把回调放进下标最小的空槽位
    ///
    /// 表满时返回 `None`，表内容不变。
    pub fn add(&self, rule: FilterRule, callback: impl FrameCallback + 'static) -> Option<FilterHandle> {
        self.add_arc(rule, Arc::new(callback))
    }

    pub fn add_arc(&self, rule: FilterRule, callback: Arc<dyn FrameCallback>) -> Option<FilterHandle> {
        let mut slots = self.slots.lock();
        let index = slots.iter().position(|slot| slot.is_none())?;
        slots[index] = Some(FilterEntry { rule, callback });

        debug!(
            "Filter #{} added: id=0x{:X}, mask=0x{:X}, {}",
            index,
            rule.id,
            rule.mask,
            rule.id_type.as_str()
        );
        Some(FilterHandle(index))
    }

    /// 清空槽位（越界或已空时什么也不做）
    ///
    /// 返回是否真的移除了一个过滤器。
    pub fn remove(&self, handle: FilterHandle) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(handle.0) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                debug!("Filter {} removed", handle);
                true
            },
            _ => false,
        }
    }

    /// 规则（槽位为空时返回 `None`）
    pub fn rule(&self, handle: FilterHandle) -> Option<FilterRule> {
        self.slots.lock().get(handle.0)?.as_ref().map(|entry| entry.rule)
    }

    /// 按下标顺序把帧分发给所有匹配的回调，返回匹配数
    pub fn dispatch(&self, frame: &Frame) -> usize {
        let slots = self.slots.lock();
        let mut matched = 0;
        for entry in slots.iter().flatten() {
            if entry.rule.matches(frame) {
                entry.callback.on_frame(*frame);
                matched += 1;
            }
        }
        matched
    }
}

impl fmt::Debug for FilterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterTable")
            .field("capacity", &self.capacity)
            .field("occupied", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counter() -> (Arc<AtomicU64>, impl FrameCallback + 'static) {
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        (count, move |_frame: Frame| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_rule_matches_mask() {
        let rule = FilterRule::new(0x100, 0x700, IdType::Standard);
        assert!(rule.matches(&Frame::new_standard(0x100, &[])));
        assert!(rule.matches(&Frame::new_standard(0x1FF, &[])));
        assert!(!rule.matches(&Frame::new_standard(0x200, &[])));
        assert!(!rule.matches(&Frame::new_standard(0x0FF, &[])));
        // 类型不同不匹配
        assert!(!rule.matches(&Frame::new_extended(0x100, &[])));
    }

    #[test]
    fn test_rule_exact_and_accept_all() {
        let exact = FilterRule::exact(0x123, IdType::Standard);
        assert!(exact.matches(&Frame::new_standard(0x123, &[])));
        assert!(!exact.matches(&Frame::new_standard(0x124, &[])));

        let all = FilterRule::accept_all(IdType::Extended);
        assert!(all.matches(&Frame::new_extended(0x1FFF_FFFF, &[])));
        assert!(!all.matches(&Frame::new_standard(0x1, &[])));
    }

    #[test]
    fn test_rule_validate() {
        assert!(FilterRule::exact(0x7FF, IdType::Standard).validate().is_ok());
        assert!(FilterRule::new(0x800, 0x7FF, IdType::Standard).validate().is_err());
        assert!(FilterRule::new(0x1, 0xFFFF, IdType::Standard).validate().is_err());
        assert!(FilterRule::new(0x800, 0xFFFF, IdType::Extended).validate().is_ok());
    }

    #[test]
    fn test_capacity_exhausted_keeps_entries() {
        let table = FilterTable::new(2);
        let (count, cb) = counter();
        let (_, cb2) = counter();
        let (_, cb3) = counter();

        assert_eq!(table.add(FilterRule::accept_all(IdType::Standard), cb), Some(FilterHandle(0)));
        assert_eq!(table.add(FilterRule::accept_all(IdType::Standard), cb2), Some(FilterHandle(1)));
        assert_eq!(table.add(FilterRule::accept_all(IdType::Standard), cb3), None);
        assert_eq!(table.len(), 2);

        assert_eq!(table.dispatch(&Frame::new_standard(0x1, &[])), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_then_reuse_lowest_slot() {
        let table = FilterTable::new(4);
        for _ in 0..3 {
            let (_, cb) = counter();
            table.add(FilterRule::accept_all(IdType::Standard), cb).unwrap();
        }

        assert!(table.remove(FilterHandle(1)));
        assert_eq!(table.rule(FilterHandle(1)), None);

        let (_, cb) = counter();
        assert_eq!(
            table.add(FilterRule::exact(0x42, IdType::Standard), cb),
            Some(FilterHandle(1))
        );
        assert_eq!(
            table.rule(FilterHandle(1)),
            Some(FilterRule::exact(0x42, IdType::Standard))
        );
    }

    #[test]
    fn test_remove_out_of_range_or_empty_is_noop() {
        let table = FilterTable::new(2);
        assert!(!table.remove(FilterHandle(0)));
        assert!(!table.remove(FilterHandle(99)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_removed_callback_not_invoked() {
        let table = FilterTable::new(2);
        let (count, cb) = counter();
        let handle = table.add(FilterRule::accept_all(IdType::Standard), cb).unwrap();

        table.dispatch(&Frame::new_standard(0x1, &[]));
        table.remove(handle);
        table.dispatch(&Frame::new_standard(0x1, &[]));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_order_follows_handles() {
        let table = FilterTable::new(4);
        let (tx, rx) = unbounded();

        for i in 0..3usize {
            let tx = tx.clone();
            table
                .add(FilterRule::accept_all(IdType::Standard), move |_frame: Frame| {
                    let _ = tx.send(i);
                })
                .unwrap();
        }

        assert_eq!(table.dispatch(&Frame::new_standard(0x10, &[])), 3);
        let order: Vec<usize> = rx.try_iter().collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_each_callback_gets_private_copy() {
        let table = FilterTable::new(2);
        let (tx, rx) = unbounded();

        table
            .add(FilterRule::accept_all(IdType::Standard), |mut frame: Frame| {
                // 修改自己的副本
                frame.data[0] = 0xFF;
                frame.id = 0;
            })
            .unwrap();
        table
            .add(FilterRule::accept_all(IdType::Standard), move |frame: Frame| {
                let _ = tx.send(frame);
            })
            .unwrap();

        let frame = Frame::new_standard(0x123, &[0x01]);
        table.dispatch(&frame);
        assert_eq!(rx.try_recv().unwrap(), frame);
    }
}
