//! 调度事件
//!
//! 定义事件列表中的条目及默认的排序规则。

use super::event::EventHandle;
use super::time::SimTime;
use std::cmp::Ordering;

/// 事件列表条目，包含发生时间、插入序号和事件句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub at: SimTime,
    pub seq: u64,
    pub handle: EventHandle,
}

/// 条目比较函数：返回 `Less` 表示左侧应先出队。
pub type EventOrder = fn(&ScheduledEvent, &ScheduledEvent) -> Ordering;

/// 默认顺序：按发生时间升序，同一时刻按插入顺序（FIFO）。
pub fn by_occur_time(a: &ScheduledEvent, b: &ScheduledEvent) -> Ordering {
    match a.at.cmp(&b.at) {
        Ordering::Equal => a.seq.cmp(&b.seq),
        ord => ord,
    }
}
