//! 全局事件列表
//!
//! 按 `occur_time` 升序保存待处理事件；相同时间戳保持插入顺序。

use std::collections::VecDeque;

use super::arena::EventArena;
use super::error::SimError;
use super::event::EventHandle;
use super::scheduled_event::{EventOrder, ScheduledEvent, by_occur_time};
use super::time::SimTime;
use tracing::{debug, trace};

#[derive(Debug)]
pub struct EventList {
    entries: VecDeque<ScheduledEvent>,
    next_seq: u64,
    order: EventOrder,
}

impl Default for EventList {
    fn default() -> Self {
        Self::with_order(by_occur_time)
    }
}

impl EventList {
    pub fn with_order(order: EventOrder) -> Self {
        Self {
            entries: VecDeque::new(),
            next_seq: 0,
            order,
        }
    }

    /// 按列表自身的排序规则插入
    pub fn insert(&mut self, handle: EventHandle, at: SimTime) {
        let order = self.order;
        self.insert_with(handle, at, order);
    }

    /// 按给定排序规则插入。新条目排在所有与其相等的条目之后。
    pub fn insert_with(&mut self, handle: EventHandle, at: SimTime, order: EventOrder) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        let item = ScheduledEvent { at, seq, handle };
        let pos = self
            .entries
            .partition_point(|e| order(e, &item) != std::cmp::Ordering::Greater);
        self.entries.insert(pos, item);
        trace!(at = %at, seq, pos, len = self.entries.len(), "事件插入列表");
    }

    /// 取出最早的事件
    pub fn dequeue(&mut self) -> Result<ScheduledEvent, SimError> {
        self.entries.pop_front().ok_or(SimError::EmptyList)
    }

    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.entries.front()
    }

    /// 释放所有剩余事件，返回释放数量
    pub fn clear(&mut self, arena: &mut EventArena) -> usize {
        let mut released = 0;
        for item in self.entries.drain(..) {
            if arena.remove(item.handle).is_ok() {
                released += 1;
            }
        }
        debug!(released, "事件列表已清空");
        released
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 仅用于诊断输出
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.entries.iter()
    }
}
