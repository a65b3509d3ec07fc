//! 站点内部的等待队列（FIFO）

use std::collections::VecDeque;

use crate::sim::{EventArena, EventHandle};

#[derive(Debug, Default)]
pub struct ReadyQueue {
    q: VecDeque<EventHandle>,
}

impl ReadyQueue {
    pub fn push(&mut self, h: EventHandle) {
        self.q.push_back(h);
    }

    pub fn pop(&mut self) -> Option<EventHandle> {
        self.q.pop_front()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventHandle> {
        self.q.iter()
    }

    /// 释放队列中缓存的所有事件
    pub fn release_all(&mut self, arena: &mut EventArena) -> usize {
        self.q
            .drain(..)
            .filter(|h| arena.remove(*h).is_ok())
            .count()
    }
}
