//! 事件存储（带代数校验的 slot map）
//!
//! 所有事件都由 arena 持有；事件列表、站点队列、服务槽位只保存句柄。
//! 构造/销毁计数用于在 reset 时检测泄漏。

use super::error::SimError;
use super::event::{Event, EventHandle};
use tracing::trace;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    event: Option<Event>,
}

#[derive(Debug, Default)]
pub struct EventArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    constructed: u64,
    destroyed: u64,
}

impl EventArena {
    /// 放入一个新事件，返回其句柄
    pub fn insert(&mut self, event: Event) -> EventHandle {
        self.constructed = self.constructed.wrapping_add(1);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.event = Some(event);
            return EventHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            event: Some(event),
        });
        EventHandle {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, h: EventHandle) -> Option<&Event> {
        self.slots
            .get(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .and_then(|s| s.event.as_ref())
    }

    pub fn get_mut(&mut self, h: EventHandle) -> Option<&mut Event> {
        self.slots
            .get_mut(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .and_then(|s| s.event.as_mut())
    }

    pub fn contains(&self, h: EventHandle) -> bool {
        self.get(h).is_some()
    }

    /// 释放事件。重复释放或过期句柄返回 `StaleHandle`。
    pub fn remove(&mut self, h: EventHandle) -> Result<Event, SimError> {
        let slot = self
            .slots
            .get_mut(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .ok_or(SimError::StaleHandle(h))?;
        let event = slot.event.take().ok_or(SimError::StaleHandle(h))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(h.index);
        self.destroyed = self.destroyed.wrapping_add(1);
        trace!(name = %event.name, "释放事件");
        Ok(event)
    }

    /// 仍存活的事件数
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.event.is_some()).count()
    }

    pub fn constructed(&self) -> u64 {
        self.constructed
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    /// 丢弃所有残留事件并清零计数（不计入 destroyed）。返回被丢弃的数量。
    pub fn purge(&mut self) -> usize {
        let mut dropped = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.event.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                dropped += 1;
            }
        }
        self.constructed = 0;
        self.destroyed = 0;
        dropped
    }
}
