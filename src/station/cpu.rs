//! 轮转（round-robin）CPU 站点
//!
//! 每次最多服务一个作业，时间片为 `quantum`：
//! - 新到达的作业抽取完整的 burst；若 CPU 忙或就绪队列非空则排队。
//! - 时间片结束时若服务需求耗尽则按路由表离开，否则回到就绪队列末尾。
//! - 槽位腾空后，就绪队列队首在当前时刻以 `Resume` 阶段重新到达。
//!
//! `dispatched` 记录已从就绪队列派发、尚未重新到达的作业数，
//! 派发期间槽位视为被预留。

use super::StationCore;
use super::ready_queue::ReadyQueue;
use crate::sim::{ConfigError, EventHandle, EventKind, JobPhase, Scheduler, SimError, SimTime};
use tracing::{debug, trace};

/// 剩余需求不超过 `quantum * (1 + SLICE_TOLERANCE)` 时视为最后一个时间片
const SLICE_TOLERANCE: f64 = 1e-9;

#[derive(Debug)]
pub struct CpuStation {
    pub(super) core: StationCore,
    pub(super) quantum: f64,
    pub(super) in_service: Option<EventHandle>,
    pub(super) ready: ReadyQueue,
    pub(super) dispatched: usize,
}

impl CpuStation {
    pub(super) fn new(core: StationCore, quantum: f64) -> Result<Self, ConfigError> {
        if !quantum.is_finite() || quantum <= 0.0 {
            return Err(ConfigError::InvalidQuantum(quantum));
        }
        Ok(Self {
            core,
            quantum,
            in_service: None,
            ready: ReadyQueue::default(),
            dispatched: 0,
        })
    }

    pub fn quantum(&self) -> f64 {
        self.quantum
    }

    pub(super) fn occupancy(&self) -> (usize, usize, usize) {
        let busy = usize::from(self.in_service.is_some());
        let waiting = self.ready.len() + self.dispatched;
        (waiting + busy, waiting, busy)
    }

    pub(super) fn sync(&mut self, now: SimTime) {
        let (n, q, b) = self.occupancy();
        self.core.stats.advance(now, n, q, b);
    }

    fn slot_reserved(&self) -> bool {
        self.in_service.is_some() || self.dispatched > 0 || !self.ready.is_empty()
    }

    #[tracing::instrument(skip(self, sched), fields(station = %self.core.name))]
    pub(super) fn process_arrival(
        &mut self,
        h: EventHandle,
        sched: &mut Scheduler,
    ) -> Result<(), SimError> {
        let now = sched.now();
        self.sync(now);

        let drawn = {
            let phase = sched.event(h)?.phase;
            match phase {
                JobPhase::Fresh => Some(self.core.draw_service(sched)),
                JobPhase::Resume => None,
            }
        };

        match drawn {
            Some(burst) => {
                self.core.stats.record_arrival(now);
                let ev = sched.event_mut(h)?;
                ev.phase = JobPhase::Resume;
                if let Some(b) = burst {
                    ev.service_time = b;
                }
                debug!(name = %ev.name, burst = ev.service_time, "新进程加入");
                if self.slot_reserved() {
                    self.ready.push(h);
                    return Ok(());
                }
            }
            None => {
                if self.dispatched == 0 {
                    return Err(SimError::UnexpectedResume {
                        station: self.core.name.clone(),
                        event: sched.event_name(h),
                    });
                }
                self.dispatched -= 1;
                if self.in_service.is_some() {
                    return Err(SimError::SlotOccupied {
                        station: self.core.name.clone(),
                        event: sched.event_name(h),
                    });
                }
            }
        }

        self.start_slice(h, sched)
    }

    fn start_slice(&mut self, h: EventHandle, sched: &mut Scheduler) -> Result<(), SimError> {
        let now = sched.now();
        let id = self.core.id;
        let quantum = self.quantum;
        let ev = sched.event_mut(h)?;
        let remaining = ev.service_time.max(0.0);
        // 逐片相减的舍入残差不能再占用一个时间片
        let last = remaining <= quantum * (1.0 + SLICE_TOLERANCE);
        let slice = if last { remaining } else { quantum };
        ev.service_time = if last { 0.0 } else { remaining - quantum };
        ev.kind = EventKind::Departure;
        ev.occur_time = now.after(slice);
        ev.station = id;
        trace!(name = %ev.name, slice, remaining = ev.service_time, "分配时间片");

        self.in_service = Some(h);
        self.core.stats.slices += 1;
        sched.schedule(h)
    }

    #[tracing::instrument(skip(self, sched), fields(station = %self.core.name))]
    pub(super) fn process_departure(
        &mut self,
        h: EventHandle,
        sched: &mut Scheduler,
    ) -> Result<(), SimError> {
        let now = sched.now();
        self.sync(now);
        self.core.vacate(&mut self.in_service, h, sched)?;

        if sched.event(h)?.is_finished() {
            self.core.stats.completions += 1;
            let dest = self.core.next_destination(sched);
            debug!(?dest, "进程 burst 结束，离开 CPU");
            sched.route(h, dest)?;
        } else {
            sched.event_mut(h)?.kind = EventKind::Arrival;
            self.ready.push(h);
            trace!(ready = self.ready.len(), "时间片用完，回到就绪队列");
        }

        if let Some(next) = self.ready.pop() {
            let ev = sched.event_mut(next)?;
            ev.kind = EventKind::Arrival;
            ev.phase = JobPhase::Resume;
            ev.occur_time = now;
            self.dispatched += 1;
            sched.schedule(next)?;
        }
        Ok(())
    }
}
