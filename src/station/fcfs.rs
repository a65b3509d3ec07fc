//! FCFS 站点
//!
//! 单服务台，先来先服务。新到达的作业排在服务中作业之后。

use super::StationCore;
use super::ready_queue::ReadyQueue;
use crate::sim::{EventHandle, EventKind, Scheduler, SimError, SimTime};
use tracing::{debug, trace};

#[derive(Debug)]
pub struct FcfsStation {
    pub(super) core: StationCore,
    pub(super) in_service: Option<EventHandle>,
    pub(super) queue: ReadyQueue,
}

impl FcfsStation {
    pub(super) fn new(core: StationCore) -> Self {
        Self {
            core,
            in_service: None,
            queue: ReadyQueue::default(),
        }
    }

    /// (站内人数, 排队人数, 忙碌服务台数)
    pub(super) fn occupancy(&self) -> (usize, usize, usize) {
        let queued = self.queue.len();
        let busy = usize::from(self.in_service.is_some());
        (queued + busy, queued, busy)
    }

    pub(super) fn sync(&mut self, now: SimTime) {
        let (n, q, b) = self.occupancy();
        self.core.stats.advance(now, n, q, b);
    }

    #[tracing::instrument(skip(self, sched), fields(station = %self.core.name))]
    pub(super) fn process_arrival(
        &mut self,
        h: EventHandle,
        sched: &mut Scheduler,
    ) -> Result<(), SimError> {
        let now = sched.now();
        self.sync(now);
        self.core.stats.record_arrival(now);

        if let Some(svc) = self.core.draw_service(sched) {
            sched.event_mut(h)?.service_time = svc;
        }

        if self.in_service.is_some() {
            self.queue.push(h);
            debug!(queue_len = self.queue.len(), "服务台忙，作业进入等待队列");
            return Ok(());
        }
        self.start_service(h, sched)
    }

    fn start_service(&mut self, h: EventHandle, sched: &mut Scheduler) -> Result<(), SimError> {
        let now = sched.now();
        let id = self.core.id;
        let ev = sched.event_mut(h)?;
        let svc = ev.service_time.max(0.0);
        ev.kind = EventKind::Departure;
        ev.occur_time = now.after(svc);
        ev.service_time = 0.0;
        ev.station = id;
        trace!(name = %ev.name, service = svc, depart = %ev.occur_time, "开始服务");

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
        self.sync(sched.now());
        self.core.vacate(&mut self.in_service, h, sched)?;
        self.core.stats.completions += 1;

        let dest = self.core.next_destination(sched);
        debug!(?dest, "作业完成服务");
        sched.route(h, dest)?;

        if let Some(next) = self.queue.pop() {
            self.start_service(next, sched)?;
        }
        Ok(())
    }
}
