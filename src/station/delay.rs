//! 延迟站点（无限服务台）

use super::StationCore;
use crate::sim::{EventHandle, EventKind, Scheduler, SimError, SimTime};
use tracing::debug;

#[derive(Debug)]
pub struct DelayStation {
    pub(super) core: StationCore,
    pub(super) in_service: usize,
}

impl DelayStation {
    pub(super) fn new(core: StationCore) -> Self {
        Self {
            core,
            in_service: 0,
        }
    }

    pub(super) fn occupancy(&self) -> (usize, usize, usize) {
        (self.in_service, 0, self.in_service)
    }

    pub(super) fn sync(&mut self, now: SimTime) {
        let (n, q, b) = self.occupancy();
        self.core.stats.advance(now, n, q, b);
    }

    pub(super) fn process_arrival(
        &mut self,
        h: EventHandle,
        sched: &mut Scheduler,
    ) -> Result<(), SimError> {
        let now = sched.now();
        self.sync(now);
        self.core.stats.record_arrival(now);

        let drawn = self.core.draw_service(sched);
        let id = self.core.id;
        let ev = sched.event_mut(h)?;
        let svc = drawn.unwrap_or(ev.service_time).max(0.0);
        ev.kind = EventKind::Departure;
        ev.occur_time = now.after(svc);
        ev.service_time = 0.0;
        ev.station = id;

        self.in_service += 1;
        self.core.stats.slices += 1;
        sched.schedule(h)
    }

    pub(super) fn process_departure(
        &mut self,
        h: EventHandle,
        sched: &mut Scheduler,
    ) -> Result<(), SimError> {
        self.sync(sched.now());
        if self.in_service == 0 {
            return Err(SimError::IdleDeparture {
                station: self.core.name.clone(),
                event: sched.event_name(h),
            });
        }
        self.in_service -= 1;
        self.core.stats.completions += 1;

        let dest = self.core.next_destination(sched);
        debug!(station = %self.core.name, ?dest, "延迟结束");
        sched.route(h, dest)
    }
}
