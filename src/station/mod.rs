//! 站点（服务资源）
//!
//! 站点种类是封闭集合，通过 `match` 分发：
//! - [`FcfsStation`]：单服务台先来先服务
//! - [`CpuStation`]：带时间片的轮转 CPU，完成后按概率表路由
//! - [`DelayStation`]：无限服务台（纯延迟）
//!
//! 站点只能通过调度器的 `schedule` / `route` 投递事件，不直接访问事件列表。

mod cpu;
mod delay;
mod fcfs;
mod id;
mod ready_queue;
mod routing;
mod stats;

pub use cpu::CpuStation;
pub use delay::DelayStation;
pub use fcfs::FcfsStation;
pub use id::StationId;
pub use ready_queue::ReadyQueue;
pub use routing::{Router, Routing};
pub use stats::StationStats;

use crate::sim::{ConfigError, EventArena, EventHandle, EventKind, Scheduler, SimError, SimTime};
use crate::variate::Distribution;
use tracing::trace;

/// 站点种类及其参数
#[derive(Debug, Clone, PartialEq)]
pub enum StationKind {
    Fcfs,
    Cpu { quantum: f64 },
    Delay,
}

/// 构造站点所需的配置
#[derive(Debug, Clone, PartialEq)]
pub struct StationConfig {
    pub name: String,
    pub kind: StationKind,
    /// 站点自己的服务时间分布；为空时使用事件携带的服务时间
    pub service: Option<Distribution>,
    pub routing: Routing,
}

impl StationConfig {
    pub fn fcfs(name: impl Into<String>) -> Self {
        Self::new(name, StationKind::Fcfs)
    }

    pub fn cpu(name: impl Into<String>, quantum: f64) -> Self {
        Self::new(name, StationKind::Cpu { quantum })
    }

    pub fn delay(name: impl Into<String>) -> Self {
        Self::new(name, StationKind::Delay)
    }

    fn new(name: impl Into<String>, kind: StationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            service: None,
            routing: Routing::Exit,
        }
    }

    pub fn with_service(mut self, dist: Distribution) -> Self {
        self.service = Some(dist);
        self
    }

    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }
}

/// 各种站点共享的部分：标识、统计、服务分布与路由。
#[derive(Debug)]
pub struct StationCore {
    id: StationId,
    name: String,
    stats: StationStats,
    service: Option<Distribution>,
    routing: Routing,
    service_stream: String,
    route_stream: String,
}

impl StationCore {
    fn new(id: StationId, cfg: StationConfig) -> Result<Self, ConfigError> {
        if let Some(d) = &cfg.service {
            d.validate()?;
        }
        Ok(Self {
            id,
            service_stream: format!("{}.service", cfg.name),
            route_stream: format!("{}.route", cfg.name),
            name: cfg.name,
            stats: StationStats::default(),
            service: cfg.service,
            routing: cfg.routing,
        })
    }

    /// 按站点自己的分布抽取服务时间
    fn draw_service(&self, sched: &mut Scheduler) -> Option<f64> {
        let dist = self.service.as_ref()?;
        Some(sched.variates_mut().draw(&self.service_stream, dist))
    }

    /// 作业完成后的下一站；`None` 表示离开网络
    fn next_destination(&self, sched: &mut Scheduler) -> Option<StationId> {
        match &self.routing {
            Routing::Exit => None,
            Routing::To(id) => Some(*id),
            Routing::Table(router) => {
                let u = sched.variates_mut().uniform(&self.route_stream);
                Some(router.pick(u))
            }
        }
    }

    /// 腾空服务槽位；槽位为空或被其他事件占用都是不变量破坏
    fn vacate(
        &self,
        slot: &mut Option<EventHandle>,
        h: EventHandle,
        sched: &Scheduler,
    ) -> Result<(), SimError> {
        match *slot {
            None => Err(SimError::IdleDeparture {
                station: self.name.clone(),
                event: sched.event_name(h),
            }),
            Some(cur) if cur != h => Err(SimError::ForeignDeparture {
                station: self.name.clone(),
                event: sched.event_name(h),
                in_service: sched.event_name(cur),
            }),
            Some(_) => {
                *slot = None;
                Ok(())
            }
        }
    }
}

/// 站点
#[derive(Debug)]
pub enum Station {
    Fcfs(FcfsStation),
    Cpu(CpuStation),
    Delay(DelayStation),
}

impl Station {
    pub(crate) fn build(id: StationId, cfg: StationConfig) -> Result<Self, ConfigError> {
        let kind = cfg.kind.clone();
        let core = StationCore::new(id, cfg)?;
        Ok(match kind {
            StationKind::Fcfs => Station::Fcfs(FcfsStation::new(core)),
            StationKind::Cpu { quantum } => Station::Cpu(CpuStation::new(core, quantum)?),
            StationKind::Delay => Station::Delay(DelayStation::new(core)),
        })
    }

    fn core(&self) -> &StationCore {
        match self {
            Station::Fcfs(s) => &s.core,
            Station::Cpu(s) => &s.core,
            Station::Delay(s) => &s.core,
        }
    }

    fn core_mut(&mut self) -> &mut StationCore {
        match self {
            Station::Fcfs(s) => &mut s.core,
            Station::Cpu(s) => &mut s.core,
            Station::Delay(s) => &mut s.core,
        }
    }

    pub fn id(&self) -> StationId {
        self.core().id
    }

    pub fn name(&self) -> &str {
        &self.core().name
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Station::Fcfs(_) => "fcfs",
            Station::Cpu(_) => "cpu",
            Station::Delay(_) => "delay",
        }
    }

    pub fn stats(&self) -> &StationStats {
        &self.core().stats
    }

    pub fn routing(&self) -> &Routing {
        &self.core().routing
    }

    pub(crate) fn set_routing(&mut self, routing: Routing) {
        self.core_mut().routing = routing;
    }

    /// 当前站内作业数（排队 + 服务中 + 已派发待重入）
    pub fn population(&self) -> usize {
        self.occupancy().0
    }

    /// 尚未完成的工作量：arrivals - completions
    pub fn outstanding(&self) -> u64 {
        let st = self.stats();
        st.arrivals.saturating_sub(st.completions)
    }

    /// 暴露内部等待队列的能力（仅缓存作业的站点才有）
    pub fn queue(&self) -> Option<&ReadyQueue> {
        match self {
            Station::Fcfs(s) => Some(&s.queue),
            Station::Cpu(s) => Some(&s.ready),
            Station::Delay(_) => None,
        }
    }

    pub fn is_queue_holder(&self) -> bool {
        self.queue().is_some()
    }

    /// 正在服务的事件（单服务台站点）
    pub fn under_process(&self) -> Option<EventHandle> {
        match self {
            Station::Fcfs(s) => s.in_service,
            Station::Cpu(s) => s.in_service,
            Station::Delay(_) => None,
        }
    }

    fn occupancy(&self) -> (usize, usize, usize) {
        match self {
            Station::Fcfs(s) => s.occupancy(),
            Station::Cpu(s) => s.occupancy(),
            Station::Delay(s) => s.occupancy(),
        }
    }

    /// 把时间积分推进到 `now`
    pub fn sync(&mut self, now: SimTime) {
        let (n, q, b) = self.occupancy();
        self.core_mut().stats.advance(now, n, q, b);
    }

    /// 推进到 `now` 后的统计快照（不修改站点）
    pub fn stats_at(&self, now: SimTime) -> StationStats {
        let mut st = self.stats().clone();
        let (n, q, b) = self.occupancy();
        st.advance(now, n, q, b);
        st
    }

    pub fn initialize(&mut self, now: SimTime) {
        self.core_mut().stats.restart(now);
    }

    /// 清空计数并释放缓存的事件。服务中的事件由事件列表持有，不在此释放。
    pub fn reset(&mut self, now: SimTime, arena: &mut EventArena) -> usize {
        let released = match self {
            Station::Fcfs(s) => {
                s.in_service = None;
                s.queue.release_all(arena)
            }
            Station::Cpu(s) => {
                s.in_service = None;
                s.dispatched = 0;
                s.ready.release_all(arena)
            }
            Station::Delay(s) => {
                s.in_service = 0;
                0
            }
        };
        self.initialize(now);
        released
    }

    /// 按事件类型分发到对应的状态迁移
    pub(crate) fn process(
        &mut self,
        h: EventHandle,
        kind: EventKind,
        sched: &mut Scheduler,
    ) -> Result<(), SimError> {
        trace!(station = %self.name(), ?kind, "站点处理事件");
        match (self, kind) {
            (st, EventKind::Probe) => {
                st.probe(sched.now());
                Ok(())
            }
            (st, EventKind::End) => {
                st.finish(sched.now());
                Ok(())
            }
            (Station::Fcfs(s), EventKind::Arrival) => s.process_arrival(h, sched),
            (Station::Fcfs(s), EventKind::Departure) => s.process_departure(h, sched),
            (Station::Cpu(s), EventKind::Arrival) => s.process_arrival(h, sched),
            (Station::Cpu(s), EventKind::Departure) => s.process_departure(h, sched),
            (Station::Delay(s), EventKind::Arrival) => s.process_arrival(h, sched),
            (Station::Delay(s), EventKind::Departure) => s.process_departure(h, sched),
        }
    }

    /// 只读采样：记录当前人数
    pub fn probe(&mut self, now: SimTime) {
        self.sync(now);
        let pop = self.population() as u64;
        let st = &mut self.core_mut().stats;
        st.probes += 1;
        st.probe_population += pop;
    }

    /// END：更新最终统计
    pub fn finish(&mut self, now: SimTime) {
        self.sync(now);
    }
}
