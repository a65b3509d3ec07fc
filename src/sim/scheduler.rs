//! 调度器
//!
//! 持有站点注册表、全局事件列表、事件 arena 与随机流，驱动虚拟时钟。
//! 一个调度器对应一条仿真时间线。

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use super::arena::EventArena;
use super::error::{ConfigError, SimError};
use super::event::{Event, EventHandle, EventKind, JobPhase};
use super::event_list::EventList;
use super::time::SimTime;
use crate::report::SimulationReport;
use crate::station::{Station, StationConfig, StationId, Routing};
use crate::variate::{Distribution, VariateSource};

const INTERARRIVAL_STREAM: &str = "arrivals.interarrival";
const ARRIVAL_SERVICE_STREAM: &str = "arrivals.service";

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Uninitialized,
    Running,
    Ended,
    /// 不变量被破坏后的终止状态，只能通过 `reset` 离开
    Aborted,
}

/// 外部到达过程：到达入口站点，携带初始服务时间。
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalProcess {
    pub entry: StationId,
    pub interarrival: Distribution,
    pub service: Distribution,
}

/// 结束条件
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EndCondition {
    /// 不产生 END 事件，由外部驱动（例如再生采样）决定何时停止
    #[default]
    Never,
    /// 在固定时间产生 END
    At(SimTime),
    /// 时钟超过 `warmup` 且被观察站点的 arrivals == completions 时产生 END
    Auto { warmup: SimTime, station: StationId },
}

/// 周期性 PROBE
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSchedule {
    pub station: StationId,
    pub every: f64,
}

/// 最近一次处理的事件
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub kind: EventKind,
    pub station: StationId,
    pub at: SimTime,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Ended,
}

/// reset 的诊断结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResetReport {
    pub released_from_list: usize,
    pub released_from_stations: usize,
    /// constructed - destroyed（清理之后仍未释放的事件数）
    pub leaked: u64,
}

pub struct Scheduler {
    now: SimTime,
    state: RunState,
    stations: Vec<Option<Station>>,
    names: HashMap<String, StationId>,
    events: EventList,
    arena: EventArena,
    variates: VariateSource,
    arrivals: Option<ArrivalProcess>,
    end: EndCondition,
    probe: Option<ProbeSchedule>,
    end_scheduled: bool,
    in_transit: usize,
    next_job: u64,
    processed: u64,
    last_step: Option<StepInfo>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(VariateSource::default())
    }
}

impl Scheduler {
    pub fn new(variates: VariateSource) -> Self {
        Self {
            now: SimTime::ZERO,
            state: RunState::Uninitialized,
            stations: Vec::new(),
            names: HashMap::new(),
            events: EventList::default(),
            arena: EventArena::default(),
            variates,
            arrivals: None,
            end: EndCondition::Never,
            probe: None,
            end_scheduled: false,
            in_transit: 0,
            next_job: 0,
            processed: 0,
            last_step: None,
        }
    }

    // ------------------------------------------------------------------
    // 构建
    // ------------------------------------------------------------------

    /// 注册站点。路由只能指向已注册的站点（或自身）；前向引用请用 `set_routing`。
    pub fn add_station(&mut self, cfg: StationConfig) -> Result<StationId, ConfigError> {
        if self.names.contains_key(&cfg.name) {
            return Err(ConfigError::DuplicateStation(cfg.name));
        }
        let id = StationId(self.stations.len());
        self.check_targets(&cfg.routing, self.stations.len() + 1)?;
        let name = cfg.name.clone();
        let station = Station::build(id, cfg)?;
        self.stations.push(Some(station));
        self.names.insert(name.clone(), id);
        debug!(station = %name, ?id, "注册站点");
        Ok(id)
    }

    pub fn set_routing(&mut self, id: StationId, routing: Routing) -> Result<(), ConfigError> {
        self.check_targets(&routing, self.stations.len())?;
        let st = self
            .stations
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| ConfigError::UnknownStation(id.to_string()))?;
        st.set_routing(routing);
        Ok(())
    }

    fn check_targets(&self, routing: &Routing, bound: usize) -> Result<(), ConfigError> {
        match routing.targets().into_iter().find(|t| t.0 >= bound) {
            Some(bad) => Err(ConfigError::UnknownStation(bad.to_string())),
            None => Ok(()),
        }
    }

    fn check_station(&self, id: StationId) -> Result<(), ConfigError> {
        if id.0 < self.stations.len() {
            Ok(())
        } else {
            Err(ConfigError::UnknownStation(id.to_string()))
        }
    }

    pub fn set_arrivals(&mut self, arrivals: ArrivalProcess) -> Result<(), ConfigError> {
        self.check_station(arrivals.entry)?;
        arrivals.interarrival.validate()?;
        arrivals.service.validate()?;
        self.arrivals = Some(arrivals);
        Ok(())
    }

    pub fn set_end(&mut self, end: EndCondition) -> Result<(), ConfigError> {
        if let EndCondition::Auto { station, .. } = &end {
            self.check_station(*station)?;
        }
        self.end = end;
        Ok(())
    }

    pub fn set_probe(&mut self, probe: ProbeSchedule) -> Result<(), ConfigError> {
        self.check_station(probe.station)?;
        if !probe.every.is_finite() || probe.every <= 0.0 {
            return Err(ConfigError::InvalidDistribution(format!(
                "probe interval {} must be positive",
                probe.every
            )));
        }
        self.probe = Some(probe);
        Ok(())
    }

    // ------------------------------------------------------------------
    // 只读访问（供报告与控制界面使用）
    // ------------------------------------------------------------------

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn end_condition(&self) -> &EndCondition {
        &self.end
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id.0).and_then(Option::as_ref)
    }

    pub fn station_id(&self, name: &str) -> Result<StationId, ConfigError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownStation(name.to_string()))
    }

    pub fn station_by_name(&self, name: &str) -> Result<&Station, ConfigError> {
        let id = self.station_id(name)?;
        self.station(id)
            .ok_or_else(|| ConfigError::UnknownStation(name.to_string()))
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter().flatten()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn events(&self) -> &EventList {
        &self.events
    }

    pub fn arena(&self) -> &EventArena {
        &self.arena
    }

    /// 事件列表中的事件（按出队顺序），仅用于诊断
    pub fn pending_events(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter_map(|e| self.arena.get(e.handle))
            .collect()
    }

    pub fn last_step(&self) -> Option<&StepInfo> {
        self.last_step.as_ref()
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// 已离开上一站、到达事件仍在事件列表中的作业数
    pub fn in_transit(&self) -> usize {
        self.in_transit
    }

    /// 所有站点均无作业，且没有作业正在站点之间转移
    pub fn is_network_empty(&self) -> bool {
        self.in_transit == 0 && self.stations().all(|s| s.population() == 0)
    }

    pub fn variates(&self) -> &VariateSource {
        &self.variates
    }

    pub fn variates_mut(&mut self) -> &mut VariateSource {
        &mut self.variates
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport::from_scheduler(self)
    }

    // ------------------------------------------------------------------
    // 事件所有权
    // ------------------------------------------------------------------

    pub fn event(&self, h: EventHandle) -> Result<&Event, SimError> {
        self.arena.get(h).ok_or(SimError::StaleHandle(h))
    }

    pub fn event_mut(&mut self, h: EventHandle) -> Result<&mut Event, SimError> {
        self.arena.get_mut(h).ok_or(SimError::StaleHandle(h))
    }

    pub(crate) fn event_name(&self, h: EventHandle) -> String {
        self.arena
            .get(h)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("<stale {h:?}>"))
    }

    /// 构造事件但不调度
    pub fn create_event(&mut self, event: Event) -> EventHandle {
        self.arena.insert(event)
    }

    /// 释放事件；重复释放返回 `StaleHandle`
    pub fn release(&mut self, h: EventHandle) -> Result<Event, SimError> {
        self.arena.remove(h)
    }

    /// 把事件按其 `occur_time` 放入全局事件列表
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn schedule(&mut self, h: EventHandle) -> Result<(), SimError> {
        let ev = self.arena.get(h).ok_or(SimError::StaleHandle(h))?;
        if ev.occur_time < self.now || ev.occur_time < ev.create_time {
            return Err(SimError::NonCausal {
                event: ev.name.clone(),
                at: ev.occur_time,
                now: self.now,
            });
        }
        let at = ev.occur_time;
        trace!(name = %ev.name, kind = ?ev.kind, at = %at, "调度事件");
        self.events.insert(h, at);
        Ok(())
    }

    /// 把完成服务的作业送往下一站（当前时刻到达）；`None` 表示离开网络并释放事件
    pub fn route(&mut self, h: EventHandle, dest: Option<StationId>) -> Result<(), SimError> {
        let Some(to) = dest else {
            let ev = self.arena.remove(h)?;
            trace!(name = %ev.name, "作业离开网络");
            return Ok(());
        };
        if to.0 >= self.stations.len() {
            return Err(SimError::MissingStation(to));
        }
        let now = self.now;
        let ev = self.event_mut(h)?;
        ev.kind = EventKind::Arrival;
        ev.phase = JobPhase::Fresh;
        ev.external = false;
        ev.station = to;
        ev.occur_time = now;
        let was_in_transit = std::mem::replace(&mut ev.in_transit, true);
        self.schedule(h)?;
        if !was_in_transit {
            self.in_transit += 1;
        }
        Ok(())
    }

    /// 在 `at` 时刻向站点注入一个新作业
    pub fn inject(
        &mut self,
        name: impl Into<String>,
        station: StationId,
        at: SimTime,
        service_time: f64,
    ) -> Result<EventHandle, SimError> {
        self.check_station(station)?;
        let ev = Event::new(name, EventKind::Arrival, self.now, at, service_time, station);
        let h = self.arena.insert(ev);
        if let Err(e) = self.schedule(h) {
            let _ = self.arena.remove(h);
            return Err(e);
        }
        Ok(h)
    }

    fn schedule_end(&mut self, at: SimTime) -> Result<(), SimError> {
        let ev = Event::new("END", EventKind::End, self.now, at, 0.0, StationId(0));
        let h = self.arena.insert(ev);
        self.schedule(h)?;
        self.end_scheduled = true;
        debug!(at = %at, "已调度 END 事件");
        Ok(())
    }

    fn schedule_external_arrival(&mut self) -> Result<(), SimError> {
        let Some(ap) = self.arrivals.as_ref() else {
            return Ok(());
        };
        let ia = self.variates.draw(INTERARRIVAL_STREAM, &ap.interarrival);
        let svc = self.variates.draw(ARRIVAL_SERVICE_STREAM, &ap.service);
        let entry = ap.entry;

        let name = format!("J{}", self.next_job);
        self.next_job = self.next_job.wrapping_add(1);
        let mut ev = Event::new(
            name,
            EventKind::Arrival,
            self.now,
            self.now.after(ia),
            svc,
            entry,
        );
        ev.external = true;
        let h = self.arena.insert(ev);
        self.schedule(h)
    }

    fn schedule_probe(&mut self, station: StationId, every: f64) -> Result<(), SimError> {
        let ev = Event::new(
            "PROBE",
            EventKind::Probe,
            self.now,
            self.now.after(every),
            0.0,
            station,
        );
        let h = self.arena.insert(ev);
        self.schedule(h)
    }

    // ------------------------------------------------------------------
    // 运行
    // ------------------------------------------------------------------

    /// 初始化：调度第一个外部到达，以及（若配置）END / PROBE。
    #[tracing::instrument(skip(self))]
    pub fn initialize(&mut self) -> Result<(), SimError> {
        let now = self.now;
        for st in self.stations.iter_mut().flatten() {
            st.initialize(now);
        }
        self.state = RunState::Running;
        self.end_scheduled = false;

        self.schedule_external_arrival()?;
        match self.end.clone() {
            EndCondition::At(t) => self.schedule_end(t)?,
            EndCondition::Auto { warmup, station } => {
                debug!(warmup = %warmup, ?station, "自动结束模式");
            }
            EndCondition::Never => {}
        }
        if let Some(p) = self.probe.clone() {
            self.schedule_probe(p.station, p.every)?;
        }

        info!(
            stations = self.stations.len(),
            pending = self.events.len(),
            "调度器已初始化"
        );
        Ok(())
    }

    /// 处理一个事件：出队、推进时钟、分发给站点、检查结束条件、维持到达过程。
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        if self.state == RunState::Uninitialized {
            self.initialize()?;
        }
        if self.state != RunState::Running {
            return Err(SimError::NotRunning(self.state));
        }
        match self.step_inner() {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, now = %self.now, "仿真不变量被破坏，终止运行");
                self.state = RunState::Aborted;
                Err(e)
            }
        }
    }

    fn step_inner(&mut self) -> Result<StepOutcome, SimError> {
        let item = self.events.dequeue()?;
        if item.at < self.now {
            return Err(SimError::BackInTime {
                now: self.now,
                at: item.at,
            });
        }
        self.now = item.at;
        self.processed = self.processed.wrapping_add(1);

        let (kind, station, external, arrived, name) = {
            let ev = self.event_mut(item.handle)?;
            let external = std::mem::take(&mut ev.external);
            let arrived = std::mem::take(&mut ev.in_transit);
            (ev.kind, ev.station, external, arrived, ev.name.clone())
        };
        if arrived {
            self.in_transit = self.in_transit.saturating_sub(1);
        }
        trace!(
            num = self.processed,
            now = %self.now,
            seq = item.seq,
            name = %name,
            ?kind,
            ?station,
            remaining = self.events.len(),
            "执行事件"
        );
        self.last_step = Some(StepInfo {
            kind,
            station,
            at: self.now,
            name,
        });

        match kind {
            EventKind::End => {
                let now = self.now;
                for st in self.stations.iter_mut().flatten() {
                    st.finish(now);
                }
                self.arena.remove(item.handle)?;
                self.state = RunState::Ended;
                info!(now = %self.now, events = self.processed, "✅ 仿真结束");
                return Ok(StepOutcome::Ended);
            }
            EventKind::Probe => self.handle_probe(item.handle, station)?,
            EventKind::Arrival | EventKind::Departure => {
                self.dispatch(item.handle, kind, station)?
            }
        }

        if let EndCondition::Auto { warmup, station: watched } = self.end {
            let drained = self.station(watched).is_some_and(|s| s.outstanding() == 0);
            if !self.end_scheduled && self.now > warmup && drained {
                self.schedule_end(self.now)?;
            }
        }

        let is_entry = self.arrivals.as_ref().is_some_and(|ap| ap.entry == station);
        if kind == EventKind::Arrival && external && is_entry {
            self.schedule_external_arrival()?;
        }
        Ok(StepOutcome::Continue)
    }

    /// 暂时把站点取出来，避免 &mut self 与 &mut station 的重叠借用。
    fn dispatch(&mut self, h: EventHandle, kind: EventKind, id: StationId) -> Result<(), SimError> {
        let mut st = self
            .stations
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(SimError::MissingStation(id))?;
        let res = st.process(h, kind, self);
        self.stations[id.0] = Some(st);
        res
    }

    fn handle_probe(&mut self, h: EventHandle, id: StationId) -> Result<(), SimError> {
        let now = self.now;
        self.stations
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SimError::MissingStation(id))?
            .probe(now);

        match self.probe.as_ref().filter(|p| p.station == id).map(|p| p.every) {
            Some(every) => {
                self.event_mut(h)?.occur_time = now.after(every);
                self.schedule(h)
            }
            None => self.arena.remove(h).map(|_| ()),
        }
    }

    /// 运行直到 END。没有任何结束条件时返回 `Unbounded`。
    #[tracing::instrument(skip(self))]
    pub fn execute(&mut self) -> Result<SimTime, SimError> {
        if self.end == EndCondition::Never {
            return Err(SimError::Unbounded);
        }
        info!("▶️  开始运行仿真");
        while self.step()? == StepOutcome::Continue {}
        info!(final_time = %self.now, events = self.processed, "仿真完成");
        Ok(self.now)
    }

    /// 每步之后检查 `stop`，返回 true 或遇到 END 时停止。
    pub fn run_until<F>(&mut self, mut stop: F) -> Result<StepOutcome, SimError>
    where
        F: FnMut(&Scheduler) -> bool,
    {
        loop {
            let outcome = self.step()?;
            if outcome == StepOutcome::Ended || stop(self) {
                return Ok(outcome);
            }
        }
    }

    /// 回到 t=0：清空事件列表与站点，检查事件泄漏，然后重新初始化。
    #[tracing::instrument(skip(self))]
    pub fn reset(&mut self) -> Result<ResetReport, SimError> {
        self.now = SimTime::ZERO;
        let released_from_list = self.events.clear(&mut self.arena);
        let mut released_from_stations = 0;
        for st in self.stations.iter_mut().flatten() {
            released_from_stations += st.reset(SimTime::ZERO, &mut self.arena);
        }

        let constructed = self.arena.constructed();
        let destroyed = self.arena.destroyed();
        let leaked = constructed.saturating_sub(destroyed);
        if leaked > 0 {
            warn!(leaked, constructed, destroyed, "检测到事件泄漏：{leaked} 个事件未释放");
        }
        self.arena.purge();
        self.in_transit = 0;

        self.state = RunState::Uninitialized;
        self.processed = 0;
        self.last_step = None;
        debug!(released_from_list, released_from_stations, "调度器已重置");
        self.initialize()?;

        Ok(ResetReport {
            released_from_list,
            released_from_stations,
            leaked,
        })
    }
}
