//! 结构化报告
//!
//! 只读聚合调度器与站点的统计量，渲染（文本 / JSON）由调用方负责。

use serde::Serialize;

use crate::sim::{RunState, Scheduler, SimTime};
use crate::station::{Station, StationId};

#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    pub id: StationId,
    pub name: String,
    pub kind: &'static str,
    pub arrivals: u64,
    pub completions: u64,
    pub slices: u64,
    pub population: usize,
    pub queued: Option<usize>,
    pub observation: f64,
    pub busy_time: f64,
    pub throughput: f64,
    pub utilization: f64,
    pub mean_customers: f64,
    pub mean_wait: f64,
    pub mean_delay: f64,
    pub mean_service: f64,
    pub mean_interarrival: f64,
    pub mean_probed_population: f64,
}

impl StationReport {
    pub fn new(station: &Station, now: SimTime) -> Self {
        let st = station.stats_at(now);
        Self {
            id: station.id(),
            name: station.name().to_string(),
            kind: station.kind_name(),
            arrivals: st.arrivals,
            completions: st.completions,
            slices: st.slices,
            population: station.population(),
            queued: station.queue().map(|q| q.len()),
            observation: st.observation(),
            busy_time: st.busy_time,
            throughput: st.throughput(),
            utilization: st.utilization(),
            mean_customers: st.mean_customers(),
            mean_wait: st.mean_wait(),
            mean_delay: st.mean_delay(),
            mean_service: st.mean_service(),
            mean_interarrival: st.mean_interarrival(),
            mean_probed_population: st.mean_probed_population(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub clock: SimTime,
    pub state: RunState,
    pub events_processed: u64,
    pub events_pending: usize,
    pub events_constructed: u64,
    pub events_destroyed: u64,
    pub events_live: usize,
    /// 已离开上一站、尚未到达下一站的作业
    pub jobs_in_transit: usize,
    pub stations: Vec<StationReport>,
}

impl SimulationReport {
    pub fn from_scheduler(sched: &Scheduler) -> Self {
        let now = sched.now();
        Self {
            clock: now,
            state: sched.state(),
            events_processed: sched.processed(),
            events_pending: sched.events().len(),
            events_constructed: sched.arena().constructed(),
            events_destroyed: sched.arena().destroyed(),
            events_live: sched.arena().live(),
            jobs_in_transit: sched.in_transit(),
            stations: sched.stations().map(|s| StationReport::new(s, now)).collect(),
        }
    }

    pub fn station(&self, name: &str) -> Option<&StationReport> {
        self.stations.iter().find(|s| s.name == name)
    }
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "clock={} state={:?} events: processed={} constructed={} destroyed={} live={}",
            self.clock,
            self.state,
            self.events_processed,
            self.events_constructed,
            self.events_destroyed,
            self.events_live
        )?;
        for s in &self.stations {
            writeln!(
                f,
                "  {:<10} {:<5} A={:<8} C={:<8} X={:.6} U={:.4} N={:.4} W={:.4} D={:.4}",
                s.name,
                s.kind,
                s.arrivals,
                s.completions,
                s.throughput,
                s.utilization,
                s.mean_customers,
                s.mean_wait,
                s.mean_delay
            )?;
        }
        Ok(())
    }
}
