//! 场景描述
//!
//! JSON 场景文件反序列化为 [`ScenarioSpec`]，再构建成一个可运行的 [`Scheduler`]。
//! 站点之间用名字引用。

mod builtin;

pub use builtin::{builtin, builtin_names};

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::sampling::StoppingRule;
use crate::sim::{ArrivalProcess, ConfigError, EndCondition, ProbeSchedule, Scheduler, SimTime};
use crate::station::{Router, Routing, StationConfig, StationId, StationKind};
use crate::variate::{DEFAULT_SEED, Distribution, VariateSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    pub stations: Vec<StationSpec>,
    #[serde(default)]
    pub arrivals: Option<ArrivalSpec>,
    #[serde(default)]
    pub end: Option<EndSpec>,
    #[serde(default)]
    pub probe: Option<ProbeSpec>,
    #[serde(default)]
    pub sampling: Option<SamplingSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: StationKindSpec,
    #[serde(default)]
    pub service: Option<Distribution>,
    #[serde(default)]
    pub routing: RoutingSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StationKindSpec {
    Fcfs,
    Cpu { quantum: f64 },
    Delay,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoutingSpec {
    #[default]
    Exit,
    To {
        station: String,
    },
    Table {
        branches: Vec<RouteBranch>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteBranch {
    pub station: String,
    pub p: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalSpec {
    pub entry: String,
    pub interarrival: Distribution,
    /// 作业携带的服务需求；入口站点自带服务分布时通常省略
    #[serde(default)]
    pub service: Option<Distribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndSpec {
    At { time: f64 },
    Auto { warmup: f64, station: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSpec {
    pub station: String,
    pub every: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplingSpec {
    /// 需要统计的站点；为空表示全部
    #[serde(default)]
    pub track: Vec<String>,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default)]
    pub min_cycles: Option<u64>,
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

impl ScenarioSpec {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        let spec = Self::from_json(&text)?;
        info!(path = %path.display(), name = %spec.name, "已加载场景文件");
        Ok(spec)
    }

    /// 场景文件中的停止规则，缺省项取默认值
    pub fn stopping_rule(&self) -> StoppingRule {
        let mut rule = StoppingRule::default();
        if let Some(s) = &self.sampling {
            rule.precision = s.precision.unwrap_or(rule.precision);
            rule.min_cycles = s.min_cycles.unwrap_or(rule.min_cycles);
            rule.max_cycles = s.max_cycles.unwrap_or(rule.max_cycles);
        }
        rule
    }

    /// 需要统计的站点名；为空表示全部
    pub fn tracked(&self) -> &[String] {
        self.sampling
            .as_ref()
            .map(|s| s.track.as_slice())
            .unwrap_or_default()
    }

    /// 构建调度器。`seed` 覆盖场景文件中的种子。
    #[tracing::instrument(skip(self), fields(scenario = %self.name))]
    pub fn build(&self, seed: Option<u64>) -> Result<Scheduler, ConfigError> {
        let seed = seed.or(self.seed).unwrap_or(DEFAULT_SEED);
        let mut sched = Scheduler::new(VariateSource::new(seed));

        // 先注册全部站点，路由可以前向引用
        for st in &self.stations {
            let cfg = StationConfig {
                name: st.name.clone(),
                kind: match st.kind {
                    StationKindSpec::Fcfs => StationKind::Fcfs,
                    StationKindSpec::Cpu { quantum } => StationKind::Cpu { quantum },
                    StationKindSpec::Delay => StationKind::Delay,
                },
                service: st.service.clone(),
                routing: Routing::Exit,
            };
            sched.add_station(cfg)?;
        }
        for st in &self.stations {
            let routing = resolve_routing(&sched, &st.routing)?;
            let id = sched.station_id(&st.name)?;
            sched.set_routing(id, routing)?;
        }

        if let Some(a) = &self.arrivals {
            let entry = sched.station_id(&a.entry)?;
            sched.set_arrivals(ArrivalProcess {
                entry,
                interarrival: a.interarrival.clone(),
                service: a.service.clone().unwrap_or(Distribution::fixed(0.0)),
            })?;
        }
        if let Some(end) = &self.end {
            let cond = match end {
                EndSpec::At { time } => EndCondition::At(SimTime(*time)),
                EndSpec::Auto { warmup, station } => EndCondition::Auto {
                    warmup: SimTime(*warmup),
                    station: sched.station_id(station)?,
                },
            };
            sched.set_end(cond)?;
        }
        if let Some(p) = &self.probe {
            let station = sched.station_id(&p.station)?;
            sched.set_probe(ProbeSchedule {
                station,
                every: p.every,
            })?;
        }
        for name in self.tracked() {
            sched.station_id(name)?;
        }

        debug!(seed, stations = sched.station_count(), "场景已构建");
        Ok(sched)
    }
}

fn resolve_routing(sched: &Scheduler, spec: &RoutingSpec) -> Result<Routing, ConfigError> {
    Ok(match spec {
        RoutingSpec::Exit => Routing::Exit,
        RoutingSpec::To { station } => Routing::To(sched.station_id(station)?),
        RoutingSpec::Table { branches } => {
            let table = branches
                .iter()
                .map(|b| Ok((sched.station_id(&b.station)?, b.p)))
                .collect::<Result<Vec<(StationId, f64)>, ConfigError>>()?;
            Routing::Table(Router::new(&table)?)
        }
    })
}
