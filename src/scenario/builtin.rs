//! 内置场景

use super::{
    ArrivalSpec, EndSpec, RouteBranch, RoutingSpec, SamplingSpec, ScenarioSpec, StationKindSpec,
    StationSpec,
};
use crate::sim::ConfigError;
use crate::variate::{DEFAULT_SEED, Distribution};

const NAMES: &[&str] = &["ssq", "repair_shop", "os"];

pub fn builtin_names() -> &'static [&'static str] {
    NAMES
}

pub fn builtin(name: &str) -> Result<ScenarioSpec, ConfigError> {
    match name {
        "ssq" => Ok(ssq()),
        "repair_shop" => Ok(repair_shop()),
        "os" => Ok(os()),
        other => Err(ConfigError::UnknownScenario(other.to_string())),
    }
}

fn station(
    name: &str,
    kind: StationKindSpec,
    service: Distribution,
    routing: RoutingSpec,
) -> StationSpec {
    StationSpec {
        name: name.to_string(),
        kind,
        service: Some(service),
        routing,
    }
}

fn to(name: &str) -> RoutingSpec {
    RoutingSpec::To {
        station: name.to_string(),
    }
}

fn sampling(track: &[&str]) -> Option<SamplingSpec> {
    Some(SamplingSpec {
        track: track.iter().map(|s| s.to_string()).collect(),
        ..SamplingSpec::default()
    })
}

/// 单服务台队列：到达率 0.1，服务率 0.14
fn ssq() -> ScenarioSpec {
    ScenarioSpec {
        name: "ssq".into(),
        description: Some("single FCFS server, exponential arrivals and service".into()),
        seed: Some(DEFAULT_SEED),
        stations: vec![station(
            "SSQ",
            StationKindSpec::Fcfs,
            Distribution::exponential(1.0 / 0.14),
            RoutingSpec::Exit,
        )],
        arrivals: Some(ArrivalSpec {
            entry: "SSQ".into(),
            interarrival: Distribution::exponential(10.0),
            service: None,
        }),
        end: Some(EndSpec::At { time: 100_000.0 }),
        probe: None,
        sampling: sampling(&["SSQ"]),
    }
}

/// 维修站：热身 20000 之后，积压清空即结束
fn repair_shop() -> ScenarioSpec {
    ScenarioSpec {
        name: "repair_shop".into(),
        description: Some("machine repairman, ends automatically once the backlog drains".into()),
        seed: Some(DEFAULT_SEED),
        stations: vec![station(
            "REPAIR",
            StationKindSpec::Fcfs,
            Distribution::exponential(8.0),
            RoutingSpec::Exit,
        )],
        arrivals: Some(ArrivalSpec {
            entry: "REPAIR".into(),
            interarrival: Distribution::exponential(10.0),
            service: None,
        }),
        end: Some(EndSpec::Auto {
            warmup: 20_000.0,
            station: "REPAIR".into(),
        }),
        probe: None,
        sampling: sampling(&["REPAIR"]),
    }
}

/// 分时操作系统：换入、轮转 CPU、两个 IO 设备、换出
fn os() -> ScenarioSpec {
    let cpu_routing = RoutingSpec::Table {
        branches: [("IO1", 0.065), ("IO2", 0.025), ("SWAP_OUT", 0.01), ("CPU", 0.9)]
            .into_iter()
            .map(|(station, p)| RouteBranch {
                station: station.into(),
                p,
            })
            .collect(),
    };
    ScenarioSpec {
        name: "os".into(),
        description: Some("time-sharing system with a round-robin CPU".into()),
        seed: Some(DEFAULT_SEED),
        stations: vec![
            station(
                "SWAP_IN",
                StationKindSpec::Fcfs,
                Distribution::exponential(210.0),
                to("CPU"),
            ),
            station(
                "CPU",
                StationKindSpec::Cpu { quantum: 2.7 },
                Distribution::hyper_exponential(&[(0.95, 10.0), (0.05, 350.0)]),
                cpu_routing,
            ),
            station("IO1", StationKindSpec::Fcfs, Distribution::exponential(40.0), to("CPU")),
            station("IO2", StationKindSpec::Fcfs, Distribution::exponential(180.0), to("CPU")),
            station(
                "SWAP_OUT",
                StationKindSpec::Delay,
                Distribution::fixed(0.0),
                RoutingSpec::Exit,
            ),
        ],
        arrivals: Some(ArrivalSpec {
            entry: "SWAP_IN".into(),
            interarrival: Distribution::exponential(5000.0),
            service: None,
        }),
        end: Some(EndSpec::At { time: 1_000_000.0 }),
        probe: None,
        sampling: sampling(&["CPU", "IO1", "IO2", "SWAP_IN", "SWAP_OUT"]),
    }
}
