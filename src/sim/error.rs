//! 错误类型
//!
//! `SimError` 中除 `Config` 外的变体都表示仿真时间线上的不变量被破坏，
//! 调度器遇到后会终止本次运行；`ConfigError` 只会拒绝请求的操作。

use super::event::EventHandle;
use super::scheduler::RunState;
use super::time::SimTime;
use crate::station::StationId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("dequeue from an empty event list")]
    EmptyList,

    #[error("clock would move backwards: now={now}, event at {at}")]
    BackInTime { now: SimTime, at: SimTime },

    #[error("event `{event}` occurs at {at} before current time {now}")]
    NonCausal {
        event: String,
        at: SimTime,
        now: SimTime,
    },

    #[error("departure of `{event}` at station `{station}` with no event under processing")]
    IdleDeparture { station: String, event: String },

    #[error("departure of `{event}` at station `{station}` while `{in_service}` is in service")]
    ForeignDeparture {
        station: String,
        event: String,
        in_service: String,
    },

    #[error("resumed job `{event}` found station `{station}` still busy")]
    SlotOccupied { station: String, event: String },

    #[error("job `{event}` resumed at station `{station}` without being dispatched")]
    UnexpectedResume { station: String, event: String },

    #[error("stale or released event handle {0:?}")]
    StaleHandle(EventHandle),

    #[error("station {0:?} is not available")]
    MissingStation(StationId),

    #[error("scheduler is not running (state {0:?})")]
    NotRunning(RunState),

    #[error("no end condition configured, execute would never return")]
    Unbounded,

    #[error("regeneration cycle did not complete within {0} steps")]
    CycleLimit(u64),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SimError {
    /// 是否属于不变量破坏（需要终止运行）
    pub fn is_contract_violation(&self) -> bool {
        !matches!(
            self,
            SimError::Config(_) | SimError::NotRunning(_) | SimError::Unbounded
        )
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown station `{0}`")]
    UnknownStation(String),

    #[error("unknown scenario `{0}`")]
    UnknownScenario(String),

    #[error("station `{0}` is defined twice")]
    DuplicateStation(String),

    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),

    #[error("invalid routing: {0}")]
    InvalidRouting(String),

    #[error("quantum must be positive and finite, got {0}")]
    InvalidQuantum(f64),

    #[error("failed to parse scenario: {0}")]
    Parse(String),

    #[error("failed to read scenario: {0}")]
    Io(String),
}
