//! 事件记录
//!
//! 一个事件描述某个作业（job）的一次状态迁移。事件本体存放在
//! [`EventArena`](super::EventArena) 中，各容器之间只传递 [`EventHandle`]。

use super::time::SimTime;
use crate::station::StationId;
use serde::{Deserialize, Serialize};

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Arrival,
    Departure,
    Probe,
    End,
}

/// 作业在当前站点的阶段（对应抢占式站点的 sub type）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// 刚到达，CPU 需要为它抽取新的 burst
    #[default]
    Fresh,
    /// 时间片用完后从就绪队列重新进入服务
    Resume,
}

/// 事件句柄：slot 下标 + 代数，过期句柄无法访问新对象。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// 单个已调度（或待调度）的事件
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub kind: EventKind,
    pub create_time: SimTime,
    pub occur_time: SimTime,
    /// 剩余服务需求；抢占式站点每个时间片递减
    pub service_time: f64,
    pub station: StationId,
    pub phase: JobPhase,
    /// 由外部到达过程产生、尚未被路由过
    pub external: bool,
    /// 已被路由到下一站、尚未被该站处理
    pub in_transit: bool,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        kind: EventKind,
        create_time: SimTime,
        occur_time: SimTime,
        service_time: f64,
        station: StationId,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            create_time,
            occur_time,
            service_time,
            station,
            phase: JobPhase::Fresh,
            external: false,
            in_transit: false,
        }
    }

    /// 服务需求是否已经耗尽
    pub fn is_finished(&self) -> bool {
        self.service_time <= 0.0
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{:?}@{} st={:?} svc={:.4}]",
            self.name, self.kind, self.occur_time, self.station, self.service_time
        )
    }
}
