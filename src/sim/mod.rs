//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件：仿真时间、事件、事件存储、事件列表和调度器。

// 子模块声明
mod arena;
mod error;
mod event;
mod event_list;
mod scheduled_event;
mod scheduler;
mod time;

// 重新导出公共接口
pub use arena::EventArena;
pub use error::{ConfigError, SimError};
pub use event::{Event, EventHandle, EventKind, JobPhase};
pub use event_list::EventList;
pub use scheduled_event::{EventOrder, ScheduledEvent, by_occur_time};
pub use scheduler::{
    ArrivalProcess, EndCondition, ProbeSchedule, ResetReport, RunState, Scheduler, StepInfo,
    StepOutcome,
};
pub use time::SimTime;
