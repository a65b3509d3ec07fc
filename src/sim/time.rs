//! 仿真时间类型
//!
//! 定义虚拟时钟使用的时间戳（与墙钟时间无关）。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 仿真时间（抽象时间单位，f64）。
///
/// 使用 `total_cmp` 实现全序，便于放入有序容器。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(pub f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// 当前时间之后 `dt` 个时间单位（负值按 0 处理）
    pub fn after(self, dt: f64) -> SimTime {
        SimTime(self.0 + dt.max(0.0))
    }

    /// 两个时间点之间的间隔（不会为负）
    pub fn since(self, earlier: SimTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for SimTime {
    fn from(t: f64) -> Self {
        SimTime(t)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
