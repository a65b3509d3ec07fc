//! 站点统计信息
//!
//! 计数器 + 按时间加权的积分（人数、排队人数、忙碌服务台数）。

use serde::Serialize;

use crate::sim::SimTime;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StationStats {
    pub arrivals: u64,
    pub completions: u64,
    /// 进入服务的次数（CPU 每个时间片计一次）
    pub slices: u64,
    pub busy_time: f64,
    pub area_population: f64,
    pub area_queue: f64,
    pub probes: u64,
    pub probe_population: u64,
    pub start: SimTime,
    pub last_update: SimTime,
    pub last_arrival: SimTime,
}

impl StationStats {
    /// 从 `now` 开始重新统计
    pub fn restart(&mut self, now: SimTime) {
        *self = StationStats {
            start: now,
            last_update: now,
            last_arrival: now,
            ..StationStats::default()
        };
    }

    /// 把 [last_update, now] 区间按当前状态累加进积分
    pub fn advance(&mut self, now: SimTime, population: usize, queued: usize, in_service: usize) {
        let dt = now.since(self.last_update);
        if dt > 0.0 {
            self.area_population += population as f64 * dt;
            self.area_queue += queued as f64 * dt;
            self.busy_time += in_service as f64 * dt;
        }
        self.last_update = self.last_update.max(now);
    }

    pub fn record_arrival(&mut self, now: SimTime) {
        self.arrivals += 1;
        self.last_arrival = now;
    }

    pub fn observation(&self) -> f64 {
        self.last_update.since(self.start)
    }

    fn per_time(&self, x: f64) -> f64 {
        let obs = self.observation();
        if obs > 0.0 { x / obs } else { 0.0 }
    }

    fn per_completion(&self, x: f64) -> f64 {
        if self.completions > 0 {
            x / self.completions as f64
        } else {
            0.0
        }
    }

    pub fn throughput(&self) -> f64 {
        self.per_time(self.completions as f64)
    }

    pub fn utilization(&self) -> f64 {
        self.per_time(self.busy_time)
    }

    pub fn mean_customers(&self) -> f64 {
        self.per_time(self.area_population)
    }

    /// 平均响应时间（排队 + 服务），由 Little 定律得到
    pub fn mean_wait(&self) -> f64 {
        self.per_completion(self.area_population)
    }

    /// 平均排队时间
    pub fn mean_delay(&self) -> f64 {
        self.per_completion(self.area_queue)
    }

    pub fn mean_service(&self) -> f64 {
        self.per_completion(self.busy_time)
    }

    pub fn mean_interarrival(&self) -> f64 {
        if self.arrivals > 0 {
            self.last_arrival.since(self.start) / self.arrivals as f64
        } else {
            0.0
        }
    }

    pub fn mean_probed_population(&self) -> f64 {
        if self.probes > 0 {
            self.probe_population as f64 / self.probes as f64
        } else {
            0.0
        }
    }
}
