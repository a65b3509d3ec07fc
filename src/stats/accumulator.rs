//! 在线统计累加器
//!
//! Welford 增量算法维护均值与二阶中心矩，样本量再大也不会出现
//! 平方和相减造成的精度损失。

use serde::Serialize;

use super::confidence::ConfidenceInterval;

#[derive(Debug, Clone, Serialize)]
pub struct Accumulator {
    name: String,
    unit: String,
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    /// 置信水平，例如 0.90
    level: f64,
}

impl Accumulator {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::with_confidence(name, unit, 0.90)
    }

    pub fn with_confidence(name: impl Into<String>, unit: impl Into<String>, level: f64) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            level: level.clamp(0.5, 0.9999),
        }
    }

    pub fn add(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 总体方差（除以 n）
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// 样本方差（除以 n-1）
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn confidence(&self) -> ConfidenceInterval {
        ConfidenceInterval::from_accumulator(self)
    }

    /// 相对精度：半宽 / |均值|；样本不足两个时为无穷大
    pub fn precision(&self) -> f64 {
        self.confidence().precision
    }

    pub fn reset(&mut self) {
        let name = std::mem::take(&mut self.name);
        let unit = std::mem::take(&mut self.unit);
        *self = Self::with_confidence(name, unit, self.level);
    }
}

impl std::fmt::Display for Accumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ci = self.confidence();
        write!(
            f,
            "{}: {:.6} {} ± {:.6} (n={}, {:.0}%)",
            self.name,
            self.mean,
            self.unit,
            ci.half_width,
            self.count,
            self.level * 100.0
        )
    }
}
