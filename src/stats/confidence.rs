//! 置信区间
//!
//! 半宽 = t_{(1+level)/2, n-1} * s / sqrt(n)，s 为样本标准差。

use serde::Serialize;

use super::accumulator::Accumulator;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub mean: f64,
    pub half_width: f64,
    /// half_width / |mean|
    pub precision: f64,
    pub level: f64,
    pub samples: u64,
}

impl ConfidenceInterval {
    pub fn from_accumulator(acc: &Accumulator) -> Self {
        let n = acc.count();
        let mean = acc.mean();
        let level = acc.level();
        if n < 2 {
            return Self {
                mean,
                half_width: f64::INFINITY,
                precision: f64::INFINITY,
                level,
                samples: n,
            };
        }
        let t = student_t_quantile((1.0 + level) / 2.0, n - 1);
        let half_width = t * (acc.sample_variance() / n as f64).sqrt();
        let precision = if half_width == 0.0 {
            0.0
        } else if mean == 0.0 {
            f64::INFINITY
        } else {
            half_width / mean.abs()
        };
        Self {
            mean,
            half_width,
            precision,
            level,
            samples: n,
        }
    }

    pub fn low(&self) -> f64 {
        self.mean - self.half_width
    }

    pub fn high(&self) -> f64 {
        self.mean + self.half_width
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.low() && x <= self.high()
    }
}

/// 标准正态分布分位数（Acklam 有理逼近，相对误差约 1e-9）
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -normal_quantile(1.0 - p)
    }
}

/// Student-t 分位数。自由度 1、2 用闭式解，其余用 Cornish-Fisher 展开。
pub fn student_t_quantile(p: f64, dof: u64) -> f64 {
    if dof == 0 {
        return f64::INFINITY;
    }
    if dof == 1 {
        return (std::f64::consts::PI * (p - 0.5)).tan();
    }
    if dof == 2 {
        let a = 4.0 * p * (1.0 - p);
        return (2.0 * p - 1.0) * (2.0 / a).sqrt();
    }
    let z = normal_quantile(p);
    let n = dof as f64;
    let z2 = z * z;
    let g1 = (z2 + 1.0) * z / 4.0;
    let g2 = ((5.0 * z2 + 16.0) * z2 + 3.0) * z / 96.0;
    let g3 = (((3.0 * z2 + 19.0) * z2 + 17.0) * z2 - 15.0) * z / 384.0;
    let g4 = ((((79.0 * z2 + 776.0) * z2 + 1482.0) * z2 - 1920.0) * z2 - 945.0) * z / 92160.0;
    z + g1 / n + g2 / (n * n) + g3 / (n * n * n) + g4 / (n * n * n * n)
}
