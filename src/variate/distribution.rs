//! 分布描述
//!
//! 可序列化的分布枚举；抽样委托给 `rand_distr`，结果统一截断为非负。

use rand::Rng;
use rand::distr::Uniform;
use rand::distr::weighted::WeightedIndex;
use rand_distr::{Distribution as _, Exp};
use serde::{Deserialize, Serialize};

use crate::sim::ConfigError;

/// 随机变量分布描述。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Fixed { value: f64 },
    Exponential { mean: f64 },
    /// 超指数：以概率 `p` 选中分支，再按该分支的均值抽取指数分布
    HyperExponential { branches: Vec<Branch> },
    Uniform { low: f64, high: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub p: f64,
    pub mean: f64,
}

impl Distribution {
    pub fn fixed(value: f64) -> Self {
        Distribution::Fixed { value }
    }

    pub fn exponential(mean: f64) -> Self {
        Distribution::Exponential { mean }
    }

    pub fn uniform(low: f64, high: f64) -> Self {
        Distribution::Uniform { low, high }
    }

    pub fn hyper_exponential(branches: &[(f64, f64)]) -> Self {
        Distribution::HyperExponential {
            branches: branches
                .iter()
                .map(|&(p, mean)| Branch { p, mean })
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |msg: String| Err(ConfigError::InvalidDistribution(msg));
        match self {
            Distribution::Fixed { value } if !value.is_finite() || *value < 0.0 => {
                bad(format!("fixed value {value} must be finite and non-negative"))
            }
            Distribution::Exponential { mean } if !mean.is_finite() || *mean <= 0.0 => {
                bad(format!("exponential mean {mean} must be positive"))
            }
            Distribution::HyperExponential { branches } => {
                if branches.is_empty() {
                    return bad("hyper-exponential needs at least one branch".into());
                }
                if branches
                    .iter()
                    .any(|b| !(b.p >= 0.0) || !b.mean.is_finite() || b.mean <= 0.0)
                {
                    return bad("hyper-exponential branch has negative p or non-positive mean".into());
                }
                let total: f64 = branches.iter().map(|b| b.p).sum();
                if (total - 1.0).abs() > 1e-9 {
                    return bad(format!("hyper-exponential probabilities sum to {total}"));
                }
                Ok(())
            }
            Distribution::Uniform { low, high }
                if !low.is_finite() || !high.is_finite() || *low < 0.0 || low > high =>
            {
                bad(format!("uniform bounds [{low}, {high}) are invalid"))
            }
            _ => Ok(()),
        }
    }

    /// 理论均值
    pub fn mean(&self) -> f64 {
        match self {
            Distribution::Fixed { value } => *value,
            Distribution::Exponential { mean } => *mean,
            Distribution::HyperExponential { branches } => {
                branches.iter().map(|b| b.p * b.mean).sum()
            }
            Distribution::Uniform { low, high } => (low + high) / 2.0,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let x = match self {
            Distribution::Fixed { value } => *value,
            Distribution::Exponential { mean } => exponential(*mean, rng),
            Distribution::HyperExponential { branches } => {
                // 未通过校验的权重（全零或负数）退化为 0
                WeightedIndex::new(branches.iter().map(|b| b.p))
                    .ok()
                    .and_then(|pick| branches.get(pick.sample(&mut *rng)))
                    .map_or(0.0, |b| exponential(b.mean, rng))
            }
            Distribution::Uniform { low, high } => Uniform::new_inclusive(*low, *high)
                .map_or(*low, |u| u.sample(rng)),
        };
        x.max(0.0)
    }
}

fn exponential<R: Rng + ?Sized>(mean: f64, rng: &mut R) -> f64 {
    Exp::new(1.0 / mean).map_or(0.0, |d| d.sample(rng))
}
