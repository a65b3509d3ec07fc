//! 路由
//!
//! 作业离开站点后去往何处：离开网络、固定下一站，或按离散概率表抽取。

use super::id::StationId;
use crate::sim::ConfigError;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Routing {
    #[default]
    Exit,
    To(StationId),
    Table(Router),
}

impl Routing {
    /// 路由涉及的所有目标站点
    pub fn targets(&self) -> Vec<StationId> {
        match self {
            Routing::Exit => Vec::new(),
            Routing::To(id) => vec![*id],
            Routing::Table(r) => r.destinations().collect(),
        }
    }
}

/// 离散概率路由器：对累积概率做逆 CDF 查找。
#[derive(Debug, Clone, PartialEq)]
pub struct Router {
    /// (目标, 累积概率)
    cumulative: Vec<(StationId, f64)>,
}

impl Router {
    pub fn new(table: &[(StationId, f64)]) -> Result<Self, ConfigError> {
        if table.is_empty() {
            return Err(ConfigError::InvalidRouting("routing table is empty".into()));
        }
        if let Some((to, p)) = table.iter().find(|(_, p)| !(*p >= 0.0) || !p.is_finite()) {
            return Err(ConfigError::InvalidRouting(format!(
                "probability {p} towards {to} is not a valid probability"
            )));
        }
        let total: f64 = table.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(ConfigError::InvalidRouting(format!(
                "probabilities sum to {total}, expected 1"
            )));
        }

        let mut acc = 0.0;
        let mut cumulative: Vec<(StationId, f64)> = table
            .iter()
            .map(|&(to, p)| {
                acc += p;
                (to, acc)
            })
            .collect();
        // 消除累加误差，保证最后一项覆盖 [0,1)
        if let Some(last) = cumulative.last_mut() {
            last.1 = 1.0;
        }
        Ok(Self { cumulative })
    }

    /// 给定 U[0,1) 抽样，返回第一个累积概率大于 `u` 的目标。
    pub fn pick(&self, u: f64) -> StationId {
        self.cumulative
            .iter()
            .find(|(_, c)| *c > u)
            .or(self.cumulative.last())
            .map(|(to, _)| *to)
            .unwrap_or(StationId(0))
    }

    pub fn destinations(&self) -> impl Iterator<Item = StationId> + '_ {
        self.cumulative.iter().map(|(to, _)| *to)
    }

    /// 还原各分支的概率
    pub fn probabilities(&self) -> Vec<(StationId, f64)> {
        let mut prev = 0.0;
        self.cumulative
            .iter()
            .map(|&(to, c)| {
                let p = c - prev;
                prev = c;
                (to, p)
            })
            .collect()
    }
}
