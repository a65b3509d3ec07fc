//! 再生采样驱动
//!
//! 每个再生周期结束时把被跟踪站点的指标计入累加器并重置网络，
//! 周期之间相互独立，累加器的置信区间因此可以直接使用。

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::regen::{RegenAction, RegenHandler, RegenRule, RegenerationPoint};
use crate::sim::{ConfigError, EventKind, Scheduler, SimError, StepOutcome};
use crate::stats::{Accumulator, ConfidenceInterval};
use crate::station::StationId;

/// 默认置信水平
pub const CONFIDENCE_LEVEL: f64 = 0.90;
/// 单个周期允许处理的最大事件数
pub const DEFAULT_CYCLE_STEP_CAP: u64 = 1_000_000;

/// 停止规则：所有累加器相对精度不超过 `precision` 且至少 `min_cycles` 个周期；
/// 达到 `max_cycles` 时无论是否收敛都停止。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoppingRule {
    pub precision: f64,
    pub min_cycles: u64,
    pub max_cycles: u64,
}

impl Default for StoppingRule {
    fn default() -> Self {
        Self {
            precision: 0.005,
            min_cycles: 40,
            max_cycles: 100_000,
        }
    }
}

/// 一次采样的方式：固定周期数，或按停止规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingPlan {
    Cycles(u64),
    Precise(StoppingRule),
}

/// 单个站点的四个累加器
#[derive(Debug, Clone)]
pub struct StationMeasures {
    pub station: StationId,
    pub name: String,
    pub throughput: Accumulator,
    pub utilization: Accumulator,
    pub mean_customers: Accumulator,
    pub mean_wait: Accumulator,
}

impl StationMeasures {
    fn new(station: StationId, name: &str) -> Self {
        let acc = |metric: &str, unit: &str| {
            Accumulator::with_confidence(format!("{name}.{metric}"), unit, CONFIDENCE_LEVEL)
        };
        Self {
            station,
            name: name.to_string(),
            throughput: acc("throughput", "j/s"),
            utilization: acc("utilization", ""),
            mean_customers: acc("mean_customers", ""),
            mean_wait: acc("mean_wait", "ms"),
        }
    }

    pub fn accumulators(&self) -> [&Accumulator; 4] {
        [
            &self.throughput,
            &self.utilization,
            &self.mean_customers,
            &self.mean_wait,
        ]
    }

    fn reset(&mut self) {
        self.throughput.reset();
        self.utilization.reset();
        self.mean_customers.reset();
        self.mean_wait.reset();
    }
}

/// 采样动作的执行者：持有累加器与周期状态
#[derive(Debug, Clone, Default)]
pub struct Measures {
    stations: Vec<StationMeasures>,
    cycle_done: bool,
    collected: u64,
    leaked: u64,
}

impl Measures {
    pub fn stations(&self) -> &[StationMeasures] {
        &self.stations
    }

    pub fn collected(&self) -> u64 {
        self.collected
    }

    /// 历次重置中检测到的泄漏事件总数
    pub fn leaked(&self) -> u64 {
        self.leaked
    }

    pub fn accumulators(&self) -> impl Iterator<Item = &Accumulator> {
        self.stations.iter().flat_map(|s| s.accumulators())
    }

    pub fn are_ready(&self, precision: f64) -> bool {
        self.accumulators().all(|a| a.precision() <= precision)
    }

    /// 最差的相对精度；没有累加器时为 0
    pub fn worst_precision(&self) -> f64 {
        self.accumulators()
            .map(Accumulator::precision)
            .fold(0.0, f64::max)
    }

    fn collect(&mut self, sched: &Scheduler) {
        let now = sched.now();
        for m in &mut self.stations {
            let Some(st) = sched.station(m.station) else {
                continue;
            };
            let stats = st.stats_at(now);
            m.throughput.add(stats.throughput());
            m.utilization.add(stats.utilization());
            m.mean_customers.add(stats.mean_customers());
            m.mean_wait.add(stats.mean_wait());
        }
        self.collected += 1;
    }

    fn reset(&mut self) {
        for m in &mut self.stations {
            m.reset();
        }
        self.collected = 0;
        self.leaked = 0;
        self.cycle_done = false;
    }
}

impl RegenHandler for Measures {
    fn perform(&mut self, action: RegenAction, sched: &mut Scheduler) -> Result<(), SimError> {
        match action {
            RegenAction::CollectMeasures => self.collect(sched),
            RegenAction::ResetNetwork => {
                let report = sched.reset()?;
                self.leaked += report.leaked;
            }
            RegenAction::EndCycle => self.cycle_done = true,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccumulatorSummary {
    pub name: String,
    pub unit: String,
    #[serde(flatten)]
    pub interval: ConfidenceInterval,
}

impl From<&Accumulator> for AccumulatorSummary {
    fn from(acc: &Accumulator) -> Self {
        Self {
            name: acc.name().to_string(),
            unit: acc.unit().to_string(),
            interval: acc.confidence(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplingReport {
    pub cycles: u64,
    pub converged: bool,
    pub worst_precision: f64,
    pub regen_called: u64,
    pub regen_hitted: u64,
    pub leaked: u64,
    pub accumulators: Vec<AccumulatorSummary>,
}

/// 一个种子上的采样结果
#[derive(Debug, Clone, Serialize)]
pub struct Replication {
    pub seed: u64,
    #[serde(flatten)]
    pub sampling: SamplingReport,
}

/// 多种子复制：每个种子一份报告，外加各次点估计之间的置信区间
#[derive(Debug, Clone, Serialize)]
pub struct ReplicationReport {
    pub first_seed: u64,
    pub replications: Vec<Replication>,
    pub across: Vec<AccumulatorSummary>,
}

pub struct SamplingDriver {
    sched: Scheduler,
    point: RegenerationPoint,
    measures: Measures,
    step_cap: u64,
    cycles: u64,
    converged: bool,
}

impl SamplingDriver {
    /// 使用默认规则（离开事件后网络为空）与默认动作（收集指标、重置网络）
    pub fn new(sched: Scheduler) -> Self {
        let mut point = RegenerationPoint::new();
        point
            .add_rule(RegenRule::LastEvent(EventKind::Departure))
            .add_rule(RegenRule::NetworkEmpty);
        Self::with_point(sched, point)
    }

    /// 自定义规则；常驻动作固定为收集指标后重置网络
    pub fn with_point(sched: Scheduler, mut point: RegenerationPoint) -> Self {
        point
            .add_action(RegenAction::CollectMeasures)
            .add_action(RegenAction::ResetNetwork);
        Self {
            sched,
            point,
            measures: Measures::default(),
            step_cap: DEFAULT_CYCLE_STEP_CAP,
            cycles: 0,
            converged: false,
        }
    }

    pub fn with_step_cap(mut self, cap: u64) -> Self {
        self.step_cap = cap.max(1);
        self
    }

    /// 为站点登记四个累加器；重复登记会被忽略
    pub fn track(&mut self, name: &str) -> Result<StationId, ConfigError> {
        let id = self.sched.station_id(name)?;
        if !self.measures.stations.iter().any(|m| m.station == id) {
            self.measures.stations.push(StationMeasures::new(id, name));
        }
        Ok(id)
    }

    /// 跟踪所有站点
    pub fn track_all(&mut self) {
        let names: Vec<String> = self.sched.stations().map(|s| s.name().to_string()).collect();
        for name in names {
            // 名字来自注册表本身，查找不会失败
            let _ = self.track(&name);
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.sched
    }

    pub fn regeneration_point(&self) -> &RegenerationPoint {
        &self.point
    }

    pub fn measures(&self) -> &Measures {
        &self.measures
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// 运行到下一个再生点，返回本周期处理的事件数
    #[tracing::instrument(level = "debug", skip(self), fields(cycle = self.cycles))]
    pub fn run_cycle(&mut self) -> Result<u64, SimError> {
        self.measures.cycle_done = false;
        self.point.add_one_shot(RegenAction::EndCycle);

        let mut steps = 0;
        while !self.measures.cycle_done {
            if steps >= self.step_cap {
                warn!(cap = self.step_cap, "再生周期超过步数上限");
                return Err(SimError::CycleLimit(self.step_cap));
            }
            let outcome = self.sched.step()?;
            steps += 1;
            if outcome == StepOutcome::Ended {
                // END 截断的周期不完整，丢弃后从空网络重新开始
                debug!(now = %self.sched.now(), "周期被 END 截断，重置网络");
                self.sched.reset()?;
                continue;
            }
            self.point.trigger(&mut self.sched, &mut self.measures)?;
        }
        self.cycles += 1;
        debug!(steps, hitted = self.point.hitted(), "再生周期结束");
        Ok(steps)
    }

    /// 运行固定数量的周期
    pub fn collect(&mut self, cycles: u64) -> Result<SamplingReport, SimError> {
        info!(cycles, "开始采样");
        for _ in 0..cycles {
            self.run_cycle()?;
        }
        self.converged = false;
        Ok(self.report())
    }

    /// 按停止规则运行；达到上限视为未收敛，不是错误
    pub fn run_until_precise(&mut self, rule: StoppingRule) -> Result<SamplingReport, SimError> {
        info!(
            precision = rule.precision,
            min_cycles = rule.min_cycles,
            max_cycles = rule.max_cycles,
            "开始采样，直到满足精度要求"
        );
        let mut done = 0;
        self.converged = false;
        while done < rule.max_cycles {
            if done >= rule.min_cycles && self.measures.are_ready(rule.precision) {
                self.converged = true;
                break;
            }
            self.run_cycle()?;
            done += 1;
        }
        if !self.converged && done >= rule.min_cycles && self.measures.are_ready(rule.precision) {
            self.converged = true;
        }

        if self.converged {
            info!(cycles = done, worst = self.measures.worst_precision(), "✅ 已达到精度要求");
        } else {
            warn!(
                cycles = done,
                worst = self.measures.worst_precision(),
                "达到周期上限仍未收敛"
            );
        }
        Ok(self.report())
    }

    pub fn run(&mut self, plan: SamplingPlan) -> Result<SamplingReport, SimError> {
        match plan {
            SamplingPlan::Cycles(n) => self.collect(n),
            SamplingPlan::Precise(rule) => self.run_until_precise(rule),
        }
    }

    /// 从 `first_seed` 开始依次播种，每个种子独立采样一次。
    ///
    /// 每次复制前重新播种并 `restart`，因此第 i 次复制与用种子
    /// `first_seed + i` 新建的驱动完全一致。
    pub fn replicate(
        &mut self,
        first_seed: u64,
        count: u64,
        plan: SamplingPlan,
    ) -> Result<ReplicationReport, SimError> {
        info!(first_seed, count, "开始多种子复制");
        let mut replications = Vec::new();
        let mut across: Vec<Accumulator> = self
            .measures
            .accumulators()
            .map(|a| Accumulator::with_confidence(a.name(), a.unit(), CONFIDENCE_LEVEL))
            .collect();

        for i in 0..count {
            let seed = first_seed.wrapping_add(i);
            self.sched.variates_mut().plant_seeds(seed);
            self.restart()?;
            let sampling = self.run(plan)?;
            for (acc, m) in across.iter_mut().zip(self.measures.accumulators()) {
                acc.add(m.mean());
            }
            debug!(seed, cycles = sampling.cycles, converged = sampling.converged, "复制结束");
            replications.push(Replication { seed, sampling });
        }

        Ok(ReplicationReport {
            first_seed,
            replications,
            across: across.iter().map(Into::into).collect(),
        })
    }

    /// 清空累加器与再生计数，调度器回到 t=0
    pub fn restart(&mut self) -> Result<(), SimError> {
        self.measures.reset();
        self.cycles = 0;
        self.converged = false;
        let mut point = RegenerationPoint::new();
        point.set_rules(self.point.rules_enabled());
        for rule in self.point.rules() {
            point.add_rule(rule.clone());
        }
        self.point = point;
        self.point
            .add_action(RegenAction::CollectMeasures)
            .add_action(RegenAction::ResetNetwork);
        self.sched.reset()?;
        Ok(())
    }

    pub fn report(&self) -> SamplingReport {
        SamplingReport {
            cycles: self.cycles,
            converged: self.converged,
            worst_precision: self.measures.worst_precision(),
            regen_called: self.point.called(),
            regen_hitted: self.point.hitted(),
            leaked: self.measures.leaked(),
            accumulators: self.measures.accumulators().map(Into::into).collect(),
        }
    }
}
