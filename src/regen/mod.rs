//! 再生点
//!
//! 一组规则（对调度器状态的只读谓词）加两组动作：常驻动作每次命中都执行，
//! 一次性动作命中一次后丢弃。规则与动作都是小型描述符，真正的副作用由
//! 实现了 [`RegenHandler`] 的上层对象完成。

use serde::Serialize;
use tracing::{debug, trace};

use crate::sim::{EventKind, Scheduler, SimError, SimTime};
use crate::station::StationId;

/// 再生规则
#[derive(Debug, Clone, PartialEq)]
pub enum RegenRule {
    /// 所有站点都没有作业
    NetworkEmpty,
    /// 指定站点没有作业
    StationEmpty(StationId),
    /// 最近处理的事件属于给定类型
    LastEvent(EventKind),
    /// 最近处理的事件属于给定类型，且发生在指定站点
    LastEventAt { kind: EventKind, station: StationId },
    /// 时钟已超过给定时刻
    ClockAfter(SimTime),
}

impl RegenRule {
    pub fn holds(&self, sched: &Scheduler) -> bool {
        match self {
            RegenRule::NetworkEmpty => sched.is_network_empty(),
            RegenRule::StationEmpty(id) => sched.station(*id).is_some_and(|s| s.population() == 0),
            RegenRule::LastEvent(kind) => sched.last_step().is_some_and(|s| s.kind == *kind),
            RegenRule::LastEventAt { kind, station } => sched
                .last_step()
                .is_some_and(|s| s.kind == *kind && s.station == *station),
            RegenRule::ClockAfter(t) => sched.now() > *t,
        }
    }
}

/// 再生动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenAction {
    /// 把各站点本周期的指标计入累加器
    CollectMeasures,
    /// 重置调度器，开始新的独立周期
    ResetNetwork,
    /// 标记当前采样周期结束
    EndCycle,
}

/// 动作的执行者
pub trait RegenHandler {
    fn perform(&mut self, action: RegenAction, sched: &mut Scheduler) -> Result<(), SimError>;
}

#[derive(Debug, Clone)]
pub struct RegenerationPoint {
    rules: Vec<RegenRule>,
    actions: Vec<RegenAction>,
    one_shot: Vec<RegenAction>,
    rules_enabled: bool,
    called: u64,
    hitted: u64,
}

impl Default for RegenerationPoint {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            actions: Vec::new(),
            one_shot: Vec::new(),
            rules_enabled: true,
            called: 0,
            hitted: 0,
        }
    }
}

impl RegenerationPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: RegenRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn add_action(&mut self, action: RegenAction) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// 下一次命中时执行，然后丢弃
    pub fn add_one_shot(&mut self, action: RegenAction) -> &mut Self {
        self.one_shot.push(action);
        self
    }

    /// 关闭规则后 `trigger` 仍计数 `called`，但永不命中
    pub fn set_rules(&mut self, enabled: bool) {
        self.rules_enabled = enabled;
    }

    pub fn rules_enabled(&self) -> bool {
        self.rules_enabled
    }

    pub fn rules(&self) -> &[RegenRule] {
        &self.rules
    }

    pub fn actions(&self) -> &[RegenAction] {
        &self.actions
    }

    pub fn pending_one_shot(&self) -> &[RegenAction] {
        &self.one_shot
    }

    pub fn called(&self) -> u64 {
        self.called
    }

    pub fn hitted(&self) -> u64 {
        self.hitted
    }

    /// 规则是否全部成立（不计数、不执行动作）
    pub fn evaluate(&self, sched: &Scheduler) -> bool {
        self.rules_enabled && self.rules.iter().all(|r| r.holds(sched))
    }

    /// 评估规则；全部成立时依次执行常驻动作与一次性动作。返回是否命中。
    pub fn trigger<H: RegenHandler>(
        &mut self,
        sched: &mut Scheduler,
        handler: &mut H,
    ) -> Result<bool, SimError> {
        self.called += 1;
        if !self.evaluate(sched) {
            return Ok(false);
        }
        self.hitted += 1;
        trace!(hitted = self.hitted, called = self.called, now = %sched.now(), "再生点命中");

        for action in self.actions.clone() {
            handler.perform(action, sched)?;
        }
        // 动作执行期间新登记的一次性动作留到下一次命中
        let once = std::mem::take(&mut self.one_shot);
        for action in once {
            handler.perform(action, sched)?;
        }
        Ok(true)
    }

    /// 清空规则、动作与计数；`rules_enabled` 保持不变
    pub fn reset(&mut self) {
        debug!(called = self.called, hitted = self.hitted, "再生点已重置");
        self.rules.clear();
        self.actions.clear();
        self.one_shot.clear();
        self.called = 0;
        self.hitted = 0;
    }
}
