use crate::sampling::{SamplingDriver, SamplingPlan, StoppingRule};
use crate::scenario::builtin;
use crate::sim::{ConfigError, SimError};

fn ssq_driver() -> SamplingDriver {
    let sched = builtin("ssq").expect("ssq").build(None).expect("build");
    let mut driver = SamplingDriver::new(sched);
    driver.track("SSQ").expect("track");
    driver
}

#[test]
fn each_cycle_ends_at_a_regeneration_point() {
    let mut driver = ssq_driver();
    let report = driver.collect(50).expect("collect");

    assert_eq!(report.cycles, 50);
    assert_eq!(report.regen_hitted, 50);
    assert!(report.regen_called >= 100);
    assert_eq!(report.leaked, 0);
    assert_eq!(report.accumulators.len(), 4);
    assert!(report.accumulators.iter().all(|a| a.interval.samples == 50));

    let m = &driver.measures().stations()[0];
    assert!(m.utilization.mean() > 0.0 && m.utilization.mean() <= 1.0);
    assert!(m.mean_wait.mean() > 0.0);
    assert!(driver.scheduler().is_network_empty());
}

#[test]
fn stopping_rule_respects_min_and_max_cycles() {
    let mut driver = ssq_driver();
    let loose = driver
        .run_until_precise(StoppingRule {
            precision: 10.0,
            min_cycles: 5,
            max_cycles: 1_000,
        })
        .expect("loose");
    assert!(loose.converged);
    assert_eq!(loose.cycles, 5);

    let mut driver = ssq_driver();
    let strict = driver
        .run_until_precise(StoppingRule {
            precision: 1e-9,
            min_cycles: 10,
            max_cycles: 20,
        })
        .expect("strict");
    assert!(!strict.converged);
    assert_eq!(strict.cycles, 20);
    assert!(strict.worst_precision > 1e-9);
}

#[test]
fn runaway_cycle_hits_step_cap() {
    let sched = builtin("ssq").expect("ssq").build(None).expect("build");
    let mut driver = SamplingDriver::new(sched).with_step_cap(1);
    driver.track_all();
    assert_eq!(driver.run_cycle(), Err(SimError::CycleLimit(1)));
}

#[test]
fn tracking_unknown_station_fails() {
    let mut driver = ssq_driver();
    assert_eq!(
        driver.track("GHOST"),
        Err(ConfigError::UnknownStation("GHOST".into()))
    );
    driver.track("SSQ").expect("duplicate track is ignored");
    assert_eq!(driver.measures().stations().len(), 1);
}

#[test]
fn restart_clears_accumulators() {
    let mut driver = ssq_driver();
    driver.collect(5).expect("collect");
    driver.restart().expect("restart");

    assert_eq!(driver.cycles(), 0);
    assert_eq!(driver.regeneration_point().hitted(), 0);
    assert!(driver.measures().accumulators().all(|a| a.count() == 0));
    assert_eq!(driver.regeneration_point().rules().len(), 2);
    assert_eq!(driver.collect(3).expect("collect").cycles, 3);
}

#[test]
fn os_scenario_cycles_complete() {
    let sched = builtin("os").expect("os").build(None).expect("build");
    let mut driver = SamplingDriver::new(sched);
    driver.track_all();
    let report = driver.collect(3).expect("collect");
    assert_eq!(report.cycles, 3);
    assert_eq!(report.accumulators.len(), 20);
    assert_eq!(report.leaked, 0);
}

#[test]
fn os_scenario_jobs_leave_through_swap_out_every_cycle() {
    let sched = builtin("os").expect("os").build(None).expect("build");
    let mut driver = SamplingDriver::new(sched);
    driver.track_all();
    driver.collect(20).expect("collect");

    let station = |name: &str| {
        driver
            .measures()
            .stations()
            .iter()
            .find(|m| m.name == name)
            .expect("tracked")
    };
    let swap_in = station("SWAP_IN").throughput.mean();
    let swap_out = station("SWAP_OUT").throughput.mean();
    assert!(swap_in > 0.0);
    assert!(
        ((swap_out - swap_in) / swap_in).abs() < 1e-9,
        "SWAP_IN {swap_in} vs SWAP_OUT {swap_out}"
    );
    // a job visits the CPU many times before leaving
    assert!(station("CPU").throughput.mean() > swap_in);
    assert_eq!(driver.report().leaked, 0);
}

#[test]
fn replications_replant_one_seed_each() {
    let mut driver = ssq_driver();
    let report = driver
        .replicate(7, 3, SamplingPlan::Cycles(10))
        .expect("replicate");

    let seeds: Vec<u64> = report.replications.iter().map(|r| r.seed).collect();
    assert_eq!(seeds, [7, 8, 9]);
    assert!(report.replications.iter().all(|r| r.sampling.cycles == 10));
    assert_eq!(report.across.len(), 4);
    assert!(report.across.iter().all(|a| a.interval.samples == 3));
    assert_eq!(driver.scheduler().variates().seed(), 9);

    let sched = builtin("ssq").expect("ssq").build(Some(8)).expect("build");
    let mut fresh = SamplingDriver::new(sched);
    fresh.track("SSQ").expect("track");
    let alone = fresh.collect(10).expect("collect");
    let second = &report.replications[1].sampling;
    for (a, b) in second.accumulators.iter().zip(&alone.accumulators) {
        assert_eq!(a.name, b.name);
        assert!(
            (a.interval.mean - b.interval.mean).abs() <= 1e-12 * b.interval.mean.abs().max(1.0),
            "{}: {} vs {}",
            a.name,
            a.interval.mean,
            b.interval.mean
        );
    }
}

#[test]
fn plan_dispatches_to_cycles_or_stopping_rule() {
    let mut driver = ssq_driver();
    assert_eq!(driver.run(SamplingPlan::Cycles(4)).expect("cycles").cycles, 4);

    driver.restart().expect("restart");
    let precise = driver
        .run(SamplingPlan::Precise(StoppingRule {
            precision: 10.0,
            min_cycles: 6,
            max_cycles: 50,
        }))
        .expect("precise");
    assert!(precise.converged);
    assert_eq!(precise.cycles, 6);
}
