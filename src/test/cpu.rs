use crate::sim::{EndCondition, Event, EventKind, JobPhase, Scheduler, SimError, SimTime};
use crate::station::{StationConfig, StationId};
use crate::variate::Distribution;

fn cpu(quantum: f64) -> (Scheduler, StationId) {
    let mut s = Scheduler::default();
    let id = s
        .add_station(StationConfig::cpu("CPU", quantum))
        .expect("add cpu");
    s.set_end(EndCondition::At(SimTime(1_000.0))).expect("end");
    (s, id)
}

fn completions(s: &mut Scheduler, id: StationId) -> Vec<(String, SimTime)> {
    let mut out = Vec::new();
    let mut seen = 0;
    s.run_until(|s| {
        let done = s.station(id).map_or(0, |st| st.stats().completions);
        if done > seen {
            seen = done;
            if let Some(step) = s.last_step() {
                out.push((step.name.clone(), step.at));
            }
        }
        s.is_network_empty() && s.processed() > 0
    })
    .expect("run");
    out
}

#[test]
fn two_jobs_share_the_cpu_round_robin() {
    let (mut s, id) = cpu(1.0);
    s.inject("A", id, SimTime::ZERO, 4.0).expect("inject A");
    s.inject("B", id, SimTime::ZERO, 4.0).expect("inject B");

    let done = completions(&mut s, id);
    assert_eq!(
        done,
        vec![("A".to_string(), SimTime(7.0)), ("B".to_string(), SimTime(8.0))]
    );
    let st = s.station(id).expect("cpu").stats();
    assert_eq!(st.arrivals, 2);
    assert_eq!(st.completions, 2);
    assert_eq!(st.slices, 8);
}

#[test]
fn job_leaves_after_ceil_demand_over_quantum_slices() {
    for (demand, slices, leave) in [(2.5, 3, 2.5), (3.0, 3, 3.0), (0.4, 1, 0.4)] {
        let (mut s, id) = cpu(1.0);
        s.inject("J", id, SimTime::ZERO, demand).expect("inject");
        let done = completions(&mut s, id);

        assert_eq!(done, vec![("J".to_string(), SimTime(leave))], "demand {demand}");
        assert_eq!(s.station(id).expect("cpu").stats().slices, slices);
    }
}

#[test]
fn inexact_quantum_does_not_add_a_residual_slice() {
    for (demand, quantum, slices) in [(1.0, 0.1, 10), (0.7, 0.1, 7), (1.2, 0.2, 6), (0.75, 0.1, 8)] {
        let (mut s, id) = cpu(quantum);
        s.inject("J", id, SimTime::ZERO, demand).expect("inject");
        let done = completions(&mut s, id);

        assert_eq!(done.len(), 1, "demand {demand} quantum {quantum}");
        assert!((done[0].1.as_f64() - demand).abs() < 1e-9, "left at {}", done[0].1);
        assert_eq!(
            s.station(id).expect("cpu").stats().slices,
            slices,
            "demand {demand} quantum {quantum}"
        );
    }
}

#[test]
fn fresh_arrival_draws_its_burst_from_the_station() {
    let mut s = Scheduler::default();
    let id = s
        .add_station(StationConfig::cpu("CPU", 1.0).with_service(Distribution::fixed(2.0)))
        .expect("add cpu");
    s.set_end(EndCondition::At(SimTime(1_000.0))).expect("end");
    s.inject("J", id, SimTime::ZERO, 100.0).expect("inject");

    let done = completions(&mut s, id);
    assert_eq!(done, vec![("J".to_string(), SimTime(2.0))]);
}

#[test]
fn population_counts_dispatched_jobs() {
    let (mut s, id) = cpu(1.0);
    s.inject("A", id, SimTime::ZERO, 3.0).expect("inject A");
    s.inject("B", id, SimTime::ZERO, 3.0).expect("inject B");

    s.run_until(|s| {
        let st = s.station(id).expect("cpu");
        assert_eq!(
            st.stats().arrivals,
            st.stats().completions + st.population() as u64
        );
        s.is_network_empty() && s.processed() > 0
    })
    .expect("run");
}

#[test]
fn resume_without_dispatch_is_rejected() {
    let (mut s, id) = cpu(1.0);
    let mut ev = Event::new("rogue", EventKind::Arrival, SimTime::ZERO, SimTime(1.0), 1.0, id);
    ev.phase = JobPhase::Resume;
    let h = s.create_event(ev);
    s.schedule(h).expect("schedule");

    let err = s.step().expect_err("resume without dispatch");
    assert!(matches!(err, SimError::UnexpectedResume { .. }));
}

#[test]
fn non_positive_quantum_is_a_config_error() {
    let mut s = Scheduler::default();
    assert!(s.add_station(StationConfig::cpu("CPU", 0.0)).is_err());
    assert!(s.station_id("CPU").is_err());
}
