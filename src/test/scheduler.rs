use crate::sim::{
    ArrivalProcess, ConfigError, EndCondition, Event, EventKind, ProbeSchedule, RunState,
    Scheduler, SimError, SimTime,
};
use crate::station::{Routing, StationConfig, StationId};
use crate::variate::{Distribution, VariateSource};

fn fixed_ssq() -> (Scheduler, StationId) {
    let mut s = Scheduler::default();
    let id = s.add_station(StationConfig::fcfs("SSQ")).expect("station");
    s.set_arrivals(ArrivalProcess {
        entry: id,
        interarrival: Distribution::fixed(10.0),
        service: Distribution::fixed(4.0),
    })
    .expect("arrivals");
    (s, id)
}

#[test]
fn auto_end_fires_once_backlog_drains_after_warmup() {
    let (mut s, id) = fixed_ssq();
    s.set_end(EndCondition::Auto {
        warmup: SimTime(50.0),
        station: id,
    })
    .expect("end");

    assert_eq!(s.execute().expect("execute"), SimTime(54.0));
    let st = s.station(id).expect("station").stats();
    assert_eq!((st.arrivals, st.completions), (5, 5));
}

#[test]
fn execute_without_end_condition_is_refused() {
    let (mut s, _) = fixed_ssq();
    assert_eq!(s.execute(), Err(SimError::Unbounded));
    assert_eq!(s.state(), RunState::Uninitialized);
}

#[test]
fn reset_reports_exactly_the_leaked_events() {
    let (mut s, id) = fixed_ssq();
    let handles: Vec<_> = (0..5)
        .map(|i| {
            s.create_event(Event::new(
                format!("e{i}"),
                EventKind::Arrival,
                SimTime::ZERO,
                SimTime(1.0),
                0.0,
                id,
            ))
        })
        .collect();
    for h in &handles[..4] {
        s.release(*h).expect("release");
    }
    assert!(matches!(s.release(handles[0]), Err(SimError::StaleHandle(_))));

    let report = s.reset().expect("reset");
    assert_eq!(report.leaked, 1);
    assert_eq!(s.state(), RunState::Running);
    assert!(s.event(handles[4]).is_err());

    let clean = s.reset().expect("second reset");
    assert_eq!(clean.leaked, 0);
    assert_eq!(clean.released_from_list, 1);
}

#[test]
fn reset_returns_network_to_time_zero() {
    let (mut s, id) = fixed_ssq();
    s.run_until(|s| s.now() >= SimTime(42.0)).expect("run");
    assert!(s.station(id).expect("station").stats().arrivals > 0);

    let report = s.reset().expect("reset");
    assert_eq!(report.leaked, 0);
    assert_eq!(s.now(), SimTime::ZERO);
    let st = s.station(id).expect("station");
    assert_eq!(st.stats().arrivals, 0);
    assert_eq!(st.population(), 0);
    assert_eq!(s.events().len(), 1);
}

#[test]
fn scheduling_into_the_past_is_rejected() {
    let (mut s, id) = fixed_ssq();
    s.run_until(|s| s.now() >= SimTime(20.0)).expect("run");
    assert!(matches!(
        s.inject("late", id, SimTime(5.0), 1.0),
        Err(SimError::NonCausal { .. })
    ));
    assert_eq!(s.state(), RunState::Running);
}

#[test]
fn configuration_errors_leave_state_untouched() {
    let (mut s, _) = fixed_ssq();
    assert_eq!(
        s.add_station(StationConfig::fcfs("SSQ")),
        Err(ConfigError::DuplicateStation("SSQ".into()))
    );
    assert!(matches!(
        s.station_id("nope"),
        Err(ConfigError::UnknownStation(_))
    ));
    assert!(
        s.add_station(StationConfig::fcfs("X").with_routing(Routing::To(StationId(9))))
            .is_err()
    );
    let bad_end = EndCondition::Auto {
        warmup: SimTime::ZERO,
        station: StationId(7),
    };
    assert!(s.set_end(bad_end).is_err());
    assert_eq!(s.station_count(), 1);
    assert_eq!(*s.end_condition(), EndCondition::Never);
}

#[test]
fn probes_sample_population_without_changing_it() {
    let (mut s, id) = fixed_ssq();
    s.set_end(EndCondition::At(SimTime(100.0))).expect("end");
    s.set_probe(ProbeSchedule {
        station: id,
        every: 5.0,
    })
    .expect("probe");
    s.execute().expect("execute");

    let st = s.station(id).expect("station").stats();
    assert_eq!(st.probes, 19);
    assert_eq!(st.probe_population, 9);
    assert_eq!((st.arrivals, st.completions), (9, 9));
}

#[test]
fn tandem_routing_moves_jobs_downstream() {
    let mut s = Scheduler::default();
    let a = s.add_station(StationConfig::fcfs("A")).expect("A");
    let b = s
        .add_station(StationConfig::delay("B").with_service(Distribution::fixed(3.0)))
        .expect("B");
    s.set_routing(a, Routing::To(b)).expect("routing");
    s.set_arrivals(ArrivalProcess {
        entry: a,
        interarrival: Distribution::fixed(10.0),
        service: Distribution::fixed(2.0),
    })
    .expect("arrivals");
    s.set_end(EndCondition::At(SimTime(60.0))).expect("end");
    s.execute().expect("execute");

    let sa = s.station(a).expect("A").stats();
    let sb = s.station(b).expect("B").stats();
    assert_eq!((sa.arrivals, sa.completions), (5, 5));
    assert_eq!((sb.arrivals, sb.completions), (5, 5));
    assert!((sb.mean_wait() - 3.0).abs() < 1e-12);
    assert!(s.station(b).expect("B").queue().is_none());
}

#[test]
fn same_seed_runs_are_bit_identical() {
    let run = |seed: u64| {
        let mut s = Scheduler::new(VariateSource::new(seed));
        let id = s
            .add_station(StationConfig::fcfs("SSQ").with_service(Distribution::exponential(7.0)))
            .expect("station");
        s.set_arrivals(ArrivalProcess {
            entry: id,
            interarrival: Distribution::exponential(10.0),
            service: Distribution::fixed(0.0),
        })
        .expect("arrivals");
        s.set_end(EndCondition::At(SimTime(10_000.0))).expect("end");
        s.execute().expect("execute");
        let st = s.station(id).expect("station").stats().clone();
        (st.arrivals, st.completions, st.busy_time.to_bits())
    };
    assert_eq!(run(5), run(5));
    assert_ne!(run(5), run(6));
}

#[test]
fn conservation_holds_at_end_event() {
    let mut s = Scheduler::new(VariateSource::new(77));
    let cpu = s
        .add_station(
            StationConfig::cpu("CPU", 2.7).with_service(Distribution::exponential(27.0)),
        )
        .expect("cpu");
    let io = s
        .add_station(
            StationConfig::fcfs("IO")
                .with_service(Distribution::exponential(40.0))
                .with_routing(Routing::To(cpu)),
        )
        .expect("io");
    let table = crate::station::Router::new(&[(io, 0.5), (cpu, 0.3), (StationId(2), 0.2)]);
    let out = s
        .add_station(StationConfig::delay("OUT").with_service(Distribution::fixed(0.0)))
        .expect("out");
    assert_eq!(out, StationId(2));
    s.set_routing(cpu, Routing::Table(table.expect("table")))
        .expect("routing");
    s.set_arrivals(ArrivalProcess {
        entry: cpu,
        interarrival: Distribution::exponential(400.0),
        service: Distribution::fixed(0.0),
    })
    .expect("arrivals");
    s.set_end(EndCondition::At(SimTime(50_000.0))).expect("end");
    s.execute().expect("execute");

    for st in s.stations() {
        assert_eq!(
            st.stats().arrivals,
            st.stats().completions + st.population() as u64,
            "{}",
            st.name()
        );
    }
    let report = s.report();
    assert_eq!(report.stations.len(), 3);
    let cpu_report = report.station("CPU").expect("cpu");
    assert!(cpu_report.slices >= cpu_report.completions);
}
