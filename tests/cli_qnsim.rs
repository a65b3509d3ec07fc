use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "qnsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn qnsim(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_qnsim"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run qnsim")
}

fn json_stdout(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "qnsim failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn list_prints_builtin_scenarios() {
    let v = json_stdout(&qnsim(&["--list", "--json"]));
    let names: Vec<&str> = v
        .as_array()
        .expect("array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(names, ["ssq", "repair_shop", "os"]);
}

#[test]
fn fixed_run_reports_conserved_counts() {
    let v = json_stdout(&qnsim(&["--scenario", "ssq", "--until", "2000", "--json"]));
    assert_eq!(v["scenario"], "ssq");
    assert_eq!(v["report"]["state"], "ended");
    assert_eq!(v["report"]["clock"].as_f64(), Some(2000.0));
    assert!(v.get("sampling").is_none());

    let st = &v["report"]["stations"][0];
    assert_eq!(st["name"], "SSQ");
    let arrivals = st["arrivals"].as_u64().expect("arrivals");
    let completions = st["completions"].as_u64().expect("completions");
    let population = st["population"].as_u64().expect("population");
    assert!(arrivals > 0);
    assert_eq!(arrivals, completions + population);
}

#[test]
fn same_seed_gives_identical_output() {
    let a = json_stdout(&qnsim(&["--until", "5000", "--seed", "3", "--json"]));
    let b = json_stdout(&qnsim(&["--until", "5000", "--seed", "3", "--json"]));
    assert_eq!(a, b);
    assert_eq!(a["seed"], 3);
}

#[test]
fn cycles_flag_runs_regenerative_sampling() {
    let v = json_stdout(&qnsim(&["--scenario", "ssq", "--cycles", "7", "--json"]));
    let s = &v["sampling"];
    assert_eq!(s["cycles"], 7);
    assert_eq!(s["regen_hitted"], 7);
    assert_eq!(s["leaked"], 0);
    assert_eq!(s["accumulators"].as_array().expect("accumulators").len(), 4);
    assert_eq!(s["accumulators"][0]["name"], "SSQ.throughput");
}

#[test]
fn config_file_drives_the_run() {
    let dir = unique_temp_dir("config");
    let path = dir.join("scenario.json");
    fs::write(
        &path,
        r#"
{
    "name": "fixed",
    "stations": [ { "name": "Q", "kind": "fcfs" } ],
    "arrivals": {
        "entry": "Q",
        "interarrival": { "kind": "fixed", "value": 10.0 },
        "service": { "kind": "fixed", "value": 4.0 }
    },
    "end": { "kind": "at", "time": 100.0 }
}
        "#,
    )
    .expect("write scenario");

    let v = json_stdout(&qnsim(&["--config", path.to_str().unwrap(), "--json"]));
    let st = &v["report"]["stations"][0];
    assert_eq!(st["arrivals"], 9);
    assert_eq!(st["completions"], 9);
    let util = st["utilization"].as_f64().expect("utilization");
    assert!((util - 0.36).abs() < 1e-12);
}

#[test]
fn unknown_scenario_exits_with_config_error() {
    let out = qnsim(&["--scenario", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown scenario"));
}

#[test]
fn replications_use_consecutive_seeds() {
    let v = json_stdout(&qnsim(&[
        "--scenario",
        "ssq",
        "--seed",
        "40",
        "--replications",
        "3",
        "--cycles",
        "5",
        "--json",
    ]));
    assert!(v.get("sampling").is_none());
    let r = &v["replications"];
    assert_eq!(r["first_seed"], 40);
    let seeds: Vec<u64> = r["replications"]
        .as_array()
        .expect("replications")
        .iter()
        .map(|rep| {
            assert_eq!(rep["cycles"], 5);
            rep["seed"].as_u64().expect("seed")
        })
        .collect();
    assert_eq!(seeds, [40, 41, 42]);
    let across = r["across"].as_array().expect("across");
    assert_eq!(across.len(), 4);
    assert!(across.iter().all(|a| a["samples"] == 3));
}
