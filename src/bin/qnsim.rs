use clap::Parser;
use qnsim_rs::report::SimulationReport;
use qnsim_rs::sampling::{
    AccumulatorSummary, ReplicationReport, SamplingDriver, SamplingPlan, SamplingReport,
};
use qnsim_rs::scenario::{ScenarioSpec, builtin, builtin_names};
use qnsim_rs::sim::{EndCondition, SimError, SimTime};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "qnsim",
    about = "Discrete-event simulation of queueing networks with regenerative sampling"
)]
struct Args {
    /// Built-in scenario name (see --list)
    #[arg(long, default_value = "ssq", conflicts_with = "config")]
    scenario: String,

    /// Path to a scenario JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// List built-in scenarios and exit
    #[arg(long)]
    list: bool,

    /// Override the master seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run until this simulated time (replaces the scenario's end condition)
    #[arg(long)]
    until: Option<f64>,

    /// Collect exactly this many regeneration cycles
    #[arg(long, conflicts_with_all = ["precision", "min_cycles", "max_cycles"])]
    cycles: Option<u64>,

    /// Sample regeneration cycles until every accumulator reaches this relative precision
    #[arg(long)]
    precision: Option<f64>,

    /// Minimum number of cycles before the precision check may stop sampling
    #[arg(long)]
    min_cycles: Option<u64>,

    /// Maximum number of cycles to sample
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Repeat sampling with N consecutive seeds, starting at --seed (or the scenario seed)
    #[arg(long)]
    replications: Option<u64>,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Output {
    scenario: String,
    seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampling: Option<SamplingReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replications: Option<ReplicationReport>,
    report: SimulationReport,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    if args.list {
        if args.json {
            println!("{}", serde_json::json!(builtin_names()));
        } else {
            for name in builtin_names() {
                println!("{name}");
            }
        }
        return ExitCode::SUCCESS;
    }

    let output = match run(&args) {
        Ok(output) => output,
        Err(SimError::Config(e)) => {
            error!(error = %e, "配置错误");
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
        Err(e) => {
            error!(error = %e, "仿真失败");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                error!(error = %e, "结果序列化失败");
                eprintln!("error: failed to serialize output: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_text(&output);
    }
    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<Output, SimError> {
    let spec = match &args.config {
        Some(path) => ScenarioSpec::load(path)?,
        None => builtin(&args.scenario)?,
    };
    let mut sched = spec.build(args.seed)?;
    let seed = sched.variates().seed();
    if let Some(t) = args.until {
        sched.set_end(EndCondition::At(SimTime(t)))?;
    }

    let wants_sampling = args.cycles.is_some()
        || args.precision.is_some()
        || args.min_cycles.is_some()
        || args.max_cycles.is_some()
        || args.replications.is_some()
        || *sched.end_condition() == EndCondition::Never;

    if !wants_sampling {
        let end = sched.execute()?;
        info!(scenario = %spec.name, end = %end, "运行结束");
        return Ok(Output {
            scenario: spec.name.clone(),
            seed,
            sampling: None,
            replications: None,
            report: sched.report(),
        });
    }

    let plan = match args.cycles {
        Some(n) => SamplingPlan::Cycles(n),
        None => {
            let mut rule = spec.stopping_rule();
            rule.precision = args.precision.unwrap_or(rule.precision);
            rule.min_cycles = args.min_cycles.unwrap_or(rule.min_cycles);
            rule.max_cycles = args.max_cycles.unwrap_or(rule.max_cycles);
            SamplingPlan::Precise(rule)
        }
    };

    let mut driver = SamplingDriver::new(sched);
    if spec.tracked().is_empty() {
        driver.track_all();
    } else {
        for name in spec.tracked() {
            driver.track(name)?;
        }
    }

    let (sampling, replications) = match args.replications {
        Some(n) => (None, Some(driver.replicate(seed, n, plan)?)),
        None => (Some(driver.run(plan)?), None),
    };
    Ok(Output {
        scenario: spec.name.clone(),
        seed,
        sampling,
        replications,
        report: driver.scheduler().report(),
    })
}

fn print_text(out: &Output) {
    println!("scenario {} (seed {})", out.scenario, out.seed);
    if let Some(s) = &out.sampling {
        print_sampling(s);
    }
    if let Some(r) = &out.replications {
        for rep in &r.replications {
            print!("seed {}: ", rep.seed);
            print_sampling(&rep.sampling);
        }
        println!("across {} replications:", r.replications.len());
        print_accumulators(&r.across);
    }
    print!("{}", out.report);
}

fn print_sampling(s: &SamplingReport) {
    println!(
        "cycles={} converged={} worst_precision={:.6} regen hitted={}/{} leaked={}",
        s.cycles, s.converged, s.worst_precision, s.regen_hitted, s.regen_called, s.leaked
    );
    print_accumulators(&s.accumulators);
}

fn print_accumulators(accs: &[AccumulatorSummary]) {
    for acc in accs {
        println!(
            "  {:<28} {:>14.6} ± {:<12.6} (n={}, precision {:.6})",
            acc.name,
            acc.interval.mean,
            acc.interval.half_width,
            acc.interval.samples,
            acc.interval.precision
        );
    }
}
