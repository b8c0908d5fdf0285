//! retention-runner: headless runner for the customer retention simulator.
//!
//! Usage:
//!   retention-runner scenarios --steady-state
//!   retention-runner simulate --initial-customers 10000 --months 12 --db runs.db
//!   retention-runner extend --db runs.db --run-id <uuid> --months 3
//!   retention-runner ipc < requests.jsonl

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use retention_core::{
    api::{self, Response},
    config::SimConfig,
    engine::{simulate, SimParams},
    export,
    record::{records_to_json, MonthlyRecord},
    rehydrate::{extend, rehydrate, ExtendParams},
    steady_state::steady_state,
    store::{RunMeta, RunStore},
    summary::{compare_scenarios, new_customer_series, RunSummary},
};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "retention-runner",
    about = "Customer retention simulator: Markov segment model runner"
)]
struct Cli {
    /// Directory holding scenarios.json and segment_spend.json
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scenarios in catalog order
    Scenarios {
        /// Also print each scenario's active steady state
        #[arg(long)]
        steady_state: bool,
    },
    /// Run a fresh simulation
    Simulate {
        #[arg(long, default_value_t = api::DEFAULT_INITIAL_CUSTOMERS)]
        initial_customers: i64,
        #[arg(long, default_value_t = api::DEFAULT_NEW_CUSTOMERS_PER_MONTH)]
        new_customers: i64,
        #[arg(long, default_value = api::DEFAULT_SCENARIO)]
        scenario: String,
        #[arg(long, default_value_t = api::DEFAULT_MONTHS)]
        months: i64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Continue a previous run from its last record
    Extend {
        /// JSON file holding an array of prior records
        #[arg(long, conflicts_with = "run_id")]
        input: Option<PathBuf>,
        /// Stored run to continue (requires --db)
        #[arg(long, requires = "db")]
        run_id: Option<String>,
        #[arg(long, default_value_t = api::DEFAULT_NEW_CUSTOMERS_PER_MONTH)]
        new_customers: i64,
        #[arg(long, default_value = api::DEFAULT_SCENARIO)]
        scenario: String,
        #[arg(long, default_value_t = api::DEFAULT_EXTENSION_MONTHS)]
        months: i64,
        /// Override the population summed from the last prior record
        #[arg(long)]
        starting_population: Option<i64>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the same parameters under every scenario
    Compare {
        #[arg(long, default_value_t = api::DEFAULT_INITIAL_CUSTOMERS)]
        initial_customers: i64,
        #[arg(long, default_value_t = api::DEFAULT_NEW_CUSTOMERS_PER_MONTH)]
        new_customers: i64,
        #[arg(long, default_value_t = api::DEFAULT_MONTHS)]
        months: i64,
    },
    /// Serve JSON-lines requests on stdin/stdout
    Ipc,
}

#[derive(Args)]
struct OutputArgs {
    /// Print the records as JSON instead of a summary
    #[arg(long)]
    json: bool,
    /// Write a CSV file (a directory gets the default file name)
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write a text report (a directory gets the default file name)
    #[arg(long)]
    report: Option<PathBuf>,
    /// Persist the run to this SQLite database
    #[arg(long)]
    db: Option<String>,
}

// ── IPC ────────────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    Simulate {
        #[serde(flatten)]
        body: Map<String, Value>,
    },
    Extend {
        #[serde(flatten)]
        body: Map<String, Value>,
    },
    Scenarios,
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.data_dir {
        Some(dir) => SimConfig::load(dir)?,
        None => SimConfig::builtin(),
    };

    match cli.command {
        Commands::Scenarios { steady_state } => print_scenarios(&config, steady_state)?,
        Commands::Simulate { initial_customers, new_customers, scenario, months, output } => {
            let params = SimParams::new(initial_customers, new_customers, scenario, months);
            let records = simulate(&config, &params)?;
            let run_id = match &output.db {
                Some(db) => Some(persist(db, &RunMeta::for_simulation(&params), &records)?),
                None => None,
            };
            emit(&params.scenario, &records, run_id.as_deref(), &output)?;
        }
        Commands::Extend {
            input,
            run_id,
            new_customers,
            scenario,
            months,
            starting_population,
            output,
        } => {
            let prior = load_prior(input.as_deref(), run_id.as_deref(), output.db.as_deref())?;
            let params = ExtendParams {
                new_customers_per_month: new_customers,
                scenario,
                months,
                starting_population,
            };
            let records = extend(&config, &prior, &params)?;
            let new_run_id = match &output.db {
                Some(db) => {
                    let population = match params.starting_population {
                        Some(p) => p,
                        None => rehydrate(&prior)?.population,
                    };
                    let meta = RunMeta::for_extension(run_id.as_deref(), &params, population);
                    Some(persist(db, &meta, &records)?)
                }
                None => None,
            };
            emit(&params.scenario, &records, new_run_id.as_deref(), &output)?;
        }
        Commands::Compare { initial_customers, new_customers, months } => {
            let params = SimParams::new(initial_customers, new_customers, api::DEFAULT_SCENARIO, months);
            let outcomes = compare_scenarios(&config, &params)?;
            println!("=== SCENARIO COMPARISON ({months} months) ===");
            for o in &outcomes {
                println!(
                    "  {:<28} customers: {:>8} | revenue: ${:>12.2} | churn: {:.2}%",
                    o.scenario, o.final_customers, o.final_revenue, o.final_churn_rate
                );
            }
        }
        Commands::Ipc => run_ipc_loop(&config)?,
    }

    Ok(())
}

fn print_scenarios(config: &SimConfig, with_steady_state: bool) -> Result<()> {
    for scenario in config.catalog.scenarios() {
        if with_steady_state {
            let ss = steady_state(&scenario.matrix)?;
            let shares: Vec<String> = ss.iter().map(|p| format!("{:.4}", p)).collect();
            println!("{:<28} [{}]", scenario.name, shares.join(", "));
        } else {
            println!("{}", scenario.name);
        }
    }
    Ok(())
}

fn load_prior(input: Option<&Path>, run_id: Option<&str>, db: Option<&str>) -> Result<Vec<Value>> {
    match (input, run_id, db) {
        (Some(path), _, _) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            let parsed: Value = serde_json::from_str(&content)
                .with_context(|| format!("Cannot parse {}", path.display()))?;
            match parsed {
                Value::Array(records) => Ok(records),
                _ => bail!("{}: expected a JSON array of records", path.display()),
            }
        }
        (None, Some(run_id), Some(db)) => {
            let store = RunStore::open(db)?;
            store.migrate()?;
            Ok(store.records_for_run(run_id)?)
        }
        _ => bail!("extend needs either --input <file> or --db <path> --run-id <id>"),
    }
}

fn persist(db: &str, meta: &RunMeta, records: &[MonthlyRecord]) -> Result<String> {
    let mut store = RunStore::open(db)?;
    store.migrate()?;
    store.insert_run(meta)?;
    store.append_records(&meta.run_id, records)?;
    log::info!("saved run {} ({} records) to {db}", meta.run_id, records.len());
    Ok(meta.run_id.clone())
}

/// `path` itself, or the default file name inside it when it is a directory.
fn output_path(path: &Path, default_name: String) -> PathBuf {
    if path.is_dir() {
        path.join(default_name)
    } else {
        path.to_path_buf()
    }
}

fn emit(
    scenario: &str,
    records: &[MonthlyRecord],
    run_id: Option<&str>,
    output: &OutputArgs,
) -> Result<()> {
    let summary = RunSummary::from_records(records);

    if let Some(path) = &output.csv {
        let path = output_path(path, export::csv_file_name(scenario));
        let file = File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?;
        export::write_csv(records, BufWriter::new(file))?;
        log::info!("wrote {}", path.display());
    }
    if let (Some(path), Some(summary)) = (&output.report, &summary) {
        let path = output_path(path, export::report_file_name(scenario));
        let file = File::create(&path).with_context(|| format!("Cannot create {}", path.display()))?;
        export::write_report(scenario, summary, BufWriter::new(file))?;
        log::info!("wrote {}", path.display());
    }

    if output.json {
        let json = Value::Array(records_to_json(records));
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else if let Some(summary) = &summary {
        print_summary(scenario, records, summary, run_id);
    }
    Ok(())
}

fn print_summary(scenario: &str, records: &[MonthlyRecord], summary: &RunSummary, run_id: Option<&str>) {
    let pct = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |p| format!("{p:+.2}%"));

    println!("=== RUN SUMMARY ===");
    if let Some(run_id) = run_id {
        println!("  run_id:          {run_id}");
    }
    println!("  scenario:        {scenario}");
    println!("  months:          {} to {}", summary.first_month, summary.last_month);
    println!("  customers:       {} -> {}", summary.initial_customers, summary.final_customers);
    println!("  customer growth: {}", pct(summary.customer_growth_pct));
    println!("  revenue:         ${:.2} -> ${:.2}", summary.initial_revenue, summary.final_revenue);
    println!("  revenue growth:  {}", pct(summary.revenue_growth_pct));
    println!("  final churn:     {:.2}%", summary.final_churn_rate);
    println!("  revenue at risk: ${:.2} / year", summary.annual_revenue_at_risk);

    println!();
    println!("=== MONTHLY DETAIL ===");
    let new_customers = new_customer_series(records);
    for (record, new) in records.iter().zip(new_customers) {
        println!(
            "  month {:>3} | customers: {:>8} | new: {:>6} | revenue: ${:>12.2} | churn: {:.2}%",
            record.month, record.total_customers, new, record.monthly_revenue, record.churn_rate
        );
    }
}

fn run_ipc_loop(config: &SimConfig) -> Result<()> {
    if !api::check_inflow_handling(config)? {
        log::warn!("ipc: inflow self-check failed, results may be off");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                let err_json = serde_json::json!({ "status": 400, "body": { "error": e.to_string() } });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match request {
            IpcRequest::Quit => break,
            IpcRequest::Simulate { body } => {
                Response::from_result(api::handle_simulate(config, &Value::Object(body)))
            }
            IpcRequest::Extend { body } => {
                Response::from_result(api::handle_extend(config, &Value::Object(body)))
            }
            IpcRequest::Scenarios => Response::ok(api::list_scenarios(config)),
        };
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    Ok(())
}
