//! bi-runner: headless batch runner for the SaaS BI pipeline.
//!
//! Usage:
//!   bi-runner --seed 42 --customers 200 --out-dir data
//!   bi-runner --config pipeline.json --reporting-date 2024-06-30 --db warehouse.db

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use saas_bi_core::{
    clock::ReportingClock,
    config::PipelineConfig,
    output::ArtifactWriter,
    pipeline::{PipelineEngine, PipelineOutput},
    store::WarehouseStore,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bi-runner")]
#[command(version)]
#[command(about = "Generate a synthetic SaaS dataset and derive its KPIs", long_about = None)]
struct Cli {
    /// JSON config file; missing fields use built-in defaults
    #[arg(long, env = "BI_CONFIG")]
    config: Option<String>,

    /// Master seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of customers to generate (overrides the config file)
    #[arg(long)]
    customers: Option<u32>,

    /// Reference date treated as "now" (YYYY-MM-DD); defaults to today
    #[arg(long)]
    reporting_date: Option<NaiveDate>,

    /// Root directory for raw/ and processed/ artifacts
    #[arg(long, default_value = "data")]
    out_dir: PathBuf,

    /// Also load the star schema into this SQLite warehouse
    #[arg(long)]
    db: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(customers) = cli.customers {
        config.customer_count = customers;
    }

    let clock = cli
        .reporting_date
        .map(ReportingClock::new)
        .unwrap_or_else(ReportingClock::today);

    println!("SaaS BI pipeline");
    println!("  seed:            {}", config.seed);
    println!("  customers:       {}", config.customer_count);
    println!("  reporting date:  {}", clock.reporting_date);
    println!("  out dir:         {}", cli.out_dir.display());
    println!();

    let engine = PipelineEngine::new(config, clock).context("invalid pipeline configuration")?;
    let output = engine.run()?;

    let written = ArtifactWriter::new(&cli.out_dir).write_all(&output)?;
    log::info!("wrote {} artifacts under {}", written.len(), cli.out_dir.display());

    if let Some(db) = &cli.db {
        load_warehouse(db, &output)?;
    }

    print_summary(&output);
    Ok(())
}

fn load_warehouse(db: &str, output: &PipelineOutput) -> Result<()> {
    let store = WarehouseStore::open(db).with_context(|| format!("cannot open {db}"))?;
    store.migrate()?;

    let run_id = uuid::Uuid::new_v4().to_string();
    store.insert_run(
        &run_id,
        output.seed,
        output.clock.reporting_date,
        env!("CARGO_PKG_VERSION"),
    )?;
    store.load_star_schema(&run_id, &output.schema)?;

    let counts = store.row_counts(&run_id)?;
    println!("Warehouse run {run_id} loaded into {db}");
    println!(
        "  customers: {}  plans: {}  days: {}  usage facts: {}  revenue facts: {}",
        counts.dim_customer, counts.dim_plan, counts.dim_time, counts.fact_usage, counts.fact_revenue
    );
    println!();
    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    let k = &output.kpis;
    println!("KPI Summary");
    println!("-----------");
    println!("Churn rate: {:.2}%", k.churn_rate * 100.0);
    println!("Average DAU: {:.2}", k.average_dau);
    println!("Average MAU: {:.2}", k.average_mau);
    println!("Expansion revenue: ${}", format_currency(k.expansion_revenue));
    println!("LTV:CAC ratio: {:.2}", k.ltv_cac_ratio);

    println!();
    println!("Feature adoption trends (last 5 months):");
    let trends = &output.trends;
    if trends.is_empty() {
        println!("  (no usage recorded)");
        return;
    }
    let width = trends.features.iter().map(String::len).max().unwrap_or(0).max(6);
    let mut header = format!("{:<8}", "month");
    for f in &trends.features {
        header.push_str(&format!(" {f:>width$}"));
    }
    println!("{header}");
    for row in trends.tail(5) {
        let mut line = format!("{:<8}", row.month);
        for c in &row.counts {
            line.push_str(&format!(" {c:>width$}"));
        }
        println!("{line}");
    }
}

/// `1234567.891` -> `1,234,567.89`
fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}
