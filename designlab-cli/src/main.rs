//! DesignLab CLI — diagnose simulation tables from the command line.
//!
//! Commands:
//! - `diagnose` — read a simulations CSV, run grouped diagnosands plus the
//!   cluster bootstrap, write the result as CSV or JSON
//! - `history` — show entries from a JSONL diagnosis history file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use designlab_core::diagnosand::{DiagnosandSpec, Diagnosands};
use designlab_runner::{
    diagnose, diagnosis_to_json, read_table_csv, table_to_csv_string, DiagnosisConfig,
    DiagnosisHistory, HistoryEntry, WriteFilter,
};

#[derive(Parser)]
#[command(
    name = "designlab",
    about = "DesignLab CLI — Monte Carlo diagnosis of research designs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose a simulations table: grouped diagnosands plus bootstrap SEs.
    Diagnose {
        /// Simulations CSV (one row per estimate per simulation draw).
        #[arg(long)]
        simulations: PathBuf,

        /// Design-parameters CSV (one row per design), merged by design id.
        #[arg(long)]
        parameters: Option<PathBuf>,

        /// TOML config file; flags below override its fields.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bootstrap replicate count (0 disables bootstrapping).
        #[arg(long)]
        replicates: Option<usize>,

        /// RNG seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Extra grouping columns appended to the default composite key.
        #[arg(long)]
        group_by: Vec<String>,

        /// Run bootstrap replicates on a thread pool.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Emit the full diagnosis as JSON instead of the table as CSV.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Append the run to a JSONL history file.
        #[arg(long)]
        history: Option<PathBuf>,
    },
    /// Show entries from a diagnosis history file.
    History {
        /// JSONL history file.
        file: PathBuf,

        /// Show at most this many most-recent entries.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Diagnose {
            simulations,
            parameters,
            config,
            replicates,
            seed,
            group_by,
            parallel,
            output,
            json,
            history,
        } => run_diagnose(DiagnoseArgs {
            simulations,
            parameters,
            config,
            replicates,
            seed,
            group_by,
            parallel,
            output,
            json,
            history,
        }),
        Commands::History { file, limit } => show_history(file, limit),
    }
}

struct DiagnoseArgs {
    simulations: PathBuf,
    parameters: Option<PathBuf>,
    config: Option<PathBuf>,
    replicates: Option<usize>,
    seed: Option<u64>,
    group_by: Vec<String>,
    parallel: bool,
    output: Option<PathBuf>,
    json: bool,
    history: Option<PathBuf>,
}

fn run_diagnose(args: DiagnoseArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => DiagnosisConfig::from_toml_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DiagnosisConfig::default(),
    };
    if let Some(replicates) = args.replicates {
        config.bootstrap_replicates = replicates;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.extra_group_by.extend(args.group_by);
    if args.parallel {
        config.parallel = true;
    }

    let sims = read_table_csv(&args.simulations)
        .with_context(|| format!("reading simulations {}", args.simulations.display()))?;
    let params = match &args.parameters {
        Some(path) => Some(
            read_table_csv(path)
                .with_context(|| format!("reading parameters {}", path.display()))?,
        ),
        None => None,
    };

    let spec = DiagnosandSpec::shared(Diagnosands::default_set(config.alpha));
    let diagnosis = diagnose(&sims, params.as_ref(), &spec, &config)?;

    let rendered = if args.json {
        diagnosis_to_json(&diagnosis)?
    } else {
        table_to_csv_string(&diagnosis.diagnosands)?
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Diagnosed {} draws into {} groups ({} bootstrap replicates) -> {}",
                diagnosis.fingerprint.n_draws,
                diagnosis.diagnosands.n_rows(),
                diagnosis.bootstrap_replicates,
                path.display()
            );
        }
        None => print!("{rendered}"),
    }

    if let Some(path) = args.history {
        let entry = HistoryEntry::from_diagnosis(&diagnosis, chrono::Utc::now().naive_utc());
        DiagnosisHistory::new(path, WriteFilter::default())
            .append(&entry)
            .context("appending history entry")?;
    }

    Ok(())
}

fn show_history(file: PathBuf, limit: usize) -> Result<()> {
    let entries = DiagnosisHistory::new(file, WriteFilter::default())
        .load()
        .context("loading history")?;
    if entries.is_empty() {
        println!("No history entries.");
        return Ok(());
    }
    for entry in entries.iter().rev().take(limit) {
        let run_id = &entry.fingerprint.run_id;
        let short = &run_id[..run_id.len().min(12)];
        println!(
            "{}  draws={}  replicates={}  group_by=[{}]  run={}",
            entry.timestamp,
            entry.n_draws,
            entry.bootstrap_replicates,
            entry.group_by.join(","),
            short
        );
    }
    Ok(())
}
