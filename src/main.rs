//! Cinematch - Main Entry Point

use clap::{Parser, Subcommand};
use cinematch::config::PipelineConfig;
use cinematch::preprocessing::content_based::load_ratings_artifact;
use cinematch::{run_experiment, CinematchError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cinematch", about = "Content-based movie rating classification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full experiment described by a properties file
    Run {
        /// Path to the YAML properties file
        #[arg(long, default_value = "properties.yaml")]
        properties: PathBuf,
    },
    /// Print the class distribution of a persisted ratings artifact
    ClassCounts {
        /// Path to the YAML properties file
        #[arg(long, default_value = "properties.yaml")]
        properties: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinematch=info".into()),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CinematchError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { properties } => {
            let config = PipelineConfig::from_file(&properties)?;
            let report = run_experiment(&config)?;

            println!(
                "dataset {} ({} instances, {} features)",
                report.dataset, report.n_instances, report.n_features
            );
            for model in &report.reports {
                println!(
                    "{:>4}  best fold {}  cv macro_f1 {:.4}  test macro_f1 {:.4}  test accuracy {:.4}",
                    model.model,
                    model.best_fold,
                    model.avg_metrics.macro_f1,
                    model.test_metrics.macro_f1,
                    model.test_metrics.accuracy
                );
            }
        }
        Commands::ClassCounts { properties } => {
            let config = PipelineConfig::from_file(&properties)?;
            let artifact = load_ratings_artifact(
                &config.output_dir(),
                &config.dataset,
                config.classification,
            )?;

            let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
            for &class in &artifact.ratings {
                *counts.entry(class).or_insert(0) += 1;
            }
            println!(
                "dataset {} ({}) - {} instances",
                artifact.dataset,
                artifact.classification,
                artifact.ratings.len()
            );
            for (class, count) in counts {
                println!("class {class}: {count}");
            }
        }
    }

    Ok(())
}
