//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;

use crate::config::Settings;
use crate::serve::{run_server, ServeConfig};
use crate::train::{run_training, TrainOptions};

fn step_ok(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

#[derive(Parser)]
#[command(name = "heartml")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart disease classification: training, tracking, export, serving")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the model catalog and export the best classifier
    Train {
        /// Reduced grids and 3-fold CV for fast iteration
        #[arg(long)]
        quick: bool,

        /// Held-out test fraction
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Dataset CSV; defaults to processed, then raw, then the sample
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Serve the exported model over HTTP
    Serve {
        /// Bind host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Bind port
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Exported model directory
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },

    /// Clean the raw dataset into data/processed
    Prepare,
}

/// Run the training pipeline and print a short report.
pub fn cmd_train(quick: bool, test_size: f64, data: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = Settings::default();
    let opts = TrainOptions {
        quick,
        test_size,
        data,
    };

    let report = run_training(&settings, &opts)?;

    println!();
    for summary in &report.summaries {
        let marker = if summary.name == report.best_name {
            "best".green().bold().to_string()
        } else {
            "    ".to_string()
        };
        println!(
            "  {} {:<14} roc_auc={:.4}  accuracy={:.4}",
            marker,
            summary.name,
            summary.metrics.get("roc_auc").copied().unwrap_or(0.0),
            summary.metrics.get("accuracy").copied().unwrap_or(0.0),
        );
    }
    println!();
    step_ok(&format!(
        "exported {} (run {}) to {}",
        report.best_name, report.best_run_id, report.export.artifact_path
    ));
    step_ok(&format!("summary at {}", report.summary_path.display()));

    Ok(())
}

/// Start the API server.
pub async fn cmd_serve(host: String, port: u16, model_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = ServeConfig {
        host,
        port,
        ..ServeConfig::default()
    };
    if let Some(dir) = model_dir {
        config.model_dir = dir;
    }
    run_server(config).await
}

/// Clean the raw dataset into the processed directory.
pub fn cmd_prepare() -> anyhow::Result<()> {
    let settings = Settings::default();
    let path = crate::data::prepare(&settings)?;
    step_ok(&format!("processed dataset at {}", path.display()));
    Ok(())
}
