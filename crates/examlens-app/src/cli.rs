//! CLI argument definitions for the ExamLens application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// ExamLens - groups recurring exam questions into prioritised topics.
#[derive(Parser, Debug)]
#[command(name = "examlens", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the SQLite database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a JSON array of question records into the database.
    Import {
        /// JSON file with `subject_id` plus question fields per entry.
        file: PathBuf,
    },
    /// Cluster a subject's questions and store the results.
    Analyze {
        #[arg(long)]
        subject: Uuid,
        /// Only re-cluster this module.
        #[arg(long)]
        module: Option<Uuid>,
        /// Ignore embeddings and compare keywords only.
        #[arg(long)]
        keyword_only: bool,
        /// Cluster modules in parallel.
        #[arg(long)]
        parallel: bool,
    },
    /// Print stored clusters as JSON.
    Clusters {
        #[arg(long)]
        subject: Uuid,
        #[arg(long)]
        module: Option<Uuid>,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > EXAMLENS_CONFIG env var > platform default (~/.examlens/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("EXAMLENS_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".examlens").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".examlens").join("config.toml");
    }
    PathBuf::from("config.toml")
}
