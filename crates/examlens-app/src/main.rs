//! ExamLens application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Open the SQLite database
//! 4. Run the requested command (import, analyze, clusters)

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use uuid::Uuid;

use examlens_cluster::{ClusteringService, ScopeOutcome, SubjectReport};
use examlens_core::config::BackendPreference;
use examlens_core::{ClusterSink, ExamLensConfig, QuestionRecord, QuestionSource};
use examlens_storage::{ClusterRepository, Database, QuestionRepository};

use cli::{CliArgs, Command};

/// Expand a leading `~` to the user's home directory.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Load the config file if present; a missing file means defaults.
fn load_config(path: &Path) -> Result<ExamLensConfig, examlens_core::ExamLensError> {
    if path.exists() {
        ExamLensConfig::load(path)
    } else {
        Ok(ExamLensConfig::default())
    }
}

fn import(questions: &QuestionRepository, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(file)?;
    let records: Vec<QuestionRecord> = serde_json::from_str(&content)?;
    let stored = questions.save_many(&records)?;
    tracing::info!(file = %file.display(), stored, "Questions imported");
    println!("Imported {} questions from {}", stored, file.display());
    Ok(())
}

async fn analyze<S, K>(
    service: &ClusteringService,
    source: &S,
    sink: &K,
    subject_id: Uuid,
    module_id: Option<Uuid>,
    parallel: bool,
) -> Result<SubjectReport, examlens_core::ExamLensError>
where
    S: QuestionSource,
    K: ClusterSink,
{
    if parallel {
        service
            .analyze_concurrent(source, sink, subject_id, module_id)
            .await
    } else {
        service.analyze(source, sink, subject_id, module_id)
    }
}

fn print_report(report: &SubjectReport) {
    println!("Subject {}", report.subject_id);
    for outcome in &report.outcomes {
        let scope = outcome
            .module_id()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "unclassified".to_string());
        match outcome {
            ScopeOutcome::Completed { result, .. } => {
                println!(
                    "  {}: {} clusters from {} questions ({} backend)",
                    scope,
                    result.clusters.len(),
                    result.questions_clustered(),
                    result.backend_used.as_str()
                );
                for warning in &result.warnings {
                    println!("    warning: {}", warning);
                }
            }
            ScopeOutcome::Failed { error, .. } => println!("  {}: FAILED - {}", scope, error),
        }
    }
    println!(
        "Total: {} clusters, {} questions, {} failed scopes",
        report.clusters_created(),
        report.questions_clustered(),
        report.failed_scopes()
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = load_config(&config_file)?;

    // Tracing.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting ExamLens v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| resolve_data_dir(&config.general.data_dir));
    let db_path = data_dir.join(&config.storage.db_file);
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    let questions = QuestionRepository::new(Arc::clone(&db));
    let clusters = ClusterRepository::new(Arc::clone(&db));

    match args.command {
        Command::Import { file } => import(&questions, &file)?,
        Command::Analyze {
            subject,
            module,
            keyword_only,
            parallel,
        } => {
            if keyword_only {
                config.clustering.backend = BackendPreference::Keyword;
            }
            let service = ClusteringService::new(config)?;
            let report = analyze(&service, &questions, &clusters, subject, module, parallel).await?;
            print_report(&report);
            if report.failed_scopes() > 0 {
                return Err(format!("{} scope(s) failed to cluster", report.failed_scopes()).into());
            }
        }
        Command::Clusters { subject, module } => {
            let stored = clusters.list(subject, module)?;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
    }

    Ok(())
}
