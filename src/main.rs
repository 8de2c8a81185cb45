//! scanforge - operator command line
//!
//! Starts, inspects and cancels scans against the configured job store and
//! container runtime. Every command prints one JSON document on stdout.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::signal;

use scanforge::scanforge_core::domain::{JobId, JobSource};
use scanforge::scanforge_orchestrator::application::ScanRequest;
use scanforge::{AppHandle, Config, create_app, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "scanforge")]
#[command(about = "On-demand web application scan orchestration", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch a scan worker for a target
    Scan(ScanArgs),
    /// Show a job's status and progress
    Status { job_id: JobId },
    /// Cancel a job and stop its worker
    Cancel { job_id: JobId },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// URL to scan
    target_url: String,

    /// light, deep or aggressive
    #[arg(long, default_value = "light")]
    level: String,

    /// Context include pattern
    #[arg(long)]
    scope: Option<String>,

    /// Named active scan policy
    #[arg(long)]
    policy: Option<String>,

    /// Tenant owning the linked scan record
    #[arg(long, requires = "scan_record_id")]
    tenant_id: Option<String>,

    /// Linked external scan record
    #[arg(long, requires = "tenant_id")]
    scan_record_id: Option<String>,

    /// Project holding the scan record
    #[arg(long)]
    project: Option<String>,

    /// Database holding the scan record
    #[arg(long)]
    database: Option<String>,

    /// Wait for the scan to finish and print the report
    #[arg(long)]
    wait: bool,
}

impl From<ScanArgs> for ScanRequest {
    fn from(args: ScanArgs) -> Self {
        let source = if args.scan_record_id.is_some() {
            JobSource::AppScanner
        } else {
            JobSource::Mcp
        };
        Self {
            scope: args.scope,
            policy: args.policy,
            source,
            tenant_id: args.tenant_id,
            scan_record_id: args.scan_record_id,
            source_project: args.project,
            source_database: args.database,
            ..ScanRequest::new(args.target_url, args.level)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the success or failure document and map it to an exit code.
fn report<T: Serialize, E: Serialize>(outcome: Result<T, E>) -> anyhow::Result<ExitCode> {
    match outcome {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            print_json(&failure)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    let app = create_app(config)
        .await
        .context("Failed to create application")?;

    run(cli.command, app).await
}

async fn run(command: Command, app: AppHandle) -> anyhow::Result<ExitCode> {
    match command {
        Command::Scan(args) if args.wait => {
            let request = ScanRequest::from(args);
            tokio::select! {
                outcome = app.scan_web_application.execute(request) => report(outcome),
                _ = signal::ctrl_c() => {
                    // The worker keeps running; the job can still be inspected or cancelled.
                    tracing::warn!("Interrupted while waiting for scan");
                    Ok(ExitCode::from(130))
                }
            }
        }
        Command::Scan(args) => report(app.start_scan.execute(ScanRequest::from(args)).await),
        Command::Status { job_id } => {
            let view = app
                .scan_status
                .execute(job_id)
                .await
                .with_context(|| format!("Failed to read job {}", job_id))?;
            print_json(&view)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Cancel { job_id } => {
            let outcome = app
                .cancel_scan
                .execute(job_id)
                .await
                .with_context(|| format!("Failed to cancel job {}", job_id))?;
            print_json(&outcome)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_linked_scan_becomes_app_scanner_request() {
        let cli = Cli::try_parse_from([
            "scanforge",
            "scan",
            "https://app.example",
            "--level",
            "deep",
            "--tenant-id",
            "t1",
            "--scan-record-id",
            "r1",
        ])
        .unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan command");
        };

        let request = ScanRequest::from(args);
        assert_eq!(request.source, JobSource::AppScanner);
        assert_eq!(request.scan_level, "deep");
        assert_eq!(request.tenant_id.as_deref(), Some("t1"));
    }

    #[test]
    fn test_half_linked_scan_is_rejected() {
        let result = Cli::try_parse_from([
            "scanforge",
            "scan",
            "https://app.example",
            "--tenant-id",
            "t1",
        ]);
        assert!(result.is_err());
    }
}
