//! scanforge worker - one scan job per process
//!
//! Launched by the dispatcher inside an isolated container next to the scan
//! engine. The job coordinates arrive as environment variables; store and
//! engine settings come from the layered configuration.
//!
//! Exit code 0 means the job was written COMPLETED, 1 means it failed or
//! could not start.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use scanforge_core::config::Config;
use scanforge_core::domain::{JobId, ScanLevel};
use scanforge_core::infrastructure::{JobStore, RedisJobStore};
use scanforge_core::{JobWorkflow, init_tracing};
use scanforge_worker::infrastructure::ZapClient;
use scanforge_worker::{ScanDriver, ScanTarget};

/// Worker arguments, normally supplied through the environment
#[derive(Parser, Debug)]
#[command(name = "scanforge-worker")]
#[command(about = "Runs one web application scan and records the result")]
struct Args {
    /// Job to execute
    #[arg(long, env = "JOB_ID")]
    job_id: JobId,

    /// URL to scan
    #[arg(long, env = "TARGET_URL")]
    target_url: String,

    /// light, deep or aggressive
    #[arg(long, env = "SCAN_LEVEL", default_value = "light")]
    scan_level: ScanLevel,

    /// Context include pattern
    #[arg(long, env = "SCAN_SCOPE")]
    scope: Option<String>,

    /// Named active scan policy
    #[arg(long, env = "SCAN_POLICY")]
    policy: Option<String>,
}

/// A missing `.env` is normal; anything else is worth a warning.
fn dotenv_warning(loaded: Result<PathBuf, dotenvy::Error>) -> Option<String> {
    match loaded {
        Err(e) if !e.not_found() => Some(format!("Warning: Failed to load .env file: {}", e)),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Some(warning) = dotenv_warning(dotenvy::dotenv()) {
        eprintln!("{}", warning);
    }
    let args = Args::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        job_id = %args.job_id,
        target = %args.target_url,
        level = %args.scan_level,
        "scanforge worker starting"
    );

    let store = match RedisJobStore::from_config(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!(job_id = %args.job_id, error = %e, "Could not reach job store");
            return ExitCode::FAILURE;
        }
    };
    let workflow = JobWorkflow::new(Arc::new(store) as Arc<dyn JobStore>);

    let engine = Arc::new(ZapClient::new(&config.engine));
    let driver = ScanDriver::new(engine, workflow, config.worker.clone(), &config.engine);

    let target = ScanTarget {
        scope: args.scope,
        policy: args.policy,
        ..ScanTarget::new(args.job_id, args.target_url, args.scan_level)
    };

    match driver.run(&target).await {
        Ok(results) => {
            info!(job_id = %target.job_id, score = results.score, "Worker finished");
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
