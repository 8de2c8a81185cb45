//! Application setup and wiring

use std::sync::Arc;

use scanforge_core::infrastructure::{JobStore, JobStoreError, RedisJobStore};
use scanforge_core::{Config, JobWorkflow};
use scanforge_orchestrator::application::{
    Bridge, CancelScanUseCase, Dispatcher, PollingOrchestrator, ScanStatusUseCase,
    ScanWebApplicationUseCase, StartScanUseCase,
};
use scanforge_orchestrator::infrastructure::{
    ContainerRuntime, DockerCliRuntime, RedisScanRecordStore, ScanRecordStore,
};

/// Wiring failures that prevent the process from serving requests
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Job store unavailable: {0}")]
    JobStore(#[from] JobStoreError),
}

/// Caller-facing use cases sharing one job store, runtime and bridge
pub struct AppHandle {
    pub start_scan: StartScanUseCase,
    pub scan_status: ScanStatusUseCase,
    pub cancel_scan: CancelScanUseCase,
    pub scan_web_application: ScanWebApplicationUseCase,
}

/// Connect the bridge's record store. A missing bridge only disables record
/// sync, so connection failures are logged and tolerated.
async fn connect_bridge(config: &Config) -> Option<Arc<Bridge>> {
    if !config.bridge.enabled {
        tracing::info!("Scan record bridge disabled");
        return None;
    }

    let url = config
        .bridge
        .url
        .clone()
        .unwrap_or_else(|| config.store.url.clone());

    match RedisScanRecordStore::connect(&url).await {
        Ok(store) => Some(Arc::new(Bridge::new(
            Arc::new(store) as Arc<dyn ScanRecordStore>,
            config.bridge.clone(),
        ))),
        Err(e) => {
            tracing::warn!("Scan record bridge unavailable, continuing without it: {}", e);
            None
        }
    }
}

pub async fn create_app(config: Config) -> Result<AppHandle, AppError> {
    let job_store = RedisJobStore::from_config(&config.store).await?;
    let workflow = JobWorkflow::new(Arc::new(job_store) as Arc<dyn JobStore>);
    tracing::info!(prefix = %config.store.key_prefix, "Job store connected");

    let runtime: Arc<dyn ContainerRuntime> =
        Arc::new(DockerCliRuntime::new(config.dispatcher.runtime_binary.clone()));
    let dispatcher = Arc::new(Dispatcher::new(runtime, config.dispatcher.clone()));
    tracing::info!(
        runtime = %config.dispatcher.runtime_binary,
        image = %config.dispatcher.worker_image,
        max_concurrent = config.dispatcher.max_concurrent_scans,
        "Dispatcher ready"
    );

    let bridge = connect_bridge(&config).await;

    let start_scan = || {
        StartScanUseCase::new(
            workflow.clone(),
            dispatcher.clone(),
            bridge.clone(),
            config.dispatcher.clone(),
            config.store.clone(),
        )
    };

    let scan_web_application = ScanWebApplicationUseCase::new(
        start_scan(),
        PollingOrchestrator::new(workflow.clone(), bridge.clone(), config.polling.clone()),
    );

    Ok(AppHandle {
        start_scan: start_scan(),
        scan_status: ScanStatusUseCase::new(workflow.clone(), bridge.clone()),
        cancel_scan: CancelScanUseCase::new(workflow.clone(), dispatcher.clone(), bridge.clone()),
        scan_web_application,
    })
}
