#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use scanforge_core::JobWorkflow;
use scanforge_core::config::{BridgeConfig, DispatcherConfig, PollingConfig};
use scanforge_core::infrastructure::{InMemoryJobStore, JobStore};
use scanforge_orchestrator::application::{Bridge, Dispatcher};
use scanforge_orchestrator::domain::{
    ContainerHandle, ContainerState, RunSpec, ScanRecordLocation, ScanRecordPatch, StopOutcome,
};
use scanforge_orchestrator::infrastructure::{
    ContainerRuntime, RuntimeError, ScanRecordStore, SyncError,
};

// ── Fake container runtime ───────────────────────────────────────────────────

#[derive(Default)]
struct RuntimeState {
    running: Vec<(ContainerHandle, RunSpec)>,
    /// Workers started by someone else, counted by admission
    foreign: usize,
    /// Foreign workers that appear while our `run` is in flight
    foreign_during_run: usize,
    runs: Vec<RunSpec>,
    stops: Vec<ContainerHandle>,
    fail_run: bool,
    next_id: u32,
}

#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_foreign_workers(count: usize) -> Arc<Self> {
        let runtime = Self::default();
        runtime.state.lock().unwrap().foreign = count;
        Arc::new(runtime)
    }

    pub fn failing() -> Arc<Self> {
        let runtime = Self::default();
        runtime.state.lock().unwrap().fail_run = true;
        Arc::new(runtime)
    }

    pub fn race_on_next_run(&self, count: usize) {
        self.state.lock().unwrap().foreign_during_run = count;
    }

    pub fn runs(&self) -> Vec<RunSpec> {
        self.state.lock().unwrap().runs.clone()
    }

    pub fn stops(&self) -> Vec<ContainerHandle> {
        self.state.lock().unwrap().stops.clone()
    }

    pub fn running_count(&self) -> usize {
        self.state.lock().unwrap().running.len()
    }

    /// Simulate a worker exiting on its own.
    pub fn exit(&self, handle: &ContainerHandle) {
        self.state
            .lock()
            .unwrap()
            .running
            .retain(|(h, _)| h != handle);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.runs.push(spec.clone());
        if state.fail_run {
            return Err(RuntimeError::ImageNotFound(spec.image.clone()));
        }
        state.next_id += 1;
        let handle = ContainerHandle::new(format!("ctr{:09}", state.next_id));
        state.running.push((handle.clone(), spec.clone()));
        state.foreign += std::mem::take(&mut state.foreign_during_run);
        Ok(handle)
    }

    async fn count_running(&self, label: &str) -> Result<usize, RuntimeError> {
        let state = self.state.lock().unwrap();
        let ours = state
            .running
            .iter()
            .filter(|(_, spec)| {
                spec.labels
                    .iter()
                    .any(|(k, v)| format!("{}={}", k, v) == label)
            })
            .count();
        Ok(ours + state.foreign)
    }

    async fn stop(
        &self,
        handle: &ContainerHandle,
        _grace: Duration,
    ) -> Result<StopOutcome, RuntimeError> {
        let mut state = self.state.lock().unwrap();
        state.stops.push(handle.clone());
        let before = state.running.len();
        state.running.retain(|(h, _)| h != handle);
        if state.running.len() < before {
            Ok(StopOutcome::Stopped)
        } else {
            Ok(StopOutcome::NotFound)
        }
    }

    async fn inspect(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Option<ContainerState>, RuntimeError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .running
            .iter()
            .any(|(h, _)| h == handle)
            .then_some(ContainerState::Running))
    }
}

// ── Recording scan record store ──────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum RecordBehaviour {
    Accept,
    Fail,
    Hang,
}

pub struct RecordingStore {
    updates: Mutex<Vec<(ScanRecordLocation, ScanRecordPatch)>>,
    behaviour: RecordBehaviour,
}

impl RecordingStore {
    pub fn new(behaviour: RecordBehaviour) -> Arc<Self> {
        Arc::new(Self {
            updates: Mutex::new(Vec::new()),
            behaviour,
        })
    }

    pub fn updates(&self) -> Vec<(ScanRecordLocation, ScanRecordPatch)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanRecordStore for RecordingStore {
    async fn update(
        &self,
        location: &ScanRecordLocation,
        patch: &ScanRecordPatch,
    ) -> Result<(), SyncError> {
        match self.behaviour {
            RecordBehaviour::Accept => {
                self.updates
                    .lock()
                    .unwrap()
                    .push((location.clone(), patch.clone()));
                Ok(())
            }
            RecordBehaviour::Fail => Err(SyncError::Backend("permission denied".into())),
            RecordBehaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

// ── Wiring helpers ───────────────────────────────────────────────────────────

pub fn workflow() -> (Arc<InMemoryJobStore>, JobWorkflow) {
    let store = Arc::new(InMemoryJobStore::new());
    let workflow = JobWorkflow::new(store.clone() as Arc<dyn JobStore>);
    (store, workflow)
}

pub fn dispatcher(runtime: Arc<FakeRuntime>, config: DispatcherConfig) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(runtime as Arc<dyn ContainerRuntime>, config))
}

pub fn bridge(store: Arc<RecordingStore>) -> Arc<Bridge> {
    Arc::new(Bridge::new(
        store as Arc<dyn ScanRecordStore>,
        BridgeConfig::default(),
    ))
}

pub fn fast_polling(max_duration_seconds: u64) -> PollingConfig {
    PollingConfig {
        interval_seconds: 5,
        max_duration_seconds,
        progress_log_interval_seconds: 30,
    }
}
