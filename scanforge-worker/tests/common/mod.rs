#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use scanforge_core::JobWorkflow;
use scanforge_core::config::{EngineConfig, WorkerConfig};
use scanforge_core::domain::{
    JobConfig, JobId, JobSource, NewJob, Percent, ScanAlert, ScanLevel,
};
use scanforge_core::infrastructure::{InMemoryJobStore, JobStore};
use scanforge_worker::ScanDriver;
use scanforge_worker::domain::{EngineError, ScanEngine, ScanPolicy};

fn unreachable() -> EngineError {
    EngineError::Network("connection refused".into())
}

/// Engine double that replays scripted readings and records every call.
#[derive(Default)]
pub struct ScriptedEngine {
    pub not_ready_for: u32,
    pub never_ready: bool,
    pub fail_policy: bool,
    pub fail_context: bool,
    pub fail_crawl_status: bool,
    pub crawl: Mutex<VecDeque<i64>>,
    pub passive: Mutex<VecDeque<Result<u64, ()>>>,
    pub active: Mutex<VecDeque<i64>>,
    pub alerts: Vec<ScanAlert>,
    pub fail_stats: bool,
    pub messages: u64,
    pub urls: u64,
    pub probes: Mutex<u32>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn with_crawl(mut self, readings: &[i64]) -> Self {
        self.crawl = Mutex::new(readings.iter().copied().collect());
        self
    }

    pub fn with_passive(mut self, readings: &[Result<u64, ()>]) -> Self {
        self.passive = Mutex::new(readings.iter().copied().collect());
        self
    }

    pub fn with_active(mut self, readings: &[i64]) -> Self {
        self.active = Mutex::new(readings.iter().copied().collect());
        self
    }

    pub fn with_alerts(mut self, alerts: Vec<ScanAlert>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn probes(&self) -> u32 {
        *self.probes.lock().unwrap()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ScanEngine for ScriptedEngine {
    async fn version(&self) -> Result<String, EngineError> {
        let mut probes = self.probes.lock().unwrap();
        *probes += 1;
        if self.never_ready || *probes <= self.not_ready_for {
            return Err(unreachable());
        }
        Ok("2.15.0".to_string())
    }

    async fn apply_policy(&self, policy: &ScanPolicy) -> Result<(), EngineError> {
        self.record(format!(
            "policy threads={} minutes={}",
            policy.threads_per_host, policy.max_duration_minutes
        ));
        if self.fail_policy {
            return Err(EngineError::Status {
                status: 400,
                body: "bad_action".into(),
            });
        }
        Ok(())
    }

    async fn create_context(&self, name: &str, include_regex: &str) -> Result<(), EngineError> {
        self.record(format!("context {} {}", name, include_regex));
        if self.fail_context {
            return Err(unreachable());
        }
        Ok(())
    }

    async fn start_crawl(&self, url: &str, max_children: u32) -> Result<String, EngineError> {
        self.record(format!("crawl {} children={}", url, max_children));
        Ok("1".to_string())
    }

    async fn crawl_status(&self, _crawl_id: &str) -> Result<Percent, EngineError> {
        if self.fail_crawl_status {
            return Err(unreachable());
        }
        let next = self.crawl.lock().unwrap().pop_front().unwrap_or(100);
        Ok(Percent::new(next))
    }

    async fn passive_queue_depth(&self) -> Result<u64, EngineError> {
        match self.passive.lock().unwrap().pop_front() {
            Some(Ok(remaining)) => Ok(remaining),
            Some(Err(())) => Err(unreachable()),
            None => Ok(0),
        }
    }

    async fn start_active_scan(
        &self,
        url: &str,
        policy_name: Option<&str>,
    ) -> Result<String, EngineError> {
        self.record(format!("active {} policy={}", url, policy_name.unwrap_or("-")));
        Ok("7".to_string())
    }

    async fn active_status(&self, _scan_id: &str) -> Result<Percent, EngineError> {
        let next = self.active.lock().unwrap().pop_front().unwrap_or(100);
        Ok(Percent::new(next))
    }

    async fn list_findings(
        &self,
        base_url: &str,
        limit: usize,
    ) -> Result<Vec<ScanAlert>, EngineError> {
        self.record(format!("findings {} limit={}", base_url, limit));
        Ok(self.alerts.clone())
    }

    async fn message_count(&self) -> Result<u64, EngineError> {
        if self.fail_stats {
            return Err(unreachable());
        }
        Ok(self.messages)
    }

    async fn url_count(&self) -> Result<u64, EngineError> {
        if self.fail_stats {
            return Err(unreachable());
        }
        Ok(self.urls)
    }
}

pub fn alert(name: &str, severity: &str) -> ScanAlert {
    ScanAlert {
        name: name.into(),
        severity: severity.into(),
        url: "https://target.example/".into(),
        description: String::new(),
        solution: String::new(),
        cweid: "79".into(),
        wascid: "8".into(),
        confidence: "Medium".into(),
        reference: String::new(),
    }
}

/// Workflow over an in-memory store holding one dispatched job.
pub async fn dispatched_job(level: ScanLevel) -> (JobWorkflow, JobId) {
    let store = Arc::new(InMemoryJobStore::new());
    let workflow = JobWorkflow::new(store as Arc<dyn JobStore>);
    let job = workflow
        .create_job(NewJob::new(
            JobSource::Mcp,
            JobConfig::new("https://target.example", level),
            "scanforge/zap-worker:test",
        ))
        .await
        .unwrap();
    workflow.mark_dispatched(job.job_id, "ctr1").await.unwrap();
    (workflow, job.job_id)
}

pub fn driver(engine: Arc<ScriptedEngine>, workflow: JobWorkflow) -> ScanDriver {
    ScanDriver::new(
        engine as Arc<dyn ScanEngine>,
        workflow,
        WorkerConfig::default(),
        &EngineConfig::default(),
    )
}
