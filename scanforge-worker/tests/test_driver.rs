mod common;

use std::sync::Arc;

use scanforge_core::StatusExtra;
use scanforge_core::domain::{JobStatus, ScanLevel, ScanPhase};
use scanforge_core::WorkflowError;
use scanforge_worker::{ScanError, ScanTarget};

use common::{ScriptedEngine, alert, dispatched_job, driver};

#[tokio::test(start_paused = true)]
async fn test_light_scan_runs_passive_analysis() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Light).await;
    let engine = Arc::new(
        ScriptedEngine {
            messages: 120,
            urls: 9,
            ..ScriptedEngine::default()
        }
        .with_crawl(&[40, 100])
        .with_passive(&[Ok(30), Ok(30), Ok(5), Ok(0)])
        .with_alerts(vec![alert("XSS", "High"), alert("Cookie flag", "low")]),
    );
    let driver = driver(engine.clone(), workflow.clone());

    let results = driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Light))
        .await
        .unwrap();

    assert_eq!(results.high, 1);
    assert_eq!(results.low, 1);
    assert_eq!(results.score, 88);

    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.results, Some(results));
    assert_eq!(job.alerts.len(), 2);
    assert_eq!(job.progress.phase, ScanPhase::Completed);
    assert!(job.progress.spider_progress.is_complete());
    assert!(job.progress.active_scan_progress.is_complete());
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());

    let stats = job.scan_stats.unwrap();
    assert_eq!(stats.requests_sent, 120);
    assert_eq!(stats.urls_crawled, 9);
    // Two crawl polls at 3s and four passive polls at 2s.
    assert_eq!(stats.duration_seconds, 14);

    let calls = engine.calls();
    assert!(calls.contains(&"policy threads=2 minutes=10".to_string()));
    assert!(calls.contains(&"context ScanContext https://target.example.*".to_string()));
    assert!(calls.contains(&"crawl https://target.example children=10".to_string()));
    assert!(calls.contains(&"findings https://target.example limit=1000".to_string()));
    assert!(!calls.iter().any(|c| c.starts_with("active")));
}

#[tokio::test(start_paused = true)]
async fn test_deep_scan_runs_active_scan_with_policy() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Deep).await;
    let engine = Arc::new(
        ScriptedEngine::default()
            .with_crawl(&[100])
            .with_active(&[10, 60, 100]),
    );
    let driver = driver(engine.clone(), workflow.clone());
    let target = ScanTarget {
        scope: Some("https://target.example/app/.*".into()),
        policy: Some("api-only".into()),
        ..ScanTarget::new(job_id, "https://target.example", ScanLevel::Deep)
    };

    let results = driver.run(&target).await.unwrap();
    assert_eq!(results.score, 100);

    let calls = engine.calls();
    assert!(calls.contains(&"policy threads=5 minutes=30".to_string()));
    assert!(calls.contains(&"context ScanContext https://target.example/app/.*".to_string()));
    assert!(calls.contains(&"crawl https://target.example children=50".to_string()));
    assert!(calls.contains(&"active https://target.example policy=api-only".to_string()));

    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.scan_stats.unwrap().duration_seconds, 3 + 15);
}

#[tokio::test(start_paused = true)]
async fn test_aggressive_scan_has_no_duration_ceiling() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Aggressive).await;
    let engine = Arc::new(ScriptedEngine::default());
    let driver = driver(engine.clone(), workflow);

    driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Aggressive))
        .await
        .unwrap();

    let calls = engine.calls();
    assert!(calls.contains(&"policy threads=10 minutes=0".to_string()));
    assert!(calls.contains(&"active https://target.example policy=-".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_engine_never_ready_fails_job() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Light).await;
    let engine = Arc::new(ScriptedEngine {
        never_ready: true,
        ..ScriptedEngine::default()
    });
    let driver = driver(engine.clone(), workflow.clone());
    let started = tokio::time::Instant::now();

    let err = driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Light))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::EngineUnavailable { attempts: 30 }));
    assert_eq!(engine.probes(), 30);
    assert_eq!(started.elapsed().as_secs(), 29 * 2);

    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some("Scan engine not ready after 30 attempts")
    );
    assert_eq!(job.progress.phase, ScanPhase::Failed);
    assert_eq!(job.progress.spider_progress.value(), 0);
    assert_eq!(
        job.progress.message,
        "Failed: Scan engine not ready after 30 attempts"
    );
    assert!(job.results.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_engine_ready_after_retries() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Light).await;
    let engine = Arc::new(ScriptedEngine {
        not_ready_for: 3,
        ..ScriptedEngine::default()
    });
    let driver = driver(engine.clone(), workflow.clone());

    driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Light))
        .await
        .unwrap();

    assert_eq!(engine.probes(), 4);
    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_policy_and_context_failures_are_not_fatal() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Deep).await;
    let engine = Arc::new(ScriptedEngine {
        fail_policy: true,
        fail_context: true,
        ..ScriptedEngine::default()
    });
    let driver = driver(engine, workflow.clone());

    driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Deep))
        .await
        .unwrap();

    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_passive_check_error_assumes_complete() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Light).await;
    let engine = Arc::new(
        ScriptedEngine::default().with_passive(&[Ok(50), Err(()), Ok(50)]),
    );
    let driver = driver(engine, workflow.clone());

    driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Light))
        .await
        .unwrap();

    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_crawl_error_is_fatal() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Light).await;
    let engine = Arc::new(ScriptedEngine {
        fail_crawl_status: true,
        ..ScriptedEngine::default()
    });
    let driver = driver(engine.clone(), workflow.clone());

    let err = driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Light))
        .await
        .unwrap_err();

    assert!(matches!(err, ScanError::Engine(_)));
    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some("Scan engine unreachable: connection refused")
    );
    assert!(!engine.calls().iter().any(|c| c.starts_with("findings")));
}

#[tokio::test(start_paused = true)]
async fn test_stats_failures_leave_zero_counters() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Light).await;
    let engine = Arc::new(ScriptedEngine {
        fail_stats: true,
        messages: 99,
        ..ScriptedEngine::default()
    });
    let driver = driver(engine, workflow.clone());

    driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Light))
        .await
        .unwrap();

    let stats = workflow
        .get_job(job_id)
        .await
        .unwrap()
        .unwrap()
        .scan_stats
        .unwrap();
    assert_eq!(stats.requests_sent, 0);
    assert_eq!(stats.urls_crawled, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_job_is_not_started() {
    let (workflow, job_id) = dispatched_job(ScanLevel::Light).await;
    workflow
        .update_status(job_id, JobStatus::Cancelled, StatusExtra::default())
        .await
        .unwrap();
    let engine = Arc::new(ScriptedEngine::default());
    let driver = driver(engine.clone(), workflow.clone());

    let err = driver
        .run(&ScanTarget::new(job_id, "https://target.example", ScanLevel::Light))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScanError::Workflow(WorkflowError::InvalidTransition(_))
    ));
    assert_eq!(engine.probes(), 0);
    let job = workflow.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
}
