//! OWASP ZAP JSON API client
//!
//! Every call is `GET {base}/JSON/{component}/{view|action}/{name}` with the
//! API key as the `apikey` query parameter. ZAP encodes numbers as strings.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use scanforge_core::config::EngineConfig;
use scanforge_core::domain::{Percent, ScanAlert};

use crate::domain::{EngineError, ScanEngine, ScanPolicy};

const CONTEXT_COMPONENT: &str = "context";

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

pub struct ZapClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ZapClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: build_client(config.timeout()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self, component: &str, kind: &str, name: &str) -> String {
        format!("{}/JSON/{}/{}/{}", self.base_url, component, kind, name)
    }

    async fn call(
        &self,
        component: &str,
        kind: &str,
        name: &str,
        params: &[(&str, String)],
    ) -> Result<Value, EngineError> {
        let url = self.endpoint(component, kind, name);
        debug!(url = %url, "ZAP API call");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }
        let response = request.query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "ZAP API error: {}", body);
            return Err(EngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn view(
        &self,
        component: &str,
        name: &str,
        params: &[(&str, String)],
    ) -> Result<Value, EngineError> {
        self.call(component, "view", name, params).await
    }

    async fn action(
        &self,
        component: &str,
        name: &str,
        params: &[(&str, String)],
    ) -> Result<Value, EngineError> {
        self.call(component, "action", name, params).await
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        error!(error = %e, "Failed to build HTTP client with custom timeout, using default client");
        Client::new()
    })
}

fn string_field(body: &Value, key: &str) -> Result<String, EngineError> {
    match body.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(EngineError::InvalidResponse(format!("missing field `{}`", key))),
    }
}

fn number_field(body: &Value, key: &str) -> Result<i64, EngineError> {
    let raw = string_field(body, key)?;
    raw.trim().parse().map_err(|_| {
        EngineError::InvalidResponse(format!("`{}` is not a number: {}", key, raw))
    })
}

fn count_field(body: &Value, key: &str) -> Result<u64, EngineError> {
    let n = number_field(body, key)?;
    u64::try_from(n)
        .map_err(|_| EngineError::InvalidResponse(format!("`{}` is negative: {}", key, n)))
}

/// Alert as ZAP reports it
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ZapAlert {
    alert: String,
    name: String,
    risk: String,
    confidence: String,
    url: String,
    description: String,
    solution: String,
    reference: String,
    cweid: String,
    wascid: String,
}

impl Default for ZapAlert {
    fn default() -> Self {
        Self {
            alert: String::new(),
            name: String::new(),
            risk: "Informational".to_string(),
            confidence: String::new(),
            url: String::new(),
            description: String::new(),
            solution: String::new(),
            reference: String::new(),
            cweid: String::new(),
            wascid: String::new(),
        }
    }
}

impl From<ZapAlert> for ScanAlert {
    fn from(a: ZapAlert) -> Self {
        Self {
            name: if a.alert.is_empty() { a.name } else { a.alert },
            severity: a.risk,
            url: a.url,
            description: a.description,
            solution: a.solution,
            cweid: a.cweid,
            wascid: a.wascid,
            confidence: a.confidence,
            reference: a.reference,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlertsResponse {
    #[serde(default)]
    alerts: Vec<ZapAlert>,
}

#[async_trait]
impl ScanEngine for ZapClient {
    async fn version(&self) -> Result<String, EngineError> {
        let body = self.view("core", "version", &[]).await?;
        string_field(&body, "version")
    }

    /// Each option is sent even when the other is rejected; the first
    /// failure is returned once both have been tried.
    async fn apply_policy(&self, policy: &ScanPolicy) -> Result<(), EngineError> {
        let options = [
            ("setOptionThreadPerHost", policy.threads_per_host),
            ("setOptionMaxScanDurationInMins", policy.max_duration_minutes),
        ];

        let mut first_failure = None;
        for (option, value) in options {
            if let Err(e) = self
                .action("ascan", option, &[("Integer", value.to_string())])
                .await
            {
                warn!(option, value, error = %e, "Failed to set scan option");
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn create_context(&self, name: &str, include_regex: &str) -> Result<(), EngineError> {
        self.action(
            CONTEXT_COMPONENT,
            "newContext",
            &[("contextName", name.to_string())],
        )
        .await?;
        self.action(
            CONTEXT_COMPONENT,
            "includeInContext",
            &[
                ("contextName", name.to_string()),
                ("regex", include_regex.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn start_crawl(&self, url: &str, max_children: u32) -> Result<String, EngineError> {
        let body = self
            .action(
                "spider",
                "scan",
                &[
                    ("url", url.to_string()),
                    ("maxChildren", max_children.to_string()),
                    ("recurse", "true".to_string()),
                    ("subtreeOnly", "true".to_string()),
                ],
            )
            .await?;
        string_field(&body, "scan")
    }

    async fn crawl_status(&self, crawl_id: &str) -> Result<Percent, EngineError> {
        let body = self
            .view("spider", "status", &[("scanId", crawl_id.to_string())])
            .await?;
        Ok(Percent::new(number_field(&body, "status")?))
    }

    async fn passive_queue_depth(&self) -> Result<u64, EngineError> {
        let body = self.view("pscan", "recordsToScan", &[]).await?;
        count_field(&body, "recordsToScan")
    }

    async fn start_active_scan(
        &self,
        url: &str,
        policy_name: Option<&str>,
    ) -> Result<String, EngineError> {
        let mut params = vec![
            ("url", url.to_string()),
            ("recurse", "true".to_string()),
            ("inScopeOnly", "false".to_string()),
        ];
        if let Some(policy) = policy_name {
            params.push(("scanPolicyName", policy.to_string()));
        }
        let body = self.action("ascan", "scan", &params).await?;
        string_field(&body, "scan")
    }

    async fn active_status(&self, scan_id: &str) -> Result<Percent, EngineError> {
        let body = self
            .view("ascan", "status", &[("scanId", scan_id.to_string())])
            .await?;
        Ok(Percent::new(number_field(&body, "status")?))
    }

    async fn list_findings(
        &self,
        base_url: &str,
        limit: usize,
    ) -> Result<Vec<ScanAlert>, EngineError> {
        let body = self
            .view(
                "core",
                "alerts",
                &[
                    ("baseurl", base_url.to_string()),
                    ("start", "0".to_string()),
                    ("count", limit.to_string()),
                ],
            )
            .await?;
        let parsed: AlertsResponse = serde_json::from_value(body)
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;
        Ok(parsed.alerts.into_iter().map(ScanAlert::from).collect())
    }

    async fn message_count(&self) -> Result<u64, EngineError> {
        let body = self.view("core", "numberOfMessages", &[]).await?;
        count_field(&body, "numberOfMessages")
    }

    async fn url_count(&self) -> Result<u64, EngineError> {
        let body = self.view("core", "urls", &[]).await?;
        body.get("urls")
            .and_then(Value::as_array)
            .map(|urls| urls.len() as u64)
            .ok_or_else(|| EngineError::InvalidResponse("missing field `urls`".to_string()))
    }
}
