use crate::state::Snapshot;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Success,
    TransientFailure(String),
}

#[async_trait]
pub trait Reporter: Send + Sync {
    async fn send(&self, snapshot: &Snapshot, timeout: Duration) -> ReportOutcome;
}

pub struct HttpReporter {
    client: Client,
    endpoint: String,
}

impl HttpReporter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("reportd/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Reporter for HttpReporter {
    async fn send(&self, snapshot: &Snapshot, timeout: Duration) -> ReportOutcome {
        let req = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(snapshot);

        match req.send().await {
            Ok(resp) if resp.status().is_success() => ReportOutcome::Success,
            Ok(resp) => {
                let status = resp.status().as_u16();
                warn!(endpoint = %self.endpoint, status, "report rejected");
                ReportOutcome::TransientFailure(format!("статус ответа {status}"))
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "report send failed");
                ReportOutcome::TransientFailure(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    fn snapshot() -> Snapshot {
        Snapshot {
            machine_id: "reporter-host".to_string(),
            os_name: "Linux".to_string(),
            os_version: "6.1".to_string(),
            cpu_percent: 5.0,
            memory: BTreeMap::new(),
            disk: BTreeMap::new(),
            captured_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    async fn spawn_collector(status: StatusCode) -> SocketAddr {
        let app = Router::new().route(
            "/api/report",
            post(move |Json(_body): Json<serde_json::Value>| async move { status }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    #[tokio::test]
    async fn accepted_report_is_success() {
        let addr = spawn_collector(StatusCode::CREATED).await;
        let reporter = HttpReporter::new(format!("http://{addr}/api/report"));
        let outcome = reporter.send(&snapshot(), Duration::from_secs(5)).await;
        assert_eq!(outcome, ReportOutcome::Success);
    }

    #[tokio::test]
    async fn server_error_is_transient_failure() {
        let addr = spawn_collector(StatusCode::INTERNAL_SERVER_ERROR).await;
        let reporter = HttpReporter::new(format!("http://{addr}/api/report"));
        let outcome = reporter.send(&snapshot(), Duration::from_secs(5)).await;
        assert!(matches!(outcome, ReportOutcome::TransientFailure(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient_failure() {
        let reporter = HttpReporter::new("http://127.0.0.1:9/api/report");
        let outcome = reporter.send(&snapshot(), Duration::from_secs(2)).await;
        assert!(matches!(outcome, ReportOutcome::TransientFailure(_)));
    }
}
