use crate::state::Snapshot;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent,
    NoChange,
    CollectFailed(String),
    SendFailed(String),
    SentSaveFailed(String),
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Sent => "sent",
            CycleOutcome::NoChange => "no_change",
            CycleOutcome::CollectFailed(_) => "collect_failed",
            CycleOutcome::SendFailed(_) => "send_failed",
            CycleOutcome::SentSaveFailed(_) => "sent_save_failed",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CycleOutcome::Sent | CycleOutcome::NoChange => None,
            CycleOutcome::CollectFailed(err)
            | CycleOutcome::SendFailed(err)
            | CycleOutcome::SentSaveFailed(err) => Some(err.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AgentStatus {
    pub started_at_unix: i64,
    pub last_cycle_unix: i64,
    pub cycles_total: u64,
    pub reports_sent_total: u64,
    pub report_failures_total: u64,
    pub collect_errors_total: u64,
    pub store_errors_total: u64,
    pub last_outcome: Option<String>,
    pub last_error: Option<String>,
    pub last_reported: Option<Snapshot>,
}

impl AgentStatus {
    pub fn new(now_unix: i64) -> Self {
        Self {
            started_at_unix: now_unix,
            ..Self::default()
        }
    }

    pub fn record_cycle(
        &mut self,
        now_unix: i64,
        outcome: &CycleOutcome,
        reported: Option<Snapshot>,
    ) {
        self.last_cycle_unix = now_unix;
        self.cycles_total += 1;
        self.last_outcome = Some(outcome.label().to_string());
        self.last_error = outcome.error().map(|e| e.to_string());

        match outcome {
            CycleOutcome::Sent => {
                self.reports_sent_total += 1;
            }
            CycleOutcome::NoChange => {}
            CycleOutcome::CollectFailed(_) => {
                self.collect_errors_total += 1;
            }
            CycleOutcome::SendFailed(_) => {
                self.report_failures_total += 1;
            }
            CycleOutcome::SentSaveFailed(_) => {
                self.reports_sent_total += 1;
                self.store_errors_total += 1;
            }
        }

        if let Some(snapshot) = reported {
            self.last_reported = Some(snapshot);
        }
    }
}

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sent_cycle_updates_counters_and_last_reported() {
        let mut status = AgentStatus::new(100);
        let snapshot = Snapshot {
            machine_id: "h".to_string(),
            os_name: "Linux".to_string(),
            os_version: "6.1".to_string(),
            cpu_percent: 1.0,
            memory: Default::default(),
            disk: Default::default(),
            captured_at: "2025-01-01T00:00:00Z".to_string(),
        };
        status.record_cycle(200, &CycleOutcome::Sent, Some(snapshot.clone()));

        assert_eq!(status.cycles_total, 1);
        assert_eq!(status.reports_sent_total, 1);
        assert_eq!(status.last_cycle_unix, 200);
        assert_eq!(status.last_outcome.as_deref(), Some("sent"));
        assert_eq!(status.last_error, None);
        assert_eq!(status.last_reported, Some(snapshot));
    }

    #[test]
    fn failed_send_keeps_previous_report() {
        let mut status = AgentStatus::new(100);
        let snapshot = Snapshot {
            machine_id: "h".to_string(),
            os_name: "Linux".to_string(),
            os_version: "6.1".to_string(),
            cpu_percent: 1.0,
            memory: Default::default(),
            disk: Default::default(),
            captured_at: "2025-01-01T00:00:00Z".to_string(),
        };
        status.record_cycle(200, &CycleOutcome::Sent, Some(snapshot.clone()));
        status.record_cycle(
            300,
            &CycleOutcome::SendFailed("соединение разорвано".to_string()),
            None,
        );

        assert_eq!(status.cycles_total, 2);
        assert_eq!(status.report_failures_total, 1);
        assert_eq!(status.last_outcome.as_deref(), Some("send_failed"));
        assert!(status.last_error.is_some());
        assert_eq!(status.last_reported, Some(snapshot));
    }

    #[test]
    fn save_failure_counts_both_sent_and_store_error() {
        let mut status = AgentStatus::new(100);
        status.record_cycle(
            200,
            &CycleOutcome::SentSaveFailed("диск переполнен".to_string()),
            None,
        );
        assert_eq!(status.reports_sent_total, 1);
        assert_eq!(status.store_errors_total, 1);
    }
}
