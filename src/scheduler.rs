use crate::collectors::Collector;
use crate::metrics::Metrics;
use crate::reporter::{ReportOutcome, Reporter};
use crate::state::{has_changed, Snapshot};
use crate::status::{now_unix, AgentStatus, CycleOutcome};
use crate::store::StateStore;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

pub trait Jitter: Send {
    fn next_delay(&mut self, min: Duration, max: Duration) -> Duration;
}

// Задержка берётся равномерно из закрытого интервала [min, max];
// исход цикла на неё не влияет, backoff отсутствует.
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn next_delay(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let secs = rand::rng().random_range(min.as_secs()..=max.as_secs());
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub min_interval: Duration,
    pub max_interval: Duration,
    pub request_timeout: Duration,
}

pub struct ReportLoop<C, R, J> {
    settings: LoopSettings,
    collector: C,
    store: StateStore,
    reporter: R,
    jitter: J,
    metrics: Arc<Metrics>,
    status: Arc<RwLock<AgentStatus>>,
}

impl<C, R, J> ReportLoop<C, R, J>
where
    C: Collector,
    R: Reporter,
    J: Jitter,
{
    pub fn new(
        settings: LoopSettings,
        collector: C,
        store: StateStore,
        reporter: R,
        jitter: J,
        metrics: Arc<Metrics>,
        status: Arc<RwLock<AgentStatus>>,
    ) -> Self {
        Self {
            settings,
            collector,
            store,
            reporter,
            jitter,
            metrics,
            status,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            self.run_cycle().await;

            let delay = self
                .jitter
                .next_delay(self.settings.min_interval, self.settings.max_interval);
            info!(next_delay_secs = delay.as_secs(), "cycle finished, sleeping");

            tokio::select! {
                _ = shutdown.changed() => {
                    info!("получен сигнал остановки цикла отчётов");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let current = match self.collector.sample() {
            Ok(current) => current,
            Err(err) => {
                warn!(error = %err, "sample failed, skipping cycle");
                let outcome = CycleOutcome::CollectFailed(err.to_string());
                self.record(&outcome, None, None).await;
                return outcome;
            }
        };

        let previous = self.store.load();
        if !has_changed(previous.as_ref(), &current) {
            info!(machine_id = %current.machine_id, "no change detected, skipping report");
            let outcome = CycleOutcome::NoChange;
            self.record(&outcome, Some(&current), None).await;
            return outcome;
        }

        info!(machine_id = %current.machine_id, "change detected, sending report");
        let outcome = match self
            .reporter
            .send(&current, self.settings.request_timeout)
            .await
        {
            ReportOutcome::Success => match self.store.save(&current) {
                Ok(()) => CycleOutcome::Sent,
                Err(err) => {
                    // Базовое состояние осталось старым, поэтому следующий
                    // цикл снова увидит разницу и повторит отчёт.
                    warn!(error = %err, "state save failed after acknowledged report");
                    CycleOutcome::SentSaveFailed(err.to_string())
                }
            },
            ReportOutcome::TransientFailure(reason) => {
                warn!(reason = %reason, "report not delivered, change stays pending");
                CycleOutcome::SendFailed(reason)
            }
        };

        let reported = match &outcome {
            CycleOutcome::Sent | CycleOutcome::SentSaveFailed(_) => Some(&current),
            _ => None,
        };
        self.record(&outcome, Some(&current), reported).await;
        outcome
    }

    async fn record(
        &self,
        outcome: &CycleOutcome,
        sampled: Option<&Snapshot>,
        reported: Option<&Snapshot>,
    ) {
        self.metrics.observe_cycle(outcome, sampled);
        let mut status = self.status.write().await;
        status.record_cycle(now_unix(), outcome, reported.cloned());
    }
}
