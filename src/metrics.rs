use crate::state::Snapshot;
use crate::status::CycleOutcome;
use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    started_at_unix: i64,
    pub agent_cycles_total: CounterVec,
    pub agent_reports_sent_total: Counter,
    pub agent_report_failures_total: Counter,
    pub agent_collect_errors_total: Counter,
    pub agent_store_errors_total: Counter,
    pub agent_cpu_usage_percent: Gauge,
    pub agent_memory_usage_percent: Gauge,
    pub agent_disk_usage_percent: Gauge,
    pub agent_last_cycle_timestamp_seconds: Gauge,
    pub agent_last_report_timestamp_seconds: Gauge,
    pub agent_uptime_seconds: Gauge,
    pub agent_scrape_count_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let agent_cycles_total = CounterVec::new(
            opts!(
                "agent_cycles_total",
                "Completed report cycles by outcome"
            ),
            &["outcome"],
        )?;
        let agent_reports_sent_total = Counter::with_opts(opts!(
            "agent_reports_sent_total",
            "Snapshots acknowledged by the collector endpoint"
        ))?;
        let agent_report_failures_total = Counter::with_opts(opts!(
            "agent_report_failures_total",
            "Report attempts that ended in a transient failure"
        ))?;
        let agent_collect_errors_total = Counter::with_opts(opts!(
            "agent_collect_errors_total",
            "Cycles skipped because sampling host metrics failed"
        ))?;
        let agent_store_errors_total = Counter::with_opts(opts!(
            "agent_store_errors_total",
            "Failed writes of the persisted snapshot state"
        ))?;
        let agent_cpu_usage_percent = Gauge::with_opts(opts!(
            "agent_cpu_usage_percent",
            "Average CPU usage across cores in percent (0..100)"
        ))?;
        let agent_memory_usage_percent = Gauge::with_opts(opts!(
            "agent_memory_usage_percent",
            "Memory usage in percent from the last sample"
        ))?;
        let agent_disk_usage_percent = Gauge::with_opts(opts!(
            "agent_disk_usage_percent",
            "Root filesystem usage in percent from the last sample"
        ))?;
        let agent_last_cycle_timestamp_seconds = Gauge::with_opts(opts!(
            "agent_last_cycle_timestamp_seconds",
            "Unix timestamp of the last completed cycle"
        ))?;
        let agent_last_report_timestamp_seconds = Gauge::with_opts(opts!(
            "agent_last_report_timestamp_seconds",
            "Unix timestamp of the last acknowledged report"
        ))?;
        let agent_uptime_seconds = Gauge::with_opts(opts!(
            "agent_uptime_seconds",
            "Agent uptime in seconds"
        ))?;
        let agent_scrape_count_total = Counter::with_opts(opts!(
            "agent_scrape_count_total",
            "Number of /metrics scrapes"
        ))?;

        register(&registry, &agent_cycles_total)?;
        register(&registry, &agent_reports_sent_total)?;
        register(&registry, &agent_report_failures_total)?;
        register(&registry, &agent_collect_errors_total)?;
        register(&registry, &agent_store_errors_total)?;
        register(&registry, &agent_cpu_usage_percent)?;
        register(&registry, &agent_memory_usage_percent)?;
        register(&registry, &agent_disk_usage_percent)?;
        register(&registry, &agent_last_cycle_timestamp_seconds)?;
        register(&registry, &agent_last_report_timestamp_seconds)?;
        register(&registry, &agent_uptime_seconds)?;
        register(&registry, &agent_scrape_count_total)?;

        Ok(Arc::new(Self {
            registry,
            started_at_unix: now_unix(),
            agent_cycles_total,
            agent_reports_sent_total,
            agent_report_failures_total,
            agent_collect_errors_total,
            agent_store_errors_total,
            agent_cpu_usage_percent,
            agent_memory_usage_percent,
            agent_disk_usage_percent,
            agent_last_cycle_timestamp_seconds,
            agent_last_report_timestamp_seconds,
            agent_uptime_seconds,
            agent_scrape_count_total,
        }))
    }

    pub fn observe_cycle(&self, outcome: &CycleOutcome, sampled: Option<&Snapshot>) {
        let now = now_unix();
        self.agent_cycles_total
            .with_label_values(&[outcome.label()])
            .inc();
        self.agent_last_cycle_timestamp_seconds.set(now as f64);
        self.agent_uptime_seconds
            .set(now.saturating_sub(self.started_at_unix) as f64);

        match outcome {
            CycleOutcome::Sent => {
                self.agent_reports_sent_total.inc();
                self.agent_last_report_timestamp_seconds.set(now as f64);
            }
            CycleOutcome::NoChange => {}
            CycleOutcome::CollectFailed(_) => {
                self.agent_collect_errors_total.inc();
            }
            CycleOutcome::SendFailed(_) => {
                self.agent_report_failures_total.inc();
            }
            CycleOutcome::SentSaveFailed(_) => {
                self.agent_reports_sent_total.inc();
                self.agent_store_errors_total.inc();
                self.agent_last_report_timestamp_seconds.set(now as f64);
            }
        }

        if let Some(snapshot) = sampled {
            self.agent_cpu_usage_percent.set(snapshot.cpu_percent);
            if let Some(pct) = snapshot.memory.get("percent") {
                self.agent_memory_usage_percent.set(*pct);
            }
            if let Some(pct) = snapshot.disk.get("percent") {
                self.agent_disk_usage_percent.set(*pct);
            }
        }
    }

    pub fn inc_scrape_count(&self) {
        self.agent_scrape_count_total.inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
