mod collectors;
mod config;
mod http;
mod metrics;
mod reporter;
mod scheduler;
mod state;
mod status;
mod store;

use axum::serve;
use clap::Parser;
use collectors::system::SystemCollector;
use config::Config;
use metrics::Metrics;
use reporter::HttpReporter;
use scheduler::{LoopSettings, RandomJitter, ReportLoop};
use status::{now_unix, AgentStatus};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use store::StateStore;
use tokio::net::TcpListener;
use tokio::sync::{watch, RwLock};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reportd")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    state_path: Option<String>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let mut cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };
    if let Some(endpoint) = cli.endpoint {
        cfg.endpoint = endpoint;
    }
    if let Some(state_path) = cli.state_path {
        cfg.state_path = state_path;
    }
    if let Err(err) = cfg.validate() {
        error!(error = %err, "переопределения командной строки не прошли валидацию");
        std::process::exit(1);
    }

    info!(
        endpoint = %cfg.endpoint,
        listen = %cfg.listen,
        state_path = %cfg.state_path,
        min_interval_secs = cfg.min_interval_secs,
        max_interval_secs = cfg.max_interval_secs,
        "запуск reportd"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "не удалось инициализировать метрики");
            std::process::exit(1);
        }
    };
    let status = Arc::new(RwLock::new(AgentStatus::new(now_unix())));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = {
        let cfg = cfg.clone();
        let metrics = metrics.clone();
        let status = status.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let app = http::build_router(metrics, status);
            let addr: SocketAddr = match cfg.listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %cfg.listen, "некорректный адрес listen");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "не удалось запустить HTTP-сервер");
                    return;
                }
            };

            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "ошибка HTTP-сервера");
            }
        })
    };

    let loop_task = {
        let settings = LoopSettings {
            min_interval: Duration::from_secs(cfg.min_interval_secs),
            max_interval: Duration::from_secs(cfg.max_interval_secs),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
        };
        let report_loop = ReportLoop::new(
            settings,
            SystemCollector::new(),
            StateStore::new(&cfg.state_path),
            HttpReporter::new(cfg.endpoint.clone()),
            RandomJitter,
            metrics.clone(),
            status.clone(),
        );
        tokio::spawn(report_loop.run(shutdown_rx.clone()))
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "не удалось дождаться Ctrl+C");
    }
    info!("получен Ctrl+C, выполняется остановка");

    let _ = shutdown_tx.send(true);

    let _ = loop_task.await;
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
