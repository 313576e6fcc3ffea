use std::path::PathBuf;
use std::sync::Arc;

use complexity_watch::bridge::stdio::{drain_outbound, pump_inbound, PanelRegistry, StdioNotifier, StdioPanelHost};
use complexity_watch::services::analysis::HttpAnalysisService;
use complexity_watch::{Reactor, WatchConfig};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is the bridge protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = WatchConfig::load(config_path.as_deref())?;
    tracing::info!("Analysis service at {}{}", config.service_url, config.analyze_path);

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(drain_outbound(out_rx, tokio::io::stdout()));

    let registry = PanelRegistry::default();
    let service = Arc::new(HttpAnalysisService::new(&config.service_url, &config.analyze_path));
    let panel_host = Box::new(StdioPanelHost::new(out_tx.clone(), registry.clone()));
    let notifier = Arc::new(StdioNotifier::new(out_tx));

    let (mut reactor, source) = Reactor::new(&config, service, panel_host, notifier);
    let shutdown = reactor.shutdown_token();

    let kernel = tokio::spawn(async move {
        reactor.run().await;
        let snapshot = reactor.telemetry().snapshot();
        tracing::info!(
            "Session: {} dispatched, {} delivered, {} failed, {} discarded",
            snapshot.dispatched,
            snapshot.delivered,
            snapshot.failed,
            snapshot.discarded
        );
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let interrupted = tokio::select! {
        result = pump_inbound(stdin, source, registry) => {
            if let Err(e) = result {
                tracing::warn!("Host bridge stopped early: {}", e);
            }
            false
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            shutdown.cancel();
            true
        }
    };

    kernel.await?;
    // Reactor (and every outbox sender with it) is gone; let the writer finish
    writer.await??;

    if interrupted {
        // The stdin read is still parked on a blocking thread and would hold up runtime teardown
        std::process::exit(0);
    }
    Ok(())
}
