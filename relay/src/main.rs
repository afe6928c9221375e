use anchorcore::diagnostics::MetricsRecorder;
use anyhow::Context;
use clap::Parser;
use display::WsClient;
use generator::profile::{build_walk, GeneratorConfig};
use ingest::BrokerSubscriber;
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::mpsc;
use workflow::config::RelayConfig;
use workflow::runner::{run_event_loop, Pipeline};

mod display;
mod generator;
mod ingest;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Anchor-distance telemetry to live position relay")]
struct Args {
    /// Load the relay config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the broker address (host:port)
    #[arg(long)]
    broker: Option<String>,
    /// Override the telemetry topic
    #[arg(long)]
    topic: Option<String>,
    /// Override the HTTP/websocket bind address
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Run a synthetic walk through the pipeline instead of serving
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long, default_value_t = 50)]
    samples: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.config.as_ref() {
        RelayConfig::load(path)?
    } else {
        RelayConfig::default()
    };
    if let Some(broker) = args.broker.clone() {
        config.broker_addr = broker;
    }
    if let Some(topic) = args.topic.clone() {
        config.topic = topic;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    config.validate().context("validating relay config")?;

    if args.offline {
        return run_offline(&config, &args);
    }

    // All state mutation happens on the event-loop task.
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating relay runtime")?;
    runtime.block_on(serve(config))
}

async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let metrics = Arc::new(MetricsRecorder::new());
    let pipeline =
        Pipeline::<WsClient>::new(&config, metrics.clone()).context("building pipeline")?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let consumer = tokio::spawn(run_event_loop(events_rx, pipeline));
    let subscriber = BrokerSubscriber::from_config(&config, metrics.clone());
    let ingestion = tokio::spawn(subscriber.run(events_tx.clone()));

    let (addr, server) = warp::serve(display::routes(events_tx, metrics))
        .try_bind_with_graceful_shutdown(config.bind_addr, async {
            if let Err(err) = signal::ctrl_c().await {
                warn!("awaiting Ctrl+C failed: {}", err);
            }
        })
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(
        "relay listening on {} (topic {} via {})",
        addr, config.topic, config.broker_addr
    );

    server.await;
    info!("shutting down");
    ingestion.abort();
    consumer.abort();
    Ok(())
}

fn run_offline(config: &RelayConfig, args: &Args) -> anyhow::Result<()> {
    let metrics = Arc::new(MetricsRecorder::new());
    let mut pipeline =
        Pipeline::<WsClient>::new(config, metrics.clone()).context("building pipeline")?;
    let generator = GeneratorConfig {
        samples: args.samples,
        seed: args.seed,
        ..Default::default()
    };

    let mut last = None;
    for payload in build_walk(&generator, &config.anchors()) {
        if let Ok((outcome, _)) = pipeline.ingest(payload) {
            last = Some(outcome.estimate);
        }
    }

    let snapshot = metrics.snapshot();
    let final_position = last
        .as_ref()
        .map(|estimate| format!("({}, {})", estimate.x, estimate.y))
        .unwrap_or_else(|| "none".into());
    println!(
        "Offline run -> processed {}, exact {}, flat {}, ratio {}, zero {}, final {}",
        snapshot.processed,
        snapshot.exact,
        snapshot.flat,
        snapshot.ratio,
        snapshot.zero,
        final_position
    );

    let report = format!(
        "samples={} seed={} processed={} dropped={} exact={} flat={} ratio={} zero={} final={}\n",
        args.samples,
        args.seed,
        snapshot.processed,
        snapshot.dropped,
        snapshot.exact,
        snapshot.flat,
        snapshot.ratio,
        snapshot.zero,
        final_position
    );
    let report_path = PathBuf::from("tools/data/offline_positions.log");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening {}", report_path.display()))?;
    file.write_all(report.as_bytes())?;
    Ok(())
}
