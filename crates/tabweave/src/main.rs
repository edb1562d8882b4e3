use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tabweave_bridge::browser::BridgeBrowser;
use tabweave_bridge::server;
use tabweave_engine::config::{Config, ConfigLoader};
use tabweave_engine::executor::SequenceRunner;
use tabweave_engine::remote::RemoteQueue;
use tabweave_engine::runloop::RunLoop;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tabweave", version, about = "Browser sequence runner")]
struct Args {
    /// Base URL of the queue/history server (overrides config).
    #[arg(long)]
    server: Option<String>,

    /// Port the browser glue connects to (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Queue poll interval in milliseconds (overrides config).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Explicit config file instead of the default locations.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single fetch-confirm-execute-report cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout stays clean for tooling.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config: Config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(server) = args.server {
        config.server_url = server;
    }
    if let Some(port) = args.port {
        config.bridge_port = port;
    }
    if let Some(interval) = args.interval_ms {
        config.poll_interval_ms = interval;
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], config.bridge_port));
    let (bridge, _) = server::start(addr).await?;
    let browser = BridgeBrowser::new(bridge);

    let queue = RemoteQueue::from_str(&config.server_url)?;
    let instance_id = Uuid::new_v4();
    if let Err(err) = queue.register(&instance_id.to_string()).await {
        warn!(%err, "could not register this instance with the server");
    }

    let runner = SequenceRunner::with_config(browser, config.engine());
    let run_loop = RunLoop::new(queue, runner, config.poll_interval());

    if args.once {
        run_loop.tick().await;
    } else {
        run_loop.run().await;
    }
    Ok(())
}
