use anyhow::Context;
use clap::Parser;
use tracing::info;

use rail_types::Layout;

use railyard_leader::coordinator::Coordinator;
use railyard_leader::distances::DistanceTable;
use railyard_leader::planner;
use railyard_leader::radio::{LeaderRadio, RadioConfig};
use railyard_leader::repl::Repl;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "railyard-leader", about = "Railyard layout leader — planner and executor")]
struct Args {
    /// UDP address command frames are sent to
    #[arg(long)]
    hub_addr: Option<String>,
    /// UDP port to listen on for status frames
    #[arg(long)]
    port: Option<u16>,
    /// Optional multicast mirror for command frames
    #[arg(long)]
    multicast: Option<String>,
    /// Answer every execution/failure prompt with yes (unattended runs)
    #[arg(long)]
    yes: bool,
    /// Planner node-expansion budget
    #[arg(long, default_value_t = planner::DEFAULT_NODE_BUDGET)]
    budget: usize,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "railyard_leader=info".into()),
        )
        .init();

    let args = Args::parse();

    info!(
        "🚂 Railyard leader v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    // A segment without patterns cannot be driven; refuse to start.
    let layout = Layout::standard();
    layout.validate().context("track layout validation failed")?;

    info!("Precomputing shortest path distances...");
    let distances = DistanceTable::compute(&layout);

    let mut config = RadioConfig::default();
    if let Some(addr) = args.hub_addr {
        config.hub_addr = addr;
    }
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if args.multicast.is_some() {
        config.multicast_addr = args.multicast;
    }

    let radio = LeaderRadio::bind(config).await?;
    info!(
        "observing status channels {:?}",
        rail_types::channel::leader_observe_channels()
    );
    let coordinator = Coordinator::new(radio);

    Repl::new(coordinator, layout, distances, args.yes, args.budget)
        .run()
        .await
}
