//! main.rs — follower hub simulator entry point.
//!
//! Hosts the five switch hubs and any configured train hubs as independent
//! tasks over one shared radio, standing in for the physical layout:
//!   1. Switch hubs: poll commands, throw virtual switch motors, snapshot
//!      status on their own channels
//!   2. Train hubs: poll commands, chase color patterns along virtual tape
//!      built from the track graph, heartbeat status while moving
//!   3. Fault injection: configurable packet loss and sensor misreads, so
//!      the leader's retry/dedup machinery has something real to survive
//!
//! Ctrl-C plays the role of every hub's stop button.

mod radio;
mod switch_hub;
mod train_hub;
mod virtual_track;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use rail_types::{City, Layout, TrainId};

use radio::{HubRadio, RadioConfig};
use switch_hub::{MotorKind, SwitchHub, SwitchMotor, SwitchSpec};
use train_hub::TrainHub;
use virtual_track::{build_tape, NoiseModel, TrainWorld, VirtualSwitchMotor};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hub-sim", about = "Railyard follower hub simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// UDP address status frames are sent to
    #[arg(long)]
    leader_addr: Option<String>,
    /// UDP port to listen on for command frames
    #[arg(long)]
    port: Option<u16>,
    /// Packet loss probability override (0.0..1.0)
    #[arg(long)]
    loss: Option<f64>,
    /// Sensor misread probability override (0.0..1.0)
    #[arg(long)]
    misread: Option<f64>,
}

// ── Config structs ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FullConfig {
    radio: RadioSection,
    faults: FaultsSection,
    #[serde(default)]
    trains: Vec<TrainSection>,
}

#[derive(Debug, Deserialize)]
struct RadioSection {
    bind_port: u16,
    leader_addr: String,
    multicast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FaultsSection {
    drop_rate: f64,
    misread_prob: f64,
}

#[derive(Debug, Deserialize)]
struct TrainSection {
    name: String,
    /// City pairs the virtual tape is laid from, in travel order.
    journey: Vec<[String; 2]>,
}

// ── Static switch ownership (mirrors the physical wiring) ─────────────────────

fn hub_specs() -> Vec<(u8, Vec<SwitchSpec>)> {
    use rail_types::SwitchId as Sw;
    let spec = |id, polarity, kind| SwitchSpec { id, polarity, kind };
    vec![
        // Hub 1, near LA: A left/M, B right/L
        (1, vec![spec(Sw::A, 1, MotorKind::M), spec(Sw::B, -1, MotorKind::L)]),
        // Hub 2, near Calgary: C right/M, D left/M
        (2, vec![spec(Sw::C, -1, MotorKind::M), spec(Sw::D, 1, MotorKind::M)]),
        // Hub 3, near Kansas City: E left flipped/L, F right/M, G right flipped/L
        (
            3,
            vec![
                spec(Sw::E, -1, MotorKind::L),
                spec(Sw::F, -1, MotorKind::M),
                spec(Sw::G, 1, MotorKind::L),
            ],
        ),
        // Hub 4, near NYC: H left/M, I right/L
        (4, vec![spec(Sw::H, 1, MotorKind::M), spec(Sw::I, -1, MotorKind::L)]),
        // Hub 5, near Atlanta: J left/M
        (5, vec![spec(Sw::J, 1, MotorKind::M)]),
    ]
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hub_sim=info".into()),
        )
        .init();

    let args = Args::parse();

    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let mut cfg: FullConfig = toml::from_str(&config_str).context("invalid config.toml")?;

    if let Some(addr) = args.leader_addr {
        cfg.radio.leader_addr = addr;
    }
    if let Some(port) = args.port {
        cfg.radio.bind_port = port;
    }
    if let Some(loss) = args.loss {
        cfg.faults.drop_rate = loss;
    }
    if let Some(misread) = args.misread {
        cfg.faults.misread_prob = misread;
    }

    info!(
        "🚂 Hub simulator starting — {} switch hubs, {} trains, loss={:.0}%",
        hub_specs().len(),
        cfg.trains.len(),
        cfg.faults.drop_rate * 100.0
    );

    let layout = Layout::standard();
    layout.validate().context("track layout validation failed")?;

    let radio = HubRadio::bind(RadioConfig {
        bind_port: cfg.radio.bind_port,
        leader_addr: cfg.radio.leader_addr.clone(),
        multicast_addr: cfg.radio.multicast.clone(),
        drop_rate: cfg.faults.drop_rate,
    })
    .await?;

    let stop = Arc::new(AtomicBool::new(false));

    // Switch hubs
    for (hub_index, specs) in hub_specs() {
        let motors: Vec<(SwitchSpec, Box<dyn SwitchMotor>)> = specs
            .into_iter()
            .map(|spec| {
                (
                    spec,
                    Box::new(VirtualSwitchMotor::new(Arc::new(Default::default())))
                        as Box<dyn SwitchMotor>,
                )
            })
            .collect();
        let hub = SwitchHub::new(hub_index, motors, radio.clone());
        tokio::spawn(hub.run(stop.clone()));
    }

    // Train hubs
    let noise = NoiseModel {
        misread_prob: cfg.faults.misread_prob,
        ..NoiseModel::default()
    };
    for train_cfg in &cfg.trains {
        let Ok(train) = TrainId::from_str(&train_cfg.name) else {
            warn!("unknown train '{}' in config, skipping", train_cfg.name);
            continue;
        };
        let journey: Vec<(City, City)> = train_cfg
            .journey
            .iter()
            .filter_map(|[a, b]| match (City::from_str(a), City::from_str(b)) {
                (Ok(src), Ok(dst)) => Some((src, dst)),
                _ => {
                    warn!("{train}: bad journey hop {a} -> {b}, skipping");
                    None
                }
            })
            .collect();

        let tape = build_tape(&layout, &journey);
        info!("{train}: tape laid with {} marks", tape.len());
        let world = TrainWorld::new(tape, noise.clone());
        let hub = TrainHub::new(
            train,
            Box::new(world.motor()),
            Box::new(world.sensor()),
            radio.clone(),
        );
        tokio::spawn(hub.run(stop.clone()));
    }

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("stop button pressed, shutting down hubs");
    stop.store(true, Ordering::Relaxed);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    Ok(())
}
