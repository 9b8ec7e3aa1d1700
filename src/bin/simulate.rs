use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use rps_arena_server::clock::ManualClock;
use rps_arena_server::config::SimulationConfig;
use rps_arena_server::constants::TICK_INTERVAL_US;
use rps_arena_server::game::RoomSimulation;
use rps_arena_server::systems::population::BotNamePool;
use rps_arena_server::types::{RankingEntry, RoomEvent, StateSnapshot};
use serde::Serialize;

const START_MS: u64 = 1_000_000;

/// Runs a bot-only room on a manual clock and prints a JSON summary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 12)]
    bots: usize,
    #[arg(long, default_value_t = 60)]
    seconds: u64,
    #[arg(long, default_value_t = 1)]
    seed: u32,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "generatedAt")]
    generated_at: String,
    seed: u32,
    bots: usize,
    #[serde(rename = "simulatedMs")]
    simulated_ms: u64,
    ticks: u64,
    eliminations: usize,
    #[serde(rename = "transformRounds")]
    transform_rounds: usize,
    #[serde(rename = "transformWarnings")]
    transform_warnings: usize,
    dashes: usize,
    #[serde(rename = "agentsSpawned")]
    agents_spawned: usize,
    #[serde(rename = "finalPlayers")]
    final_players: usize,
    ranking: Vec<RankingEntry>,
    anomalies: Vec<AnomalyRecord>,
}

fn main() {
    let cli = Cli::parse();
    let summary = run(&cli);

    let rendered = match serde_json::to_string_pretty(&summary) {
        Ok(rendered) => rendered,
        Err(error) => {
            eprintln!("failed to serialize summary: {error}");
            std::process::exit(2);
        }
    };
    println!("{rendered}");

    if let Some(path) = cli.summary_out.as_deref() {
        if let Err(error) = write_summary(path, &rendered) {
            eprintln!("failed to write {}: {error}", path.to_string_lossy());
            std::process::exit(2);
        }
    }

    if !summary.anomalies.is_empty() {
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> RunSummary {
    let config = SimulationConfig::with_capacity(cli.bots.max(1));
    let world_size = config.world_size;
    let capacity = config.capacity;
    let clock = Arc::new(ManualClock::new(START_MS));
    let names = Arc::new(BotNamePool::new(clock.clone(), config.bot_name_cooldown_ms));
    let mut sim = RoomSimulation::new(config, clock.clone(), names, cli.seed, true);
    sim.start();
    sim.fill_to_capacity();

    let mut summary = RunSummary {
        generated_at: String::new(),
        seed: cli.seed,
        bots: capacity,
        simulated_ms: 0,
        ticks: 0,
        eliminations: 0,
        transform_rounds: 0,
        transform_warnings: 0,
        dashes: 0,
        agents_spawned: 0,
        final_players: 0,
        ranking: Vec::new(),
        anomalies: Vec::new(),
    };
    let mut seen = BTreeSet::new();

    let end_us = cli.seconds.saturating_mul(1_000_000);
    let mut elapsed_us = 0u64;
    while elapsed_us < end_us {
        elapsed_us += TICK_INTERVAL_US;
        clock.set(START_MS + elapsed_us / 1_000);
        sim.tick();

        for event in sim.drain_events() {
            match event {
                RoomEvent::Eliminated(_) => summary.eliminations += 1,
                RoomEvent::Transformed { .. } => summary.transform_rounds += 1,
                RoomEvent::TransformWarning { .. } => summary.transform_warnings += 1,
                RoomEvent::DashChanged(change) if change.is_dashing => summary.dashes += 1,
                RoomEvent::PlayerJoined { is_agent: true, .. } => summary.agents_spawned += 1,
                RoomEvent::State(snapshot) => {
                    for message in collect_snapshot_anomalies(&snapshot, world_size, capacity) {
                        if seen.insert(message.clone()) {
                            summary.anomalies.push(AnomalyRecord {
                                tick: snapshot.tick,
                                message,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }

    summary.simulated_ms = elapsed_us / 1_000;
    summary.ticks = sim.tick_count();
    summary.final_players = sim.player_count();
    summary.ranking = sim.ranking();
    summary.generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    summary
}

fn collect_snapshot_anomalies(
    snapshot: &StateSnapshot,
    world_size: f32,
    capacity: usize,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.players.len() > capacity {
        anomalies.push(format!(
            "room holds {} players over capacity {capacity}",
            snapshot.players.len()
        ));
    }
    for player in &snapshot.players {
        let inside = |value: f32| value.is_finite() && (0.0..=world_size).contains(&value);
        if !inside(player.x) || !inside(player.y) {
            anomalies.push(format!("{} left the world", player.id));
        }
        if player.next_rps_state.is_none() {
            anomalies.push(format!("{} has no next state", player.id));
        }
    }
    anomalies
}

fn write_summary(path: &Path, rendered: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, rendered)
}
