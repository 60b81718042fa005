#![deny(warnings)]

//! Headless CLI: load a save slot, replay the offline gap, run the fixed-step
//! loop for a simulated duration on a virtual clock, report, and save.

use anyhow::Result;
use persistence::{JsonFileStore, SaveStore};
use sim_core::stats::{aggregate_stats, format_big, time_played};
use sim_core::GameState;
use sim_runtime::command::{Command, InboundMessage, LogLevel, OutboundMessage};
use sim_runtime::scheduler::{Clock, ManualClock, Scheduler, TICK_INTERVAL_MS};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    save_dir: String,
    slot: String,
    seconds: u64,
    auto_buy: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        save_dir: "./saves".to_string(),
        slot: "main".to_string(),
        seconds: 60,
        auto_buy: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--save-dir" => {
                if let Some(v) = it.next() {
                    args.save_dir = v;
                }
            }
            "--slot" => {
                if let Some(v) = it.next() {
                    args.slot = v;
                }
            }
            "--seconds" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.seconds = v;
                }
            }
            "--buy-max-all" => args.auto_buy = true,
            _ => {}
        }
    }
    args
}

/// Forward worker output: log lines to the subscriber, snapshots counted.
fn drain(out: &mut Vec<OutboundMessage>, snapshots: &mut u64) {
    for msg in out.drain(..) {
        match msg {
            OutboundMessage::Log { level, message } => match level {
                LogLevel::Warn => warn!("{message}"),
                LogLevel::Info => info!("{message}"),
            },
            OutboundMessage::State { .. } => *snapshots += 1,
        }
    }
}

fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(
        save_dir = %args.save_dir,
        slot = %args.slot,
        seconds = args.seconds,
        auto_buy = args.auto_buy,
        "starting CLI"
    );

    let store = JsonFileStore::new(&args.save_dir);
    let now_ms = chrono::Utc::now().timestamp_millis();
    let serialized = match store.load(&args.slot)? {
        Some(saved) => {
            info!(slot = %args.slot, "loaded existing save");
            saved
        }
        None => GameState::new(now_ms).to_serialized(),
    };
    let offline_seconds = (now_ms - serialized.last_tick).max(0) as f64 / 1000.0;

    let clock = ManualClock::new(now_ms);
    let mut sched = Scheduler::new(clock.clone());
    let mut out = Vec::new();
    let mut snapshots = 0;

    sched.handle_message(
        InboundMessage::Init {
            state: serialized,
            offline_seconds,
            auto_start: true,
        },
        &mut out,
    );
    drain(&mut out, &mut snapshots);

    let frames = args.seconds * 1000 / TICK_INTERVAL_MS;
    for frame in 0..frames {
        clock.advance(TICK_INTERVAL_MS);
        sched.on_timer(&mut out);
        // Greedy autoplay: sweep every tier once per simulated second.
        if args.auto_buy && frame % 20 == 19 {
            sched.handle_message(InboundMessage::Action(Command::BuyMaxAll), &mut out);
        }
        drain(&mut out, &mut snapshots);
    }
    sched.handle_message(InboundMessage::Pause, &mut out);
    drain(&mut out, &mut snapshots);

    let state = sched.state();
    let stats = aggregate_stats(state);
    let played = time_played(state, clock.wall_ms());

    println!(
        "Entropic Threads | build {} ({})",
        env!("GIT_SHA"),
        env!("BUILD_DATE")
    );
    println!(
        "Run | simulated: {}s offline + {}s live | snapshots: {}",
        offline_seconds.min(sim_runtime::scheduler::MAX_OFFLINE_SECONDS) as u64,
        args.seconds,
        snapshots
    );
    println!(
        "Strings | pool: {} | lifetime: {} | started {}",
        format_big(&state.strings),
        format_big(&state.total_strings_produced),
        format_timestamp(state.created)
    );
    println!(
        "Gens | units: {} | bought: {} | highest tier: {}",
        format_big(&stats.total_units),
        stats.total_bought,
        stats
            .highest_tier
            .map(|t| format!("Gen{}", t + 1))
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "Braid | unlocked: {} | resets: {} | best: {} | Fiber | resets: {} | boost: {}",
        state.braid.unlocked,
        state.braid.resets,
        format_big(&state.braid.best_strings),
        state.fiber.resets,
        format_big(&state.fiber.boost)
    );
    println!(
        "Time played | {}d {}h {}m {}s",
        played.days, played.hours, played.minutes, played.seconds
    );

    store.save(&args.slot, &state.to_serialized())?;
    info!(slot = %args.slot, "saved");
    Ok(())
}
