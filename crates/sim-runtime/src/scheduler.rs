//! Fixed-step scheduler.
//!
//! The worker's loop state lives in an explicit [`Scheduler`] value rather
//! than module globals: an accumulator drained in fixed steps, offline
//! catch-up, broadcast cadence and drift diagnostics, all driven by an
//! injected [`Clock`] so tests run on a virtual timeline.

use crate::command::{
    Command, InboundMessage, LogLevel, Metrics, OutboundMessage, SnapshotReason,
};
use crate::{
    advance, apply_braid_reset, apply_fiber_reset, buy_max, buy_max_all, buy_n, buy_one,
    dev_add_generators, dev_add_strings,
};
use sim_core::{GameState, GeneratorSet};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Simulation step size.
pub const STEP_SECONDS: f64 = 0.05;
/// Timer cadence for the worker loop.
pub const TICK_INTERVAL_MS: u64 = 50;
/// Snapshots broadcast at most this often from the running loop.
pub const BROADCAST_INTERVAL_MS: u64 = 200;
/// A single wake-up never accounts for more wall time than this, so a
/// backgrounded or suspended process resumes gently.
pub const MAX_FRAME_MS: u64 = 250;
/// Steps drained per wake-up before the remainder is dropped.
pub const MAX_STEPS_PER_FRAME: u32 = 40;
/// Offline catch-up cap.
pub const MAX_OFFLINE_SECONDS: f64 = 60.0 * 60.0;

const BACKLOG_LOG_INTERVAL_MS: u64 = 5_000;
const DRIFT_WARN_RATIO: f64 = 1.5;
const DRIFT_CLEAR_RATIO: f64 = 1.2;

/// Time source for the loop: a monotonic millisecond counter for pacing and
/// Unix milliseconds for state timestamps.
pub trait Clock {
    fn monotonic_ms(&self) -> u64;
    fn wall_ms(&self) -> i64;
}

/// Real time.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn wall_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Hand-cranked time for tests and headless runs. Clones share the same
/// timeline, so a handle kept outside the scheduler can advance it.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    wall_origin: i64,
}

impl ManualClock {
    pub fn new(wall_origin: i64) -> Self {
        ManualClock {
            now: Rc::new(Cell::new(0)),
            wall_origin,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.now.get()
    }

    fn wall_ms(&self) -> i64 {
        self.wall_origin + self.now.get() as i64
    }
}

/// Owns the game state and the loop bookkeeping; processes one message or
/// timer wake-up at a time.
pub struct Scheduler<C: Clock> {
    clock: C,
    cfgs: GeneratorSet,
    state: GameState,
    running: bool,
    accumulator: f64,
    last_frame_ms: u64,
    last_broadcast_ms: u64,
    total_simulated_seconds: f64,
    loop_origin_ms: u64,
    drift_warned: bool,
    last_backlog_log_ms: Option<u64>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        let state = GameState::new(clock.wall_ms());
        let now = clock.monotonic_ms();
        Scheduler {
            clock,
            cfgs: GeneratorSet::standard(),
            state,
            running: false,
            accumulator: 0.0,
            last_frame_ms: now,
            last_broadcast_ms: now,
            total_simulated_seconds: 0.0,
            loop_origin_ms: now,
            drift_warned: false,
            last_backlog_log_ms: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Process one inbound message, appending any responses to `out`.
    pub fn handle_message(&mut self, msg: InboundMessage, out: &mut Vec<OutboundMessage>) {
        match msg {
            InboundMessage::Init {
                state,
                offline_seconds,
                auto_start,
            } => {
                self.running = false;
                self.state = GameState::from_serialized(&state, self.clock.wall_ms());
                self.reset_bookkeeping();
                self.simulate_offline(offline_seconds, out);
                if auto_start {
                    self.start();
                }
            }
            InboundMessage::Start => self.start(),
            InboundMessage::Pause => self.pause(),
            InboundMessage::Action(cmd) => self.apply_command(&cmd, out),
            InboundMessage::RequestSnapshot { reason } => self.push_snapshot(reason, out),
            InboundMessage::ReplaceState { state } => {
                self.state = GameState::from_serialized(&state, self.clock.wall_ms());
                self.reset_bookkeeping();
                self.push_snapshot(SnapshotReason::Replace, out);
            }
        }
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.drift_warned = false;
        let now = self.clock.monotonic_ms();
        self.last_frame_ms = now;
        self.last_broadcast_ms = now;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Timer wake-up: account elapsed wall time, drain whole steps, keep the
    /// broadcast cadence.
    pub fn on_timer(&mut self, out: &mut Vec<OutboundMessage>) {
        if !self.running {
            return;
        }
        let now = self.clock.monotonic_ms();
        let frame_ms = now.saturating_sub(self.last_frame_ms).min(MAX_FRAME_MS);
        self.last_frame_ms = now;
        self.accumulator += frame_ms as f64 / 1000.0;

        let mut steps = 0;
        while self.accumulator >= STEP_SECONDS && steps < MAX_STEPS_PER_FRAME {
            advance(&mut self.state, &self.cfgs, STEP_SECONDS);
            self.total_simulated_seconds += STEP_SECONDS;
            self.accumulator -= STEP_SECONDS;
            steps += 1;
        }
        if steps == MAX_STEPS_PER_FRAME && self.accumulator >= STEP_SECONDS {
            // Keep one step's worth so the loop never freezes, drop the rest.
            self.accumulator = STEP_SECONDS;
            self.log_backlog_drop(now, out);
        }

        if now.saturating_sub(self.last_broadcast_ms) >= BROADCAST_INTERVAL_MS {
            self.last_broadcast_ms = now;
            self.push_snapshot(SnapshotReason::Tick, out);
        }
    }

    fn apply_command(&mut self, cmd: &Command, out: &mut Vec<OutboundMessage>) {
        let changed = match cmd {
            Command::BuyOne { tier } => buy_one(&mut self.state, &self.cfgs, *tier),
            Command::BuyN { tier, amount } => buy_n(&mut self.state, &self.cfgs, *tier, *amount),
            Command::BuyMax { tier } => buy_max(&mut self.state, &self.cfgs, *tier),
            Command::BuyMaxAll => buy_max_all(&mut self.state, &self.cfgs),
            Command::BraidReset => apply_braid_reset(&mut self.state, self.clock.wall_ms()),
            Command::FiberReset => apply_fiber_reset(&mut self.state, self.clock.wall_ms()),
            Command::DevAddStrings { amount } => dev_add_strings(&mut self.state, amount),
            Command::DevAddGenerators { tier, amount } => {
                dev_add_generators(&mut self.state, *tier, *amount)
            }
        };
        if changed {
            self.push_snapshot(SnapshotReason::Action, out);
        }
    }

    /// Replay a wall-clock gap before going live, in whole steps plus a
    /// final partial one, capped at [`MAX_OFFLINE_SECONDS`].
    fn simulate_offline(&mut self, seconds: f64, out: &mut Vec<OutboundMessage>) {
        if seconds <= 0.0 {
            return;
        }
        let capped = seconds.min(MAX_OFFLINE_SECONDS);
        if seconds > MAX_OFFLINE_SECONDS {
            let message = format!(
                "offline progress capped to {:.0} minutes",
                MAX_OFFLINE_SECONDS / 60.0
            );
            warn!("{message}");
            out.push(OutboundMessage::Log {
                level: LogLevel::Warn,
                message,
            });
        }
        let mut remaining = capped;
        while remaining > 0.0 {
            let step = remaining.min(STEP_SECONDS);
            advance(&mut self.state, &self.cfgs, step);
            remaining -= step;
        }
        self.state.last_tick = self.clock.wall_ms();
        self.reset_bookkeeping();
        self.push_snapshot(SnapshotReason::Offline, out);
    }

    fn reset_bookkeeping(&mut self) {
        let now = self.clock.monotonic_ms();
        self.accumulator = 0.0;
        self.total_simulated_seconds = 0.0;
        self.loop_origin_ms = now;
        self.last_frame_ms = now;
        self.last_broadcast_ms = now;
        self.drift_warned = false;
        self.last_backlog_log_ms = None;
    }

    fn log_backlog_drop(&mut self, now: u64, out: &mut Vec<OutboundMessage>) {
        let due = match self.last_backlog_log_ms {
            Some(last) => now.saturating_sub(last) >= BACKLOG_LOG_INTERVAL_MS,
            None => true,
        };
        if !due {
            return;
        }
        self.last_backlog_log_ms = Some(now);
        let message = "simulation falling behind real time; dropping excess backlog".to_string();
        warn!("{message}");
        out.push(OutboundMessage::Log {
            level: LogLevel::Warn,
            message,
        });
    }

    fn push_snapshot(&mut self, reason: SnapshotReason, out: &mut Vec<OutboundMessage>) {
        let wall_seconds =
            self.clock.monotonic_ms().saturating_sub(self.loop_origin_ms) as f64 / 1000.0;
        if wall_seconds > 0.0 {
            let ratio = self.total_simulated_seconds / wall_seconds;
            if ratio > DRIFT_WARN_RATIO && !self.drift_warned {
                self.drift_warned = true;
                let message = format!(
                    "simulation ran {ratio:.2}x faster than wall clock; trimming backlog"
                );
                warn!("{message}");
                out.push(OutboundMessage::Log {
                    level: LogLevel::Warn,
                    message,
                });
            } else if ratio < DRIFT_CLEAR_RATIO && self.drift_warned {
                self.drift_warned = false;
                info!("simulation caught up with wall clock");
            }
        }
        out.push(OutboundMessage::State {
            reason,
            snapshot: self.state.to_serialized(),
            metrics: Metrics {
                simulated_seconds: self.total_simulated_seconds,
                wall_seconds,
            },
        });
    }
}
