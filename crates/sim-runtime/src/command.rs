//! Messages crossing the worker boundary.
//!
//! Discrete mutations arrive as [`Command`] values inside an
//! [`InboundMessage`]; the worker answers with [`OutboundMessage`] snapshots
//! and log lines. Everything is a tagged enum dispatched by exhaustive
//! matching, and the JSON form matches the persisted camelCase wire format.

use serde::{Deserialize, Serialize};
use sim_core::SerializedGameState;

/// A discrete mutation request from the UI.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    BuyOne { tier: usize },
    BuyN { tier: usize, amount: u64 },
    BuyMax { tier: usize },
    BuyMaxAll,
    BraidReset,
    FiberReset,
    /// Dev cheat; the amount is a decimal string so it can exceed f64.
    DevAddStrings { amount: String },
    DevAddGenerators { tier: usize, amount: u64 },
}

/// Messages the simulation core accepts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    /// Load a serialized state, replay offline time, optionally start.
    #[serde(rename_all = "camelCase")]
    Init {
        state: SerializedGameState,
        #[serde(default)]
        offline_seconds: f64,
        #[serde(default = "default_auto_start")]
        auto_start: bool,
    },
    Start,
    Pause,
    Action(Command),
    #[serde(rename_all = "camelCase")]
    RequestSnapshot {
        #[serde(default)]
        reason: SnapshotReason,
    },
    /// Atomic whole-state swap; resets all loop bookkeeping.
    #[serde(rename_all = "camelCase")]
    ReplaceState { state: SerializedGameState },
}

fn default_auto_start() -> bool {
    true
}

/// Why a snapshot was emitted.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotReason {
    /// Periodic broadcast from the running loop.
    Tick,
    /// A command just changed the state.
    Action,
    /// Offline catch-up finished.
    Offline,
    /// A state swap completed.
    Replace,
    /// Explicitly requested by the caller.
    #[default]
    Manual,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LogLevel {
    Info,
    Warn,
}

/// Loop health counters attached to every snapshot.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub simulated_seconds: f64,
    pub wall_seconds: f64,
}

/// Messages the simulation core emits.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    #[serde(rename_all = "camelCase")]
    State {
        reason: SnapshotReason,
        snapshot: SerializedGameState,
        metrics: Metrics,
    },
    #[serde(rename_all = "camelCase")]
    Log { level: LogLevel, message: String },
}
