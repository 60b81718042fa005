//! Worker-thread shell around the scheduler.
//!
//! The UI side holds a [`SimWorker`] handle and talks to the loop purely
//! through channels: inbound messages are processed in arrival order, timer
//! wake-ups fire between receives, and every wake-up completes before the
//! next one starts because the loop is a single thread.

use crate::command::{InboundMessage, OutboundMessage};
use crate::scheduler::{Scheduler, SystemClock, TICK_INTERVAL_MS};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker thread has already shut down.
    #[error("simulation worker is disconnected")]
    Disconnected,
}

/// Handle to a running simulation thread. Dropping it shuts the thread down.
pub struct SimWorker {
    inbound: Option<Sender<InboundMessage>>,
    outbound: Receiver<OutboundMessage>,
    thread: Option<JoinHandle<()>>,
}

impl SimWorker {
    pub fn spawn() -> std::io::Result<SimWorker> {
        let (inbound_tx, inbound_rx) = channel();
        let (outbound_tx, outbound_rx) = channel();
        let thread = std::thread::Builder::new()
            .name("sim-worker".into())
            .spawn(move || run_loop(inbound_rx, outbound_tx))?;
        Ok(SimWorker {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
            thread: Some(thread),
        })
    }

    pub fn send(&self, msg: InboundMessage) -> Result<(), WorkerError> {
        self.inbound
            .as_ref()
            .ok_or(WorkerError::Disconnected)?
            .send(msg)
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Receiver for snapshots and log lines.
    pub fn outbound(&self) -> &Receiver<OutboundMessage> {
        &self.outbound
    }
}

impl Drop for SimWorker {
    fn drop(&mut self) {
        // Disconnecting the inbound channel tells the loop to exit.
        self.inbound.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!("simulation worker panicked during shutdown");
            }
        }
    }
}

fn run_loop(inbound: Receiver<InboundMessage>, outbound: Sender<OutboundMessage>) {
    let mut scheduler = Scheduler::new(SystemClock::new());
    let mut pending = Vec::new();
    loop {
        match inbound.recv_timeout(Duration::from_millis(TICK_INTERVAL_MS)) {
            Ok(msg) => scheduler.handle_message(msg, &mut pending),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
        scheduler.on_timer(&mut pending);
        for msg in pending.drain(..) {
            if outbound.send(msg).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, SnapshotReason};
    use sim_core::GameState;

    fn recv_state(worker: &SimWorker) -> (SnapshotReason, sim_core::SerializedGameState) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            match worker.outbound().recv_timeout(Duration::from_millis(500)) {
                Ok(OutboundMessage::State { reason, snapshot, .. }) => return (reason, snapshot),
                Ok(OutboundMessage::Log { .. }) => continue,
                Err(_) => continue,
            }
        }
        panic!("no state snapshot arrived in time");
    }

    #[test]
    fn worker_answers_snapshot_requests() {
        let worker = SimWorker::spawn().unwrap();
        worker
            .send(InboundMessage::Init {
                state: GameState::new(0).to_serialized(),
                offline_seconds: 0.0,
                auto_start: false,
            })
            .unwrap();
        worker
            .send(InboundMessage::RequestSnapshot {
                reason: SnapshotReason::Manual,
            })
            .unwrap();
        let (reason, snapshot) = recv_state(&worker);
        assert_eq!(reason, SnapshotReason::Manual);
        assert_eq!(
            sim_core::Big::parse_or(&snapshot.strings, sim_core::Big::zero()),
            sim_core::Big::from_f64(2.0)
        );
    }

    #[test]
    fn actions_are_processed_in_order_and_broadcast() {
        let worker = SimWorker::spawn().unwrap();
        worker
            .send(InboundMessage::Init {
                state: GameState::new(0).to_serialized(),
                offline_seconds: 0.0,
                auto_start: false,
            })
            .unwrap();
        worker
            .send(InboundMessage::Action(Command::DevAddStrings {
                amount: "100".into(),
            }))
            .unwrap();
        worker
            .send(InboundMessage::Action(Command::BuyOne { tier: 0 }))
            .unwrap();

        let (reason, first) = recv_state(&worker);
        assert_eq!(reason, SnapshotReason::Action);
        assert_eq!(
            sim_core::Big::parse_or(&first.strings, sim_core::Big::zero()),
            sim_core::Big::from_f64(102.0)
        );

        let (reason, second) = recv_state(&worker);
        assert_eq!(reason, SnapshotReason::Action);
        assert_eq!(second.gens[0].bought, 1);
    }

    #[test]
    fn dropping_the_handle_shuts_the_worker_down() {
        let worker = SimWorker::spawn().unwrap();
        drop(worker);
    }
}
