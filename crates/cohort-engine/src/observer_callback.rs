//! Tick callback that updates the Observer API state.
//!
//! After each tick this callback refreshes the in-memory
//! [`SimulationSnapshot`] and broadcasts a [`TickBroadcast`] to all
//! connected `WebSocket` clients.

use std::sync::Arc;

use cohort_core::{SimulationState, TickCallback, TickSummary};
use cohort_observer::{AppState, SimulationSnapshot, TickBroadcast};
use cohort_types::ConditionResult;
use tracing::debug;

/// Callback that bridges the tick pipeline to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
    condition_index: usize,
    /// Results not yet written because the snapshot lock was busy.
    pending_results: Vec<ConditionResult>,
}

impl ObserverCallback {
    /// Create a new observer callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            condition_index: 0,
            pending_results: Vec::new(),
        }
    }

    /// Write any results still pending, waiting for the lock if needed.
    pub async fn flush(&mut self) {
        if self.pending_results.is_empty() {
            return;
        }
        let mut snap = self.state.snapshot.write().await;
        snap.results.append(&mut self.pending_results);
    }

    fn refresh(&mut self, sim: &SimulationState) {
        // try_write keeps the tick pipeline from blocking on a slow reader;
        // a skipped refresh is caught up on the next tick.
        let Ok(mut snap) = self.state.snapshot.try_write() else {
            debug!(tick = sim.tick, "Observer snapshot busy, skipping refresh");
            return;
        };
        fill(&mut snap, self.condition_index, sim, self.state.log_view);
        snap.results.append(&mut self.pending_results);
    }
}

fn fill(snap: &mut SimulationSnapshot, index: usize, sim: &SimulationState, log_view: usize) {
    snap.condition_name.clone_from(&sim.condition_name);
    snap.condition_index = index;
    snap.current_tick = sim.tick;
    snap.agents.clone_from(&sim.agents);
    snap.links.clone_from(&sim.links);
    snap.groups.clone_from(&sim.groups);
    snap.time_series.clone_from(&sim.time_series);
    snap.set_log_tail(&sim.log, log_view);
}

impl TickCallback for ObserverCallback {
    fn on_condition_start(&mut self, index: usize, sim: &SimulationState) {
        self.condition_index = index;
        self.refresh(sim);
    }

    fn on_tick(&mut self, summary: &TickSummary, sim: &SimulationState) {
        let broadcast = TickBroadcast {
            condition: sim.condition_name.clone(),
            tick: summary.tick,
            avg_sentiment: summary.point.avg_sentiment,
            polarization: summary.point.polarization,
            cooperation_pct: summary.point.cooperation_pct,
            group_count: summary.point.group_count,
        };
        let receivers = self.state.broadcast(&broadcast);
        debug!(tick = summary.tick, receivers, "Tick broadcast sent");

        self.refresh(sim);
    }

    fn on_condition_complete(&mut self, result: &ConditionResult) {
        self.pending_results.push(result.clone());
        if let Ok(mut snap) = self.state.snapshot.try_write() {
            snap.results.append(&mut self.pending_results);
        }
    }
}
