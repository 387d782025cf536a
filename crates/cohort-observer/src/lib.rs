//! Observer API server for Cohort runs.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/ticks`) streaming one
//!   [`TickBroadcast`] per committed tick
//! - **REST endpoints** for the running condition (agents, links, groups,
//!   time series, interaction log), completed results, and the latest
//!   live feed snapshot
//! - **Operator endpoints** for pause, resume, speed, status, and stop
//! - **Minimal HTML status page** (`GET /`)
//!
//! The engine replaces the in-memory [`SimulationSnapshot`] after each
//! tick; handlers only ever read it.

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, SimulationSnapshot, TickBroadcast};
