//! Live feed aggregation for the Cohort presentation layer.
//!
//! An external debate run publishes an ordered feed of typed events. This
//! crate decodes that feed and folds it into graph state (agents, chain
//! links, a vote tally) owned by a single consumer. It shares no state
//! with the tick pipeline.
//!
//! # Modules
//!
//! - [`event`] -- Feed event schema and frame decoding
//! - [`aggregator`] -- [`LiveStreamAggregator`] state machine
//! - [`consumer`] -- Single-consumer event loop with shutdown
//! - [`error`] -- Error types ([`StreamError`])

pub mod aggregator;
pub mod consumer;
pub mod error;
pub mod event;

pub use aggregator::{Flow, LiveAgent, LiveSnapshot, LiveStreamAggregator, Tally};
pub use consumer::{ConsumeOutcome, consume, frames};
pub use error::StreamError;
pub use event::{FeedEvent, FinalBelief, ReportEvent, TurnEvent, decode_frame};
