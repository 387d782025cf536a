//! Error types for the cohort-stream crate.

/// Errors surfaced by the live feed consumer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The feed reported an error; consumption stopped and is not retried.
    #[error("feed error: {message}")]
    Feed {
        /// The message carried by the feed's error event.
        message: String,
    },
}
