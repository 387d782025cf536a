//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup, an experiment
//! run, and a feed replay so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: cohort_core::config::ConfigError,
    },

    /// The experiment could not be built or run.
    #[error("experiment error: {source}")]
    Experiment {
        /// The underlying experiment error.
        #[from]
        source: cohort_core::ExperimentError,
    },

    /// An external persona file could not be used.
    #[error("persona import error: {source}")]
    Personas {
        /// The underlying population error.
        #[from]
        source: cohort_agents::PopulationError,
    },

    /// The live feed reported an error.
    #[error("feed error: {source}")]
    Feed {
        /// The underlying stream error.
        #[from]
        source: cohort_stream::StreamError,
    },

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that was tried.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Output could not be serialized.
    #[error("serialization error: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
