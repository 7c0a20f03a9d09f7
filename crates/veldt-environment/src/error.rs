//! Error types for the environment binary.
//!
//! [`EnvironmentError`] is the top-level error type that wraps the
//! failure modes of environment startup. Once the tick loop is running
//! there is nothing left to propagate: transport and process faults are
//! logged and absorbed where they occur.

/// Top-level error for the environment binary.
///
/// Each variant wraps a specific startup failure, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: veldt_core::ConfigError,
    },

    /// The worker listener could not be bound.
    #[error("failed to bind worker listener on {endpoint}: {source}")]
    Bind {
        /// The endpoint the listener was asked for.
        endpoint: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The worker binary could not be located.
    #[error("failed to locate agent binary: {source}")]
    AgentBinary {
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
