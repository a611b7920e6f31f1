//! # Playback Error Types
//!
//! Session-level errors plus the small result types of the buffer operations.
//!
//! The buffers themselves have exactly one failure mode: the session was shut
//! down while an operation was waiting. That is modelled by [`Shutdown`] and
//! by the `Shutdown` variants of the non-blocking results, never by
//! [`PlaybackError`].

use bridge_traits::BridgeError;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while starting or stopping a playback session.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A setting is out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration or wiring was rejected by the runtime layer.
    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// A collaborator failed outside of a worker loop.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Thread Errors
    // ========================================================================
    /// The OS refused to spawn a worker thread.
    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked before it could report.
    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(String),
}

/// Result type for playback session operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// A blocking push was rejected because the session is shutting down.
///
/// Carries the rejected item back to the producer, which disposes of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown<T>(pub T);

impl<T> Shutdown<T> {
    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for Shutdown<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("buffer is shutting down")
    }
}

impl<T: fmt::Debug> std::error::Error for Shutdown<T> {}

/// Failure of a non-blocking push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPushError<T> {
    /// No free slot right now.
    Full(T),
    /// The session is shutting down.
    Shutdown(T),
}

impl<T> TryPushError<T> {
    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            TryPushError::Full(item) | TryPushError::Shutdown(item) => item,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TryPushError::Full(_))
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, TryPushError::Shutdown(_))
    }
}

impl<T> fmt::Display for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPushError::Full(_) => f.write_str("buffer is full"),
            TryPushError::Shutdown(_) => f.write_str("buffer is shutting down"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for TryPushError<T> {}

/// Failure of a non-blocking pop.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPopError {
    /// Not enough buffered data right now.
    #[error("buffer is empty")]
    Empty,

    /// Nothing buffered and the session is shutting down.
    #[error("buffer is shutting down")]
    Shutdown,
}
