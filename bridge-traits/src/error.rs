use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// A single packet or frame could not be decoded; the stream itself is
    /// still usable.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The media container or codec cannot be used at all.
    #[error("Unsupported media: {0}")]
    Unsupported(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` if the caller may skip the failed item and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BridgeError::Decode(_) | BridgeError::Device(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
