use std::str::Utf8Error;

use packed_struct::PackingError;

/// When things go awry
#[derive(Debug, thiserror::Error)]
pub enum HollerError {
    /// A datagram that doesn't survive the wire codec, always swallowed at
    /// the receive site.
    #[error("Failed to parse packet: {0}")]
    Parse(String),
    #[error("Failed to pack bytes: {0}")]
    BytePacking(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The OS rejected a bind, fatal only when no family survives.
    #[error("Failed to bind socket: {0}")]
    SocketBindFailed(std::io::Error),
    #[error("Failed to join multicast group: {0}")]
    JoinFailed(std::io::Error),
    #[error("Failed to send datagram: {0}")]
    SendFailed(std::io::Error),
    #[error("Failed to receive datagram: {0}")]
    RecvFailed(std::io::Error),
    /// Neither the IPv4 nor the IPv6 socket could be set up.
    #[error("No usable socket")]
    NoSocket,
    #[error("Responder is already running")]
    AlreadyRunning,
    #[error("Responder is not running")]
    NotRunning,
    #[error("Operation on a closed browser")]
    Closed,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UTF8 error: {0}")]
    Utf8(#[from] Utf8Error),
}

impl From<PackingError> for HollerError {
    fn from(error: PackingError) -> Self {
        HollerError::BytePacking(error.to_string())
    }
}

impl From<config::ConfigError> for HollerError {
    fn from(error: config::ConfigError) -> Self {
        HollerError::Config(error.to_string())
    }
}
