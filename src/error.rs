use thiserror::Error;

/// Errors raised by the scan controller and its hosts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("No Bluetooth adapter found")]
    AdapterUnavailable,
    #[error("Receiver is not registered")]
    ReceiverNotRegistered,
    #[error("Discovery error: {0}")]
    Discovery(String),
    #[error("Host error: {0}")]
    Host(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
