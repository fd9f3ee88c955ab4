//! Error types for relay chain operations.

use thiserror::Error;

use crate::frame::RelayState;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error types for relay chain control.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device never answered during startup probing; nothing was attempted
    #[error("No device found at {path} after {tries} attempts")]
    DeviceNotFound {
        /// Device path that was probed
        path: String,
        /// Number of open attempts made
        tries: u32,
    },

    /// Port could not be opened before transmitting a batch
    #[error("Could not open port before sending the {phase} batch")]
    OpenFailed {
        /// Relay state the aborted batch would have set
        phase: RelayState,
    },

    /// Port could not be closed after transmitting a batch
    #[error("Could not close port after sending the {phase} batch")]
    CloseFailed {
        /// Relay state the transmitted batch set
        phase: RelayState,
    },

    /// A batch was not fully written to the port
    #[error("Failed to transmit the {phase} batch")]
    SendFailed {
        /// Relay state the aborted batch would have set
        phase: RelayState,
    },

    /// Relay index outside the addressable chain
    #[error("Relay number {value} is out of range ({min}..={max})", min = crate::constants::MIN_RELAY_NUMBER, max = crate::constants::MAX_RELAYS_IN_CHAIN)]
    InvalidRelayNumber {
        /// Offending relay number as written
        value: u32,
    },

    /// Range notation with end not above begin
    #[error("Wrong range order: final relay ({end}) must be higher than first relay ({begin})")]
    BadRange {
        /// First relay of the range
        begin: u8,
        /// Last relay of the range
        end: u8,
    },

    /// Relay set that matches none of the accepted notations
    #[error("Invalid relay set '{0}': expected a number, a n:m range, or a comma separated group")]
    BadSelection(String),

    /// Relay state string other than "on" or "off"
    #[error("Invalid relay state '{0}': only \"on\" or \"off\" are valid")]
    BadState(String),
}
