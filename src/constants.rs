//! Protocol constants for the KMTronic RS-485 relay chain.
//!
//! This module defines all the constants used on the relay wire protocol,
//! including frame bytes, chain limits, timing parameters, and serial port
//! configuration defaults.

/// Start-of-frame marker, first byte of every command frame
pub const FRAME_SOH: u8 = 0xFF;

/// State byte that energizes a relay
pub const FRAME_RELAY_ON: u8 = 0x01;

/// State byte that de-energizes a relay
pub const FRAME_RELAY_OFF: u8 = 0x00;

/// Length of one command frame in bytes
pub const FRAME_LENGTH: usize = 3;

/// Relays carried by a single board
pub const MAX_RELAYS_PER_BOARD: u8 = 8;

/// Boards addressable on one RS-485 chain
pub const MAX_BOARDS_IN_CHAIN: u8 = 15;

/// Highest valid relay index on a chain
pub const MAX_RELAYS_IN_CHAIN: u8 = MAX_RELAYS_PER_BOARD * MAX_BOARDS_IN_CHAIN;

/// Lowest valid relay index (relays are 1-based on the wire)
pub const MIN_RELAY_NUMBER: u8 = 1;

/// Default baud rate (9600 bps)
pub const BAUD_RATE_DEFAULT: u32 = 9600;

/// Default COM port number when none is supplied
pub const COM_PORT_DEFAULT: u8 = 7;

/// Attempts allowed when locating the device at startup
pub const MAX_LOCATE_TRIES: u32 = 50;

/// Attempts allowed when opening the port before a transmit phase
pub const MAX_OPEN_TRIES: u32 = 50;

/// Attempts allowed when closing the port after a transmit phase
pub const MAX_CLOSE_TRIES: u32 = 50;

/// Backoff between open/close/locate retries, in milliseconds
pub const RETRY_BACKOFF_MS: u64 = 50;

/// Sleep slice while waiting out a pulse, in milliseconds
pub const WAIT_SLICE_MS: u64 = 5;

/// Read inter-byte timeout, in milliseconds
pub const TIMEOUT_INTERVAL_MS: u64 = 50;

/// Fixed part of the total transfer timeout, in milliseconds
pub const TIMEOUT_CONSTANT_MS: u64 = 50;

/// Per-byte part of the total transfer timeout, in milliseconds
pub const TIMEOUT_MULTIPLIER_MS: u64 = 10;
