//! Command frame encoding for the relay wire protocol.
//!
//! Every command addressed to one relay is exactly three bytes:
//! `[0xFF, relay_index, state]` where the state byte is `0x01` to energize
//! and `0x00` to de-energize. A batch is the concatenation of one frame per
//! relay in a selection, with no separators, in selection order.

use std::fmt;
use std::str::FromStr;

use crate::constants::{FRAME_LENGTH, FRAME_RELAY_OFF, FRAME_RELAY_ON, FRAME_SOH};
use crate::error::RelayError;

/// Logical state a relay can be driven to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Relay energized
    On,
    /// Relay de-energized
    Off,
}

impl RelayState {
    /// Wire representation of the state, third byte of the frame.
    pub fn state_byte(self) -> u8 {
        match self {
            RelayState::On => FRAME_RELAY_ON,
            RelayState::Off => FRAME_RELAY_OFF,
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::On => write!(f, "ON"),
            RelayState::Off => write!(f, "OFF"),
        }
    }
}

impl FromStr for RelayState {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(RelayState::On),
            "off" => Ok(RelayState::Off),
            other => Err(RelayError::BadState(other.to_string())),
        }
    }
}

/// Encode the command frame for a single relay.
///
/// `relay` must already be a valid chain index (1..=120); the selection
/// parser enforces that before anything reaches the codec.
pub fn encode(relay: u8, state: RelayState) -> [u8; FRAME_LENGTH] {
    [FRAME_SOH, relay, state.state_byte()]
}

/// Encode the frames for a whole selection into one contiguous batch.
///
/// The result is `FRAME_LENGTH * selection.len()` bytes, frames in the same
/// order as the selection. Order is observable on the wire.
pub fn encode_batch(selection: &[u8], state: RelayState) -> Vec<u8> {
    let mut batch = Vec::with_capacity(FRAME_LENGTH * selection.len());
    for &relay in selection {
        batch.extend_from_slice(&encode(relay, state));
    }
    batch
}
