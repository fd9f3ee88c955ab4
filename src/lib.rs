//! # Relay Manager
//!
//! A Rust library for driving chains of KMTronic relay boards attached
//! through an RS-485-to-serial adapter. Each relay is commanded with a fixed
//! 3-byte frame; the library builds the frames, manages the serial
//! connection with bounded retries, and times the open duration of one or
//! more pulses.
//!
//! ## Features
//!
//! - Encode single-relay frames and multi-relay batches (`FF <relay> <01|00>`)
//! - Locate the adapter on a COM port with bounded, backed-off probing
//! - Open/send/close the port around every transmit phase, never holding it
//! - Timed pulses (energize, hold, de-energize, repeated) or direct state sets
//! - Parse the relay set notations `4`, `4:10` and `2,7,11`
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use relay_manager::{
//!     Behavior, PulseController, RunConfig, SerialChannel, SerialConnectionConfig,
//! };
//! use relay_manager::constants::MAX_LOCATE_TRIES;
//!
//! fn main() -> relay_manager::Result<()> {
//!     let channel = SerialChannel::locate(7, SerialConnectionConfig::default(), MAX_LOCATE_TRIES)?;
//!     let config = RunConfig {
//!         relays: vec![2, 7],
//!         behavior: Behavior::Pulse {
//!             open_time: Duration::from_millis(500),
//!             impulses: 2,
//!         },
//!     };
//!     PulseController::new(channel, &config).run()
//! }
//! ```

pub mod channel;
pub mod constants;
pub mod error;
pub mod frame;
pub mod pulse;
pub mod selection;

pub use channel::{device_path, with_retry, Channel, SerialChannel, SerialConnectionConfig};
pub use error::{RelayError, Result};
pub use frame::{encode, encode_batch, RelayState};
pub use pulse::{Behavior, PulseController, RunConfig};
pub use selection::parse_selection;
