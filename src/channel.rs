//! Serial connection lifecycle for the relay chain.
//!
//! A [`SerialChannel`] owns the one OS handle to the RS-485 adapter. The
//! device is located once at startup with [`SerialChannel::locate`]; after
//! that the port is opened, written and closed around every transmit phase
//! rather than held open, so a possibly shared device is occupied for as
//! little time as possible. Open and close are retried with a fixed backoff,
//! bounded by the caller.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortBuilder, StopBits};

use crate::constants::{
    BAUD_RATE_DEFAULT, FRAME_LENGTH, RETRY_BACKOFF_MS, TIMEOUT_CONSTANT_MS, TIMEOUT_INTERVAL_MS,
    TIMEOUT_MULTIPLIER_MS,
};
use crate::error::{RelayError, Result};

/// UART parameters negotiated with the OS when the port is opened.
///
/// Only the baud rate is externally configurable; the relay boards speak
/// 8N1 and the timeout parameters are fixed device constants.
#[derive(Debug, Clone)]
pub struct SerialConnectionConfig {
    /// Baud rate, 9600 by default
    pub baud_rate: u32,
    /// Data bits per character (8)
    pub data_bits: DataBits,
    /// Stop bits (1)
    pub stop_bits: StopBits,
    /// Parity (none)
    pub parity: Parity,
    /// Read inter-byte timeout in milliseconds. Part of the negotiated
    /// parameter set; this program never reads, so only the write deadline
    /// below is ever armed.
    pub timeout_interval_ms: u64,
    /// Fixed part of the total transfer deadline, in milliseconds
    pub timeout_constant_ms: u64,
    /// Per-byte part of the total transfer deadline, in milliseconds
    pub timeout_multiplier_ms: u64,
}

impl Default for SerialConnectionConfig {
    fn default() -> Self {
        SerialConnectionConfig {
            baud_rate: BAUD_RATE_DEFAULT,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            timeout_interval_ms: TIMEOUT_INTERVAL_MS,
            timeout_constant_ms: TIMEOUT_CONSTANT_MS,
            timeout_multiplier_ms: TIMEOUT_MULTIPLIER_MS,
        }
    }
}

impl SerialConnectionConfig {
    /// Default parameters with a different baud rate.
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        SerialConnectionConfig {
            baud_rate,
            ..SerialConnectionConfig::default()
        }
    }

    /// Deadline for transferring `len` bytes: the fixed constant plus the
    /// per-byte multiplier.
    pub fn total_timeout(&self, len: usize) -> Duration {
        Duration::from_millis(self.timeout_constant_ms + self.timeout_multiplier_ms * len as u64)
    }
}

/// Map a COM port number to the platform device path.
pub fn device_path(com_port: u8) -> String {
    #[cfg(windows)]
    {
        format!(r"\\.\COM{com_port}")
    }
    #[cfg(not(windows))]
    {
        format!("/dev/ttyUSB{com_port}")
    }
}

/// Run `operation` until it reports success, sleeping `backoff` after every
/// failed attempt, up to `max_tries` attempts. Each failure is logged with
/// the `what` label.
pub fn with_retry<F>(mut operation: F, what: &str, max_tries: u32, backoff: Duration) -> bool
where
    F: FnMut() -> bool,
{
    for attempt in 1..=max_tries {
        if operation() {
            return true;
        }
        warn!("Try {attempt}/{max_tries}: unable to {what}");
        thread::sleep(backoff);
    }
    false
}

/// Port operations the pulse engine drives.
///
/// [`SerialChannel`] is the production implementation; tests substitute a
/// scripted one.
pub trait Channel {
    /// Acquire exclusive access to the port, retrying up to `max_tries` times.
    fn try_open(&mut self, max_tries: u32) -> bool;
    /// Write a full batch to the port.
    fn send(&mut self, bytes: &[u8]) -> bool;
    /// Flush and release the port, retrying up to `max_tries` times.
    fn try_close(&mut self, max_tries: u32) -> bool;
}

/// One serial connection to the relay chain.
///
/// Holds the device path and connection parameters for the whole run and the
/// OS handle only while a transmit phase is in flight. Dropping the channel
/// releases any handle still held.
#[derive(Debug)]
pub struct SerialChannel {
    path: String,
    config: SerialConnectionConfig,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialChannel {
    /// Locate the relay chain on the given COM port.
    ///
    /// Probes the device up to `max_tries` times with a fixed backoff. A
    /// successful probe negotiates the connection parameters against the OS
    /// and immediately releases the handle: it establishes that the device
    /// exists and is configurable without holding it open. Exhausting the
    /// attempts is the one unrecoverable error in the core; the caller
    /// cannot proceed without a device.
    pub fn locate(com_port: u8, config: SerialConnectionConfig, max_tries: u32) -> Result<Self> {
        Self::locate_path(device_path(com_port), config, max_tries)
    }

    fn locate_path(path: String, config: SerialConnectionConfig, max_tries: u32) -> Result<Self> {
        let mut channel = SerialChannel {
            path,
            config,
            port: None,
        };
        let label = format!("open serial port {}", channel.path);
        if !with_retry(
            || channel.open(),
            &label,
            max_tries,
            Duration::from_millis(RETRY_BACKOFF_MS),
        ) {
            return Err(RelayError::DeviceNotFound {
                path: channel.path,
                tries: max_tries,
            });
        }
        info!("Located relay chain on {}", channel.path);
        // Parameters are negotiated; release the probe handle until the
        // first transmit phase needs the port.
        channel.port = None;
        Ok(channel)
    }

    /// Device path this channel talks to.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn builder(&self) -> SerialPortBuilder {
        serialport::new(self.path.clone(), self.config.baud_rate)
            .data_bits(self.config.data_bits)
            .stop_bits(self.config.stop_bits)
            .parity(self.config.parity)
            .flow_control(FlowControl::None)
            .timeout(self.config.total_timeout(FRAME_LENGTH))
    }

    /// Acquire exclusive access to the device.
    ///
    /// Serial ports are not shareable; returns false rather than erroring
    /// when the device is currently unavailable, so call sites can retry.
    pub fn open(&mut self) -> bool {
        match self.builder().open() {
            Ok(port) => {
                self.port = Some(port);
                true
            }
            Err(_) => false,
        }
    }

    /// Flush buffered output and release the handle.
    ///
    /// On a flush failure the handle is retained and false returned, so a
    /// retry can still complete the close.
    pub fn close(&mut self) -> bool {
        let Some(port) = self.port.as_mut() else {
            return true;
        };
        if let Err(err) = port.flush() {
            warn!("Unable to flush {}: {err}", self.path);
            return false;
        }
        self.port = None;
        true
    }

    /// [`open`](Self::open) with bounded retries and a fixed backoff.
    pub fn try_open(&mut self, max_tries: u32) -> bool {
        let label = format!("open port {}", self.path);
        with_retry(
            || self.open(),
            &label,
            max_tries,
            Duration::from_millis(RETRY_BACKOFF_MS),
        )
    }

    /// [`close`](Self::close) with bounded retries and a fixed backoff.
    pub fn try_close(&mut self, max_tries: u32) -> bool {
        let label = format!("close port {}", self.path);
        with_retry(
            || self.close(),
            &label,
            max_tries,
            Duration::from_millis(RETRY_BACKOFF_MS),
        )
    }

    /// Write the full byte sequence to the port.
    ///
    /// Loops on partial writes until the whole length is on the wire or the
    /// OS reports an unrecoverable error. There is no retry of the send as a
    /// whole; a short result after the loop is a failure.
    pub fn send(&mut self, bytes: &[u8]) -> bool {
        let Some(port) = self.port.as_mut() else {
            error!("Attempted to send on a closed port {}", self.path);
            return false;
        };
        if let Err(err) = port.set_timeout(self.config.total_timeout(bytes.len())) {
            warn!("Could not arm write deadline on {}: {err}", self.path);
        }
        let mut written = 0;
        while written < bytes.len() {
            match port.write(&bytes[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!("Error writing to {}: {err}", self.path);
                    break;
                }
            }
        }
        if written != bytes.len() {
            error!(
                "Incomplete message written to {} ({written} of {} bytes)",
                self.path,
                bytes.len()
            );
            return false;
        }
        true
    }
}

impl Channel for SerialChannel {
    fn try_open(&mut self, max_tries: u32) -> bool {
        SerialChannel::try_open(self, max_tries)
    }

    fn send(&mut self, bytes: &[u8]) -> bool {
        SerialChannel::send(self, bytes)
    }

    fn try_close(&mut self, max_tries: u32) -> bool {
        SerialChannel::try_close(self, max_tries)
    }
}
