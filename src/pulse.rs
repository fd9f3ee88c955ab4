//! Pulse engine driving relay batches through the serial channel.
//!
//! A run is one or more cycles over a relay selection. In timed mode each
//! cycle energizes the relays, holds them for the configured open time, and
//! de-energizes them again; in direct mode a single batch sets the requested
//! terminal state once. The port is opened and closed around every batch,
//! never held across phases.

use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::channel::Channel;
use crate::constants::{MAX_CLOSE_TRIES, MAX_OPEN_TRIES, WAIT_SLICE_MS};
use crate::error::{RelayError, Result};
use crate::frame::{self, RelayState};

/// What a run should do to the selected relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Set the relays to one terminal state, once. No wait phase, no
    /// repetition.
    SetState(RelayState),
    /// Energize, hold, de-energize, `impulses` times. `open_time` is
    /// measured in wall-clock milliseconds on a monotonic timer, from the
    /// moment the ON batch finished transmitting.
    Pulse {
        /// How long the relays stay energized each cycle
        open_time: Duration,
        /// Number of open/close cycles to perform
        impulses: u32,
    },
}

/// Immutable description of one run, built once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Relay indices to drive, in wire order
    pub relays: Vec<u8>,
    /// What to do with them
    pub behavior: Behavior,
}

/// Drives open/send/close cycles over a relay selection.
pub struct PulseController<C: Channel> {
    channel: C,
    open_batch: Option<Vec<u8>>,
    close_batch: Option<Vec<u8>>,
    open_time: Option<Duration>,
    remaining: u32,
}

impl<C: Channel> PulseController<C> {
    /// Build the frame batches for `config` up front; they are reused across
    /// every cycle of the run.
    pub fn new(channel: C, config: &RunConfig) -> Self {
        let (open_batch, close_batch, open_time, remaining) = match config.behavior {
            Behavior::Pulse {
                open_time,
                impulses,
            } => (
                Some(frame::encode_batch(&config.relays, RelayState::On)),
                Some(frame::encode_batch(&config.relays, RelayState::Off)),
                Some(open_time),
                impulses,
            ),
            Behavior::SetState(RelayState::On) => (
                Some(frame::encode_batch(&config.relays, RelayState::On)),
                None,
                None,
                1,
            ),
            Behavior::SetState(RelayState::Off) => (
                None,
                Some(frame::encode_batch(&config.relays, RelayState::Off)),
                None,
                1,
            ),
        };
        if let Some(batch) = &open_batch {
            debug!("ON batch: {batch:02X?}");
        }
        if let Some(batch) = &close_batch {
            debug!("OFF batch: {batch:02X?}");
        }
        PulseController {
            channel,
            open_batch,
            close_batch,
            open_time,
            remaining,
        }
    }

    /// Run every cycle to completion.
    ///
    /// The first open, send or close failure aborts the whole run, not just
    /// the current cycle. There is no rollback: relays keep whatever state
    /// the completed phases established.
    pub fn run(&mut self) -> Result<()> {
        while self.remaining > 0 {
            let mut on_sent_at = None;
            if let Some(batch) = self.open_batch.as_deref() {
                on_sent_at = Some(Self::transmit(&mut self.channel, batch, RelayState::On)?);
            }
            if let (Some(open_time), Some(sent_at)) = (self.open_time, on_sent_at) {
                Self::wait_out(sent_at, open_time);
            }
            if let Some(batch) = self.close_batch.as_deref() {
                Self::transmit(&mut self.channel, batch, RelayState::Off)?;
            }
            self.remaining -= 1;
            debug!("Cycle complete, {} impulse(s) remaining", self.remaining);
        }
        Ok(())
    }

    /// One open/send/close triple for a batch. Returns the instant the batch
    /// finished transmitting, which anchors the wait phase.
    fn transmit(channel: &mut C, batch: &[u8], phase: RelayState) -> Result<Instant> {
        if !channel.try_open(MAX_OPEN_TRIES) {
            return Err(RelayError::OpenFailed { phase });
        }
        let sent = channel.send(batch);
        let sent_at = Instant::now();
        let closed = channel.try_close(MAX_CLOSE_TRIES);
        if !sent {
            // Close was still attempted above so the handle is not leaked.
            return Err(RelayError::SendFailed { phase });
        }
        if !closed {
            return Err(RelayError::CloseFailed { phase });
        }
        Ok(sent_at)
    }

    /// Sleep in small slices until `open_time` has elapsed since `since`,
    /// yielding the processor between checks instead of spinning.
    fn wait_out(since: Instant, open_time: Duration) {
        while since.elapsed() < open_time {
            thread::sleep(Duration::from_millis(WAIT_SLICE_MS));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Open,
        Send(Vec<u8>),
        Close,
    }

    /// Channel double recording every call, with programmable failures.
    #[derive(Default)]
    struct ScriptedChannel {
        events: Vec<Event>,
        sends: u32,
        fail_open: bool,
        fail_close: bool,
        /// 1-based ordinal of the send call that fails
        fail_send_at: Option<u32>,
    }

    impl Channel for ScriptedChannel {
        fn try_open(&mut self, _max_tries: u32) -> bool {
            if self.fail_open {
                return false;
            }
            self.events.push(Event::Open);
            true
        }

        fn send(&mut self, bytes: &[u8]) -> bool {
            self.sends += 1;
            self.events.push(Event::Send(bytes.to_vec()));
            self.fail_send_at != Some(self.sends)
        }

        fn try_close(&mut self, _max_tries: u32) -> bool {
            if self.fail_close {
                return false;
            }
            self.events.push(Event::Close);
            true
        }
    }

    fn controller(
        channel: ScriptedChannel,
        relays: &[u8],
        behavior: Behavior,
    ) -> PulseController<ScriptedChannel> {
        PulseController::new(
            channel,
            &RunConfig {
                relays: relays.to_vec(),
                behavior,
            },
        )
    }

    #[test]
    fn direct_on_sends_exactly_one_on_batch() {
        let mut ctl = controller(
            ScriptedChannel::default(),
            &[2, 7],
            Behavior::SetState(RelayState::On),
        );
        ctl.run().unwrap();
        assert_eq!(
            ctl.channel.events,
            vec![
                Event::Open,
                Event::Send(vec![0xFF, 0x02, 0x01, 0xFF, 0x07, 0x01]),
                Event::Close,
            ]
        );
    }

    #[test]
    fn direct_off_sends_exactly_one_off_batch() {
        let mut ctl = controller(
            ScriptedChannel::default(),
            &[4],
            Behavior::SetState(RelayState::Off),
        );
        ctl.run().unwrap();
        assert_eq!(
            ctl.channel.events,
            vec![
                Event::Open,
                Event::Send(vec![0xFF, 0x04, 0x00]),
                Event::Close,
            ]
        );
    }

    #[test]
    fn timed_mode_runs_both_batches_every_cycle() {
        let open_time = Duration::from_millis(30);
        let mut ctl = controller(
            ScriptedChannel::default(),
            &[4],
            Behavior::Pulse {
                open_time,
                impulses: 3,
            },
        );
        let start = Instant::now();
        ctl.run().unwrap();
        assert!(start.elapsed() >= open_time * 3);

        let events = &ctl.channel.events;
        assert_eq!(events.len(), 18);
        for cycle in events.chunks(6) {
            assert_eq!(cycle[0], Event::Open);
            assert_eq!(cycle[1], Event::Send(vec![0xFF, 0x04, 0x01]));
            assert_eq!(cycle[2], Event::Close);
            assert_eq!(cycle[3], Event::Open);
            assert_eq!(cycle[4], Event::Send(vec![0xFF, 0x04, 0x00]));
            assert_eq!(cycle[5], Event::Close);
        }
    }

    #[test]
    fn each_wait_lasts_at_least_the_open_time() {
        let open_time = Duration::from_millis(40);
        let mut ctl = controller(
            ScriptedChannel::default(),
            &[9],
            Behavior::Pulse {
                open_time,
                impulses: 2,
            },
        );
        let start = Instant::now();
        ctl.run().unwrap();
        assert!(start.elapsed() >= open_time * 2);
    }

    #[test]
    fn send_failure_mid_run_aborts_remaining_cycles() {
        let channel = ScriptedChannel {
            // Third send is the ON batch of cycle two.
            fail_send_at: Some(3),
            ..ScriptedChannel::default()
        };
        let mut ctl = controller(
            channel,
            &[4],
            Behavior::Pulse {
                open_time: Duration::from_millis(10),
                impulses: 3,
            },
        );
        let err = ctl.run().unwrap_err();
        assert!(matches!(
            err,
            RelayError::SendFailed {
                phase: RelayState::On
            }
        ));
        // One full cycle, then the aborted ON triple. Cycle three never ran.
        assert_eq!(ctl.channel.sends, 3);
        assert_eq!(ctl.channel.events.len(), 9);
        assert_eq!(ctl.remaining, 2);
    }

    #[test]
    fn open_failure_aborts_before_anything_is_sent() {
        let channel = ScriptedChannel {
            fail_open: true,
            ..ScriptedChannel::default()
        };
        let mut ctl = controller(channel, &[2, 3], Behavior::SetState(RelayState::On));
        let err = ctl.run().unwrap_err();
        assert!(matches!(
            err,
            RelayError::OpenFailed {
                phase: RelayState::On
            }
        ));
        assert_eq!(ctl.channel.sends, 0);
        assert!(ctl.channel.events.is_empty());
    }

    #[test]
    fn close_failure_aborts_the_run() {
        let channel = ScriptedChannel {
            fail_close: true,
            ..ScriptedChannel::default()
        };
        let mut ctl = controller(channel, &[5], Behavior::SetState(RelayState::Off));
        let err = ctl.run().unwrap_err();
        assert!(matches!(
            err,
            RelayError::CloseFailed {
                phase: RelayState::Off
            }
        ));
        assert_eq!(
            ctl.channel.events,
            vec![Event::Open, Event::Send(vec![0xFF, 0x05, 0x00])]
        );
    }

    #[test]
    fn zero_impulses_is_a_no_op() {
        let mut ctl = controller(
            ScriptedChannel::default(),
            &[1],
            Behavior::Pulse {
                open_time: Duration::from_millis(10),
                impulses: 0,
            },
        );
        ctl.run().unwrap();
        assert!(ctl.channel.events.is_empty());
    }
}
