//! Editor session
//!
//! Ties the framer, codec, state store, activity tracker and message log to
//! one connected device. Inbound buffers are fed in by whoever owns the
//! transport receiver; outbound frames go through the session's sink.

use std::time::Duration;
use tracing::{debug, info, trace};

use crate::activity::{ActiveControl, ActivityTracker};
use crate::error::{SessionError, StateError};
use crate::midi::{format_hex, Direction, MessageLog};
use crate::model::{self, Configuration};
use crate::state::StateStore;
use crate::sysex::{self, Command};
use crate::transport::MidiSink;

/// What an inbound buffer turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Configuration reply, now held by the store
    Config(Configuration),
    /// Live performance message and the control it maps to, if any
    Live(Option<ActiveControl>),
    /// Echoes, foreign SysEx, or live messages before a configuration is known
    Ignored,
}

pub struct EditorSession<S: MidiSink> {
    sink: S,
    store: StateStore,
    activity: ActivityTracker,
    log: MessageLog,
}

impl<S: MidiSink> EditorSession<S> {
    pub fn new(sink: S, hold: Duration, log_capacity: usize) -> Self {
        Self {
            sink,
            store: StateStore::new(),
            activity: ActivityTracker::new(hold),
            log: MessageLog::new(log_capacity),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut MessageLog {
        &mut self.log
    }

    pub fn port_name(&self) -> &str {
        self.sink.port_name()
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), SessionError> {
        self.sink.send(frame)?;
        self.log.record(Direction::Out, self.sink.port_name(), frame);
        Ok(())
    }

    /// Ask the device for its current configuration
    pub fn request_config(&mut self) -> Result<(), SessionError> {
        debug!("Requesting configuration from {}", self.sink.port_name());
        self.send(&sysex::build_query())
    }

    /// Encode the held configuration and send it to the device
    pub fn push_config(&mut self) -> Result<(), SessionError> {
        let config = self.store.get().ok_or(StateError::Uninitialized)?;
        let frame = sysex::build_set(&model::encode(&config))?;
        self.send(&frame)?;
        info!("Configuration sent to {}", self.sink.port_name());
        Ok(())
    }

    /// Route one inbound buffer
    ///
    /// A reply that fails to decode leaves the store untouched and the
    /// error is returned to the caller.
    pub fn handle_inbound(&mut self, data: &[u8]) -> Result<Inbound, SessionError> {
        self.log.record(Direction::In, self.sink.port_name(), data);

        if !sysex::is_frame(data) {
            let Some(config) = self.store.get() else {
                trace!("Live message before configuration: {}", format_hex(data));
                return Ok(Inbound::Ignored);
            };
            return Ok(Inbound::Live(self.activity.observe(data, &config)));
        }

        if !sysex::is_vendor_envelope(data) {
            debug!("Ignoring foreign SysEx: {}", format_hex(data));
            return Ok(Inbound::Ignored);
        }

        let envelope = sysex::parse_envelope(data)?;
        match envelope.command {
            Command::Reply => {
                let config = model::decode(envelope.payload)?;
                self.store.set(config)?;
                info!("Configuration received ({} bytes)", data.len());
                Ok(Inbound::Config(config))
            }
            Command::Query | Command::Set => {
                debug!("Ignoring echoed {:?}: {}", envelope.command, format_hex(data));
                Ok(Inbound::Ignored)
            }
        }
    }
}
