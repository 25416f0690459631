//! midir-backed transport
//!
//! Inbound buffers are pushed from midir's callback thread into a Tokio
//! channel without blocking; the session consumes them on its own task.

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{MidiSink, PortInfo, PortLister, INBOUND_CHANNEL_CAPACITY};
use crate::discovery::DeviceHandle;
use crate::error::TransportError;
use crate::midi::format_hex;

/// Port lister and connector backed by the platform MIDI API
pub struct MidirTransport {
    client_name: String,
}

impl MidirTransport {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn midi_in(&self, suffix: &str) -> Result<MidiInput, TransportError> {
        MidiInput::new(&format!("{}-{}", self.client_name, suffix))
            .map_err(|e| TransportError::Init(e.to_string()))
    }

    fn midi_out(&self, suffix: &str) -> Result<MidiOutput, TransportError> {
        MidiOutput::new(&format!("{}-{}", self.client_name, suffix))
            .map_err(|e| TransportError::Init(e.to_string()))
    }

    /// Open both sides of a paired device
    ///
    /// Returns the connection (the sink) and the receiver for raw inbound
    /// buffers. Dropping the connection closes both ports.
    pub fn connect(
        &self,
        device: &DeviceHandle,
    ) -> Result<(MidirConnection, mpsc::Receiver<Vec<u8>>), TransportError> {
        info!(
            "Connecting to {} - Input: '{}', Output: '{}'",
            device.name, device.input.name, device.output.name
        );

        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

        let mut midi_in = self.midi_in("input")?;
        // SysEx replies are the whole point, never filter them
        midi_in.ignore(Ignore::None);
        let in_port = locate(midi_in.ports(), |p| midi_in.port_name(p).ok(), &device.input)
            .ok_or_else(|| TransportError::PortNotFound(device.input.name.clone()))?;

        let input = midi_in
            .connect(
                &in_port,
                &self.client_name,
                move |_timestamp, data, _| {
                    if let Err(e) = tx.try_send(data.to_vec()) {
                        warn!("Dropped inbound MIDI ({}): {}", e, format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| TransportError::Connect {
                port: device.input.name.clone(),
                reason: e.to_string(),
            })?;

        let midi_out = self.midi_out("output")?;
        let out_port = locate(midi_out.ports(), |p| midi_out.port_name(p).ok(), &device.output)
            .ok_or_else(|| TransportError::PortNotFound(device.output.name.clone()))?;

        let output = midi_out
            .connect(&out_port, &self.client_name)
            .map_err(|e| TransportError::Connect {
                port: device.output.name.clone(),
                reason: e.to_string(),
            })?;

        info!("{} connected", device.name);

        Ok((
            MidirConnection {
                name: device.output.name.clone(),
                _input: input,
                output: Mutex::new(output),
            },
            rx,
        ))
    }
}

impl PortLister for MidirTransport {
    fn input_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        let midi_in = self.midi_in("scanner")?;
        let ports = midi_in.ports();
        Ok(ports
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_in.port_name(port).ok().map(|name| PortInfo::new(index, name))
            })
            .collect())
    }

    fn output_ports(&self) -> Result<Vec<PortInfo>, TransportError> {
        let midi_out = self.midi_out("scanner")?;
        let ports = midi_out.ports();
        Ok(ports
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_out.port_name(port).ok().map(|name| PortInfo::new(index, name))
            })
            .collect())
    }
}

/// Find a port again after enumeration
///
/// Prefers the same index if the name still matches, since indices shift
/// when devices are plugged in between listing and connecting.
fn locate<P: Clone>(
    ports: Vec<P>,
    name_of: impl Fn(&P) -> Option<String>,
    wanted: &PortInfo,
) -> Option<P> {
    if let Some(port) = ports.get(wanted.index) {
        if name_of(port).as_deref() == Some(wanted.name.as_str()) {
            return Some(port.clone());
        }
    }
    let found = ports
        .into_iter()
        .find(|p| name_of(p).as_deref() == Some(wanted.name.as_str()));
    if found.is_some() {
        debug!("Port '{}' moved from index {}", wanted.name, wanted.index);
    }
    found
}

/// Open input and output of one device
pub struct MidirConnection {
    name: String,
    _input: MidiInputConnection<()>,
    output: Mutex<MidiOutputConnection>,
}

impl MidiSink for MidirConnection {
    fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        self.output
            .lock()
            .send(data)
            .map_err(|e| TransportError::Send {
                len: data.len(),
                reason: e.to_string(),
            })?;
        debug!("Sent raw: {}", format_hex(data));
        Ok(())
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}
