//! MIDI message log
//!
//! Keeps a bounded history of inbound and outbound buffers with a short
//! human-readable summary of each, for the monitor and the editor status line.

use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fmt;

/// Default number of entries kept by a [`MessageLog`]
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Direction of a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::In => "←",
            Direction::Out => "→",
        }
    }
}

/// Coarse message type for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    SysEx,
    Note,
    Cc,
    Other,
}

impl MessageKind {
    pub fn of(data: &[u8]) -> Self {
        match data.first() {
            Some(0xF0) => MessageKind::SysEx,
            Some(status) => match status >> 4 {
                0x8 | 0x9 => MessageKind::Note,
                0xB => MessageKind::Cc,
                _ => MessageKind::Other,
            },
            None => MessageKind::Other,
        }
    }
}

/// A single logged buffer
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub direction: Direction,
    pub kind: MessageKind,
    pub port: String,
    pub data: Vec<u8>,
}

impl LogEntry {
    pub fn new(direction: Direction, port: &str, data: &[u8]) -> Self {
        Self {
            timestamp: Local::now(),
            direction,
            kind: MessageKind::of(data),
            port: port.to_string(),
            data: data.to_vec(),
        }
    }

    /// Short description: `Note 60 vel 100`, `CC 7 = 100`, `SysEx (10 bytes)`
    pub fn summary(&self) -> String {
        let d1 = self.data.get(1).copied().unwrap_or_default();
        let d2 = self.data.get(2).copied().unwrap_or_default();
        match self.kind {
            MessageKind::Note => format!("Note {} vel {}", d1, d2),
            MessageKind::Cc => format!("CC {} = {}", d1, d2),
            MessageKind::SysEx => format!("SysEx ({} bytes)", self.data.len()),
            MessageKind::Other => format_hex(&self.data),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} | {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.direction.arrow(),
            self.port,
            self.summary()
        )
    }
}

/// Bounded message history, oldest entries dropped first
#[derive(Debug, Clone)]
pub struct MessageLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl MessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn record(&mut self, direction: Direction, port: &str, data: &[u8]) {
        self.push(LogEntry::new(direction, port, data));
    }

    /// Most recent entry, for the status line
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
