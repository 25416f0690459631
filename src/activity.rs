//! Activity tracking for live control highlighting
//!
//! Classifies inbound channel messages, maps them back to the control that
//! produced them, and keeps that control "lit" for a hold window after the
//! last matching message. Only one control is active at a time.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::model::{Configuration, KnobMode, PadMode};

/// Default hold window for an active control
pub const DEFAULT_HOLD: Duration = Duration::from_millis(1000);

/// Control currently being operated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveControl {
    Keys,
    Knob(usize),
    Pad(usize),
    Button(usize),
}

impl ActiveControl {
    pub fn entity(&self) -> &'static str {
        match self {
            ActiveControl::Keys => "keys",
            ActiveControl::Knob(_) => "knob",
            ActiveControl::Pad(_) => "pad",
            ActiveControl::Button(_) => "button",
        }
    }

    /// Zero-based index, `None` for the keybed
    pub fn index(&self) -> Option<usize> {
        match *self {
            ActiveControl::Keys => None,
            ActiveControl::Knob(i) | ActiveControl::Pad(i) | ActiveControl::Button(i) => Some(i),
        }
    }
}

impl fmt::Display for ActiveControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{} {}", self.entity(), i + 1),
            None => write!(f, "{}", self.entity()),
        }
    }
}

/// Live message class relevant for mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEvent {
    /// Note on or off (status 0x8n / 0x9n)
    Note { note: u8 },
    /// Control change (status 0xBn)
    ControlChange { controller: u8 },
    Unclassified,
}

/// Classify a live message by its status nibble
pub fn classify(data: &[u8]) -> LiveEvent {
    let (Some(&status), Some(&data1)) = (data.first(), data.get(1)) else {
        return LiveEvent::Unclassified;
    };
    match status >> 4 {
        0x8 | 0x9 => LiveEvent::Note { note: data1 },
        0xB => LiveEvent::ControlChange { controller: data1 },
        _ => LiveEvent::Unclassified,
    }
}

/// Find the control that produced an event, first match wins
///
/// Control changes are checked against knobs in CC mode, then pads in
/// either CC mode, then buttons. Notes are checked against pads in note
/// mode and otherwise attributed to the keybed.
pub fn resolve(event: LiveEvent, config: &Configuration) -> Option<ActiveControl> {
    match event {
        LiveEvent::ControlChange { controller } => config
            .knobs
            .iter()
            .position(|k| k.mode == KnobMode::Cc && k.cc == controller)
            .map(ActiveControl::Knob)
            .or_else(|| {
                config
                    .pads
                    .iter()
                    .position(|p| p.mode.is_cc() && p.note_or_cc == controller)
                    .map(ActiveControl::Pad)
            })
            .or_else(|| {
                config
                    .buttons
                    .iter()
                    .position(|b| b.cc == controller)
                    .map(ActiveControl::Button)
            }),
        LiveEvent::Note { note } => Some(
            config
                .pads
                .iter()
                .position(|p| p.mode == PadMode::Note && p.note_or_cc == note)
                .map_or(ActiveControl::Keys, ActiveControl::Pad),
        ),
        LiveEvent::Unclassified => None,
    }
}

/// Deadline-driven activity state
///
/// Time is passed in explicitly, which keeps the expiry rules independent
/// of any runtime.
#[derive(Debug, Clone)]
pub struct ActivityState {
    active: Option<ActiveControl>,
    deadline: Option<Instant>,
    hold: Duration,
}

impl ActivityState {
    pub fn new(hold: Duration) -> Self {
        Self {
            active: None,
            deadline: None,
            hold,
        }
    }

    /// Make `control` active and restart the hold window from `now`
    pub fn record(&mut self, control: ActiveControl, now: Instant) -> Instant {
        let deadline = now + self.hold;
        self.active = Some(control);
        self.deadline = Some(deadline);
        deadline
    }

    /// Clear the state if its deadline has passed. Returns true when cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.active = None;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Active control as of `now`
    pub fn current(&self, now: Instant) -> Option<ActiveControl> {
        match self.deadline {
            Some(deadline) if now < deadline => self.active,
            _ => None,
        }
    }
}

/// Activity state with a real expiry timer
///
/// Changes are published on a watch channel. Each new activity aborts the
/// pending timer task and spawns a fresh one, so a stream of messages from
/// the same control keeps it lit. Must be used from within a Tokio runtime.
pub struct ActivityTracker {
    state: Arc<Mutex<ActivityState>>,
    tx: Arc<watch::Sender<Option<ActiveControl>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityTracker {
    pub fn new(hold: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Arc::new(Mutex::new(ActivityState::new(hold))),
            tx: Arc::new(tx),
            timer: Mutex::new(None),
        }
    }

    /// Receiver for activity changes (`None` = nothing active)
    pub fn subscribe(&self) -> watch::Receiver<Option<ActiveControl>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<ActiveControl> {
        self.state.lock().current(Instant::now())
    }

    /// Classify and map a live message; unmatched messages leave the state alone
    pub fn observe(&self, data: &[u8], config: &Configuration) -> Option<ActiveControl> {
        let event = classify(data);
        let control = resolve(event, config);
        match control {
            Some(control) => self.activate(control),
            None => trace!("No control matches {:?}", event),
        }
        control
    }

    /// Mark a control active and restart the expiry timer
    pub fn activate(&self, control: ActiveControl) {
        let deadline = self.state.lock().record(control, Instant::now());

        self.tx.send_if_modified(|current| {
            if *current == Some(control) {
                false
            } else {
                *current = Some(control);
                true
            }
        });

        let state = self.state.clone();
        let tx = self.tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if state.lock().expire(Instant::now()) {
                debug!("Activity expired: {}", control);
                tx.send_replace(None);
            }
        });

        if let Some(previous) = self.timer.lock().replace(timer) {
            previous.abort();
        }
    }
}

impl Drop for ActivityTracker {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}
