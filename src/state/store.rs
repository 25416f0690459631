//! StateStore - canonical in-memory V49 configuration with subscription support
//!
//! Holds at most one configuration, applies partial edits, and notifies
//! subscribers synchronously after every write.

use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use crate::error::StateError;
use crate::model::{
    ButtonUpdate, Configuration, KeysUpdate, KnobUpdate, ModWheelUpdate, PadUpdate,
    PitchWheelUpdate, SustainUpdate, BUTTON_COUNT, KNOB_COUNT, PAD_COUNT,
};

type ListenerFn = Arc<dyn Fn(&Configuration) + Send + Sync>;

/// Subscriber id
pub type SubscriptionId = u64;

#[derive(Default)]
struct Listeners {
    next_id: SubscriptionId,
    /// Ordered by id, so notification follows registration order
    by_id: BTreeMap<SubscriptionId, ListenerFn>,
}

/// Handle returned by [`StateStore::subscribe`]
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: SubscriptionId,
    listeners: Weak<RwLock<Listeners>>,
}

impl Subscription {
    /// Deregister this listener. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if listeners.write().by_id.remove(&self.id).is_some() {
                trace!("Unsubscribed listener {}", self.id);
            }
        }
    }
}

/// Stores the controller configuration and notifies subscribers on writes
///
/// Writes are serialized by a reentrant gate held through notification, so
/// listeners see writes in commit order. A listener that writes back into
/// the store re-enters the gate on the same thread and its write is
/// notified depth-first.
#[derive(Clone)]
pub struct StateStore {
    config: Arc<RwLock<Option<Configuration>>>,
    listeners: Arc<RwLock<Listeners>>,
    write_gate: Arc<ReentrantMutex<()>>,
}

fn check_index(entity: &'static str, index: usize, len: usize) -> Result<(), StateError> {
    if index >= len {
        return Err(StateError::IndexOutOfRange { entity, index, len });
    }
    Ok(())
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            listeners: Arc::new(RwLock::new(Listeners::default())),
            write_gate: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// Snapshot of the current configuration
    pub fn get(&self) -> Option<Configuration> {
        *self.config.read()
    }

    pub fn is_initialized(&self) -> bool {
        self.config.read().is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().by_id.len()
    }

    /// Replace the configuration wholesale and notify subscribers
    ///
    /// Values that would not survive an encode are rejected and the held
    /// configuration is left as it was.
    pub fn set(&self, config: Configuration) -> Result<(), StateError> {
        config.validate()?;
        let _gate = self.write_gate.lock();
        *self.config.write() = Some(config);
        debug!("Configuration replaced");
        self.notify(&config);
        Ok(())
    }

    /// Apply an edit to a copy, validate it, then commit and notify
    fn modify<F>(&self, edit: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut Configuration) -> Result<(), StateError>,
    {
        let _gate = self.write_gate.lock();
        let mut next = self.get().ok_or(StateError::Uninitialized)?;
        edit(&mut next)?;
        next.validate()?;
        *self.config.write() = Some(next);
        self.notify(&next);
        Ok(())
    }

    pub fn update_keys(&self, update: KeysUpdate) -> Result<(), StateError> {
        self.modify(|config| {
            update.apply(&mut config.keys);
            Ok(())
        })
    }

    pub fn update_pitch_wheel(&self, update: PitchWheelUpdate) -> Result<(), StateError> {
        self.modify(|config| {
            update.apply(&mut config.pitch_wheel);
            Ok(())
        })
    }

    pub fn update_mod_wheel(&self, update: ModWheelUpdate) -> Result<(), StateError> {
        self.modify(|config| {
            update.apply(&mut config.mod_wheel);
            Ok(())
        })
    }

    pub fn update_sustain(&self, update: SustainUpdate) -> Result<(), StateError> {
        self.modify(|config| {
            update.apply(&mut config.sustain);
            Ok(())
        })
    }

    pub fn update_knob(&self, index: usize, update: KnobUpdate) -> Result<(), StateError> {
        self.modify(|config| {
            check_index("knob", index, KNOB_COUNT)?;
            update.apply(&mut config.knobs[index]);
            Ok(())
        })
    }

    pub fn update_pad(&self, index: usize, update: PadUpdate) -> Result<(), StateError> {
        self.modify(|config| {
            check_index("pad", index, PAD_COUNT)?;
            update.apply(&mut config.pads[index]);
            Ok(())
        })
    }

    pub fn update_button(&self, index: usize, update: ButtonUpdate) -> Result<(), StateError> {
        self.modify(|config| {
            check_index("button", index, BUTTON_COUNT)?;
            update.apply(&mut config.buttons[index]);
            Ok(())
        })
    }

    /// Register a listener invoked after every future write
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Configuration) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.write();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.by_id.insert(id, Arc::new(listener));
        trace!("Subscribed listener {}", id);

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    fn notify(&self, config: &Configuration) {
        // Release the lock before calling out so listeners may (un)subscribe
        let listeners: Vec<ListenerFn> = self.listeners.read().by_id.values().cloned().collect();
        for listener in listeners {
            listener(config);
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
