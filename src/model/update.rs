//! Partial updates for configuration sub-entities
//!
//! Each update carries only the fields the user touched; `apply` leaves the
//! rest of the target untouched.

use super::types::*;

fn merge<T: Copy>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeysUpdate {
    pub base_note: Option<u8>,
    pub octave: Option<u8>,
    pub channel: Option<u8>,
    pub velocity_curve: Option<u8>,
}

impl KeysUpdate {
    pub fn apply(&self, keys: &mut KeysConfig) {
        merge(&mut keys.base_note, self.base_note);
        merge(&mut keys.octave, self.octave);
        merge(&mut keys.channel, self.channel);
        merge(&mut keys.velocity_curve, self.velocity_curve);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PitchWheelUpdate {
    pub channel: Option<u8>,
}

impl PitchWheelUpdate {
    pub fn apply(&self, wheel: &mut PitchWheelConfig) {
        merge(&mut wheel.channel, self.channel);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModWheelUpdate {
    pub channel: Option<u8>,
    pub cc: Option<u8>,
    pub min: Option<u8>,
    pub max: Option<u8>,
}

impl ModWheelUpdate {
    pub fn apply(&self, wheel: &mut ModWheelConfig) {
        merge(&mut wheel.channel, self.channel);
        merge(&mut wheel.cc, self.cc);
        merge(&mut wheel.min, self.min);
        merge(&mut wheel.max, self.max);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SustainUpdate {
    pub cc: Option<u8>,
    pub min: Option<u8>,
    pub max: Option<u8>,
    pub channel: Option<u8>,
}

impl SustainUpdate {
    pub fn apply(&self, sustain: &mut SustainConfig) {
        merge(&mut sustain.cc, self.cc);
        merge(&mut sustain.min, self.min);
        merge(&mut sustain.max, self.max);
        merge(&mut sustain.channel, self.channel);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KnobUpdate {
    pub mode: Option<KnobMode>,
    pub cc: Option<u8>,
    pub min: Option<u8>,
    pub max: Option<u8>,
    pub channel: Option<u8>,
}

impl KnobUpdate {
    pub fn apply(&self, knob: &mut KnobConfig) {
        merge(&mut knob.mode, self.mode);
        merge(&mut knob.cc, self.cc);
        merge(&mut knob.min, self.min);
        merge(&mut knob.max, self.max);
        merge(&mut knob.channel, self.channel);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PadUpdate {
    pub mode: Option<PadMode>,
    pub note_or_cc: Option<u8>,
    pub fixed_or_min: Option<u8>,
    pub velocity_or_max: Option<u8>,
    pub channel: Option<u8>,
}

impl PadUpdate {
    pub fn apply(&self, pad: &mut PadConfig) {
        merge(&mut pad.mode, self.mode);
        merge(&mut pad.note_or_cc, self.note_or_cc);
        merge(&mut pad.fixed_or_min, self.fixed_or_min);
        merge(&mut pad.velocity_or_max, self.velocity_or_max);
        merge(&mut pad.channel, self.channel);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonUpdate {
    pub mode: Option<ButtonMode>,
    pub cc: Option<u8>,
    pub on: Option<u8>,
    pub off: Option<u8>,
    pub channel: Option<u8>,
}

impl ButtonUpdate {
    pub fn apply(&self, button: &mut ButtonConfig) {
        merge(&mut button.mode, self.mode);
        merge(&mut button.cc, self.cc);
        merge(&mut button.on, self.on);
        merge(&mut button.off, self.off);
        merge(&mut button.channel, self.channel);
    }
}
