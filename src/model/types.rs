//! V49 configuration type definitions
//!
//! Every field is a raw device byte. Range rules live in the codec so that
//! a decoded value and an edited value are checked the same way.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const KNOB_COUNT: usize = 4;
pub const PAD_COUNT: usize = 8;
pub const BUTTON_COUNT: usize = 4;

/// Enumerated mode byte of a control
pub trait ModeByte: Sized + Copy {
    /// Human-readable name of the mode family, used in error messages
    const KIND: &'static str;

    fn from_byte(value: u8) -> Option<Self>;
    fn to_byte(self) -> u8;
}

/// Knob output mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnobMode {
    #[default]
    Cc,
    Aftertouch,
}

impl ModeByte for KnobMode {
    const KIND: &'static str = "knob mode";

    fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(KnobMode::Cc),
            0x01 => Some(KnobMode::Aftertouch),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            KnobMode::Cc => 0x00,
            KnobMode::Aftertouch => 0x01,
        }
    }
}

/// Pad output mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    #[default]
    Note,
    ToggleCc,
    MomentaryCc,
}

impl PadMode {
    /// Pads in either CC mode send control changes instead of notes
    pub fn is_cc(self) -> bool {
        matches!(self, PadMode::ToggleCc | PadMode::MomentaryCc)
    }
}

impl ModeByte for PadMode {
    const KIND: &'static str = "pad mode";

    fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(PadMode::Note),
            0x01 => Some(PadMode::ToggleCc),
            0x02 => Some(PadMode::MomentaryCc),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            PadMode::Note => 0x00,
            PadMode::ToggleCc => 0x01,
            PadMode::MomentaryCc => 0x02,
        }
    }
}

/// Button behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonMode {
    #[default]
    Toggle,
    Momentary,
}

impl ModeByte for ButtonMode {
    const KIND: &'static str = "button mode";

    fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(ButtonMode::Toggle),
            0x01 => Some(ButtonMode::Momentary),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            ButtonMode::Toggle => 0x00,
            ButtonMode::Momentary => 0x01,
        }
    }
}

/// Parse error for mode names typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode '{}'", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for KnobMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cc" => Ok(KnobMode::Cc),
            "aftertouch" | "at" => Ok(KnobMode::Aftertouch),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

impl FromStr for PadMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "note" => Ok(PadMode::Note),
            "toggle_cc" | "toggle" => Ok(PadMode::ToggleCc),
            "momentary_cc" | "momentary" => Ok(PadMode::MomentaryCc),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

impl FromStr for ButtonMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toggle" => Ok(ButtonMode::Toggle),
            "momentary" => Ok(ButtonMode::Momentary),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Keybed settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysConfig {
    pub base_note: u8,
    /// Raw octave byte as stored by the device
    pub octave: u8,
    pub channel: u8,
    /// Raw velocity curve preset
    pub velocity_curve: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchWheelConfig {
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModWheelConfig {
    pub channel: u8,
    pub cc: u8,
    pub min: u8,
    pub max: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SustainConfig {
    pub cc: u8,
    pub min: u8,
    pub max: u8,
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnobConfig {
    pub mode: KnobMode,
    pub cc: u8,
    pub min: u8,
    pub max: u8,
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadConfig {
    pub mode: PadMode,
    /// Note number in note mode, controller number in CC modes
    pub note_or_cc: u8,
    /// Fixed velocity in note mode, off value in CC modes
    pub fixed_or_min: u8,
    /// Velocity curve in note mode, on value in CC modes
    pub velocity_or_max: u8,
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub mode: ButtonMode,
    pub cc: u8,
    pub on: u8,
    pub off: u8,
    pub channel: u8,
}

/// Full controller configuration as carried by a REPLY or SET payload
///
/// `Default` is the all-zero configuration: every numeric field 0 and every
/// mode its first enumerated value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub keys: KeysConfig,
    pub pitch_wheel: PitchWheelConfig,
    pub mod_wheel: ModWheelConfig,
    pub sustain: SustainConfig,
    pub knobs: [KnobConfig; KNOB_COUNT],
    pub pads: [PadConfig; PAD_COUNT],
    pub buttons: [ButtonConfig; BUTTON_COUNT],
}
