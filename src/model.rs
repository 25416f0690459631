//! V49 configuration model
//!
//! Structured configuration, its 93-byte wire codec, and the partial
//! updates the editor applies to it.

pub mod codec;
mod types;
mod update;

pub use codec::{decode, encode, PAYLOAD_LEN};
pub use types::{
    ButtonConfig, ButtonMode, Configuration, KeysConfig, KnobConfig, KnobMode, ModWheelConfig,
    ModeByte, PadConfig, PadMode, PitchWheelConfig, SustainConfig, UnknownMode, BUTTON_COUNT,
    KNOB_COUNT, PAD_COUNT,
};
pub use update::{
    ButtonUpdate, KeysUpdate, KnobUpdate, ModWheelUpdate, PadUpdate, PitchWheelUpdate,
    SustainUpdate,
};
