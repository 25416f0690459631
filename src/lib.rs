//! V49 Editor - SysEx configuration editor for the Alesis V49
//!
//! Reads the controller's configuration over MIDI SysEx, edits it, writes
//! it back, and highlights which physical control is being played.

pub mod activity;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod midi;
pub mod model;
pub mod monitor;
pub mod paths;
pub mod session;
pub mod state;
pub mod sysex;
pub mod transport;
