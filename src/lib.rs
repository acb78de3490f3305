//! voice-controller: voice interaction controller for an assistive app
//!
//! Drives one microphone and one speaker through a shared
//! Idle/Listening/Processing/Speaking status, turns what was heard into
//! navigation, SOS cancellation or an AI question, and speaks the result.
//!
//! The controller itself is engine-agnostic. [`engine`] holds the
//! recognizer/synthesizer traits plus console stand-ins, [`collab`] the host
//! UI seams, and [`ipc`] a Unix socket front end for out-of-process hosts.

pub mod collab;
pub mod command;
pub mod config;
pub mod controller;
pub mod engine;
pub mod events;
pub mod ipc;
pub mod lifecycle;
pub mod status;

pub use controller::{
    ControllerParts, ControllerSettings, UtteranceOutcome, VoiceController, VoiceHandle,
};
pub use events::VoiceEvent;
pub use status::Status;
