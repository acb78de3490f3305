//! Status module for the controller's single shared state
//!
//! Provides an explicit state machine with four statuses:
//! - Idle: nothing in flight
//! - Listening: one recognition session is open
//! - Processing: a transcript is being classified or answered
//! - Speaking: one utterance is playing

mod machine;

pub use machine::{Status, StatusMachine, TransitionError};
