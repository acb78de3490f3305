//! Command interpretation
//!
//! Maps a transcript to the action the dispatcher should run.

mod interpreter;

pub use interpreter::{interpret, Action};
