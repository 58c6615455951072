//! Signal generation module
//!
//! Fuses volume-profile and composite-trend evidence through a per-symbol
//! state machine with debounce and cooldown.

mod engine;
mod types;

pub use engine::{SignalEngine, SignalParams, SignalPhase};
pub use types::{Signal, SignalKind};
