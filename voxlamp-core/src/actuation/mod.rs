//! Actuation commands and the sink that applies them.

pub mod lights;

pub use lights::{LightBoard, Output};

use serde::{Deserialize, Serialize};

/// A discrete actuation derived from an understood intent. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "color", rename_all = "camelCase")]
pub enum ActuationCommand {
    AllOn,
    AllOff,
    /// Exclusive: clears every output, then lights the one named. Names the
    /// board does not know leave it untouched.
    SetColor(String),
}

/// Applies commands immediately, as side effects.
pub trait Actuator: Send + 'static {
    /// Apply one command. Returns `false` when the command was ignored
    /// (e.g. an unknown color).
    fn apply(&mut self, command: &ActuationCommand) -> bool;

    /// Visual acknowledgement that the wake word was heard.
    fn signal_wake(&mut self) {}
}
