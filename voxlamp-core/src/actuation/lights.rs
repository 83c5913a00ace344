//! Four-output indicator light board.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use super::{ActuationCommand, Actuator};

/// Indicator outputs, in board order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    Orange,
    Green,
    Red,
    Blue,
}

impl Output {
    pub const ALL: [Output; 4] = [Output::Orange, Output::Green, Output::Red, Output::Blue];

    /// Exact, case-sensitive match against the grammar's color values.
    pub fn from_color(name: &str) -> Option<Self> {
        match name {
            "orange" => Some(Output::Orange),
            "green" => Some(Output::Green),
            "red" => Some(Output::Red),
            "blue" => Some(Output::Blue),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Wake acknowledgement: toggle every output in turn, `loops` times on and off.
#[derive(Debug, Clone, Copy)]
pub struct WakeChase {
    pub loops: u32,
    pub step: Duration,
}

impl Default for WakeChase {
    fn default() -> Self {
        Self {
            loops: 2,
            step: Duration::from_millis(30),
        }
    }
}

/// In-memory light board. The state array is the single source of truth;
/// hardware glue would mirror `states()` onto GPIO.
#[derive(Debug, Clone, Default)]
pub struct LightBoard {
    on: [bool; 4],
    chase: WakeChase,
}

impl LightBoard {
    pub fn new(chase: WakeChase) -> Self {
        Self {
            on: [false; 4],
            chase,
        }
    }

    pub fn is_on(&self, output: Output) -> bool {
        self.on[output.index()]
    }

    /// Outputs currently lit, in board order.
    pub fn lit(&self) -> Vec<Output> {
        Output::ALL.into_iter().filter(|o| self.is_on(*o)).collect()
    }

    pub fn states(&self) -> [bool; 4] {
        self.on
    }

    fn set_all(&mut self, on: bool) {
        self.on = [on; 4];
    }

    fn toggle(&mut self, output: Output) {
        self.on[output.index()] = !self.on[output.index()];
    }
}

impl Actuator for LightBoard {
    fn apply(&mut self, command: &ActuationCommand) -> bool {
        match command {
            ActuationCommand::AllOn => self.set_all(true),
            ActuationCommand::AllOff => self.set_all(false),
            ActuationCommand::SetColor(name) => {
                let Some(output) = Output::from_color(name) else {
                    debug!(color = %name, "unknown color, lights unchanged");
                    return false;
                };
                self.set_all(false);
                self.on[output.index()] = true;
            }
        }
        info!(?command, lit = ?self.lit(), "lights updated");
        true
    }

    fn signal_wake(&mut self) {
        // Every output is toggled an even number of times, so the chase
        // leaves the board as it found it.
        for _ in 0..(2 * self.chase.loops) {
            for output in Output::ALL {
                self.toggle(output);
                if !self.chase.step.is_zero() {
                    std::thread::sleep(self.chase.step);
                }
            }
        }
    }
}
