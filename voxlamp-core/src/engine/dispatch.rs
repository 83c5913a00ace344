//! Intent → actuation mapping.
//!
//! | Intent | Slots read | Commands |
//! |--------|------------|----------|
//! | `changeLightState` | every `state` slot | `on` → `AllOn`, `off` → `AllOff` |
//! | `changeLightStateOff` | none | `AllOff` |
//! | `changeColor` | every `color` slot | `SetColor(value)` |
//! | anything else | — | nothing |
//!
//! Matching is exact string comparison. Values outside the known set are
//! no-ops, not errors: the grammar may grow before this table does.

use tracing::{debug, warn};

use crate::actuation::{ActuationCommand, Actuator};
use crate::recognition::Slot;

pub const CHANGE_LIGHT_STATE: &str = "changeLightState";
pub const CHANGE_LIGHT_STATE_OFF: &str = "changeLightStateOff";
pub const CHANGE_COLOR: &str = "changeColor";

/// Pure mapping from an understood intent to commands, in application order.
pub fn plan(intent: &str, slots: &[Slot]) -> Vec<ActuationCommand> {
    match intent {
        CHANGE_LIGHT_STATE => slots
            .iter()
            .filter(|slot| slot.name == "state")
            .filter_map(|slot| match slot.value.as_str() {
                "on" => Some(ActuationCommand::AllOn),
                "off" => Some(ActuationCommand::AllOff),
                other => {
                    debug!(value = other, "unrecognised light state");
                    None
                }
            })
            .collect(),
        CHANGE_LIGHT_STATE_OFF => vec![ActuationCommand::AllOff],
        CHANGE_COLOR => slots
            .iter()
            .filter(|slot| slot.name == "color")
            .map(|slot| ActuationCommand::SetColor(slot.value.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Apply the commands for `(intent, slots)` immediately, in order.
/// Returns how many the actuator accepted.
pub fn dispatch(intent: &str, slots: &[Slot], actuator: &mut dyn Actuator) -> usize {
    let commands = plan(intent, slots);
    if commands.is_empty() {
        warn!(intent, slots = slots.len(), "intent has no actuation");
        return 0;
    }
    commands.iter().filter(|c| actuator.apply(c)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::{lights::WakeChase, LightBoard, Output};
    use std::time::Duration;

    fn board() -> LightBoard {
        LightBoard::new(WakeChase {
            loops: 0,
            step: Duration::ZERO,
        })
    }

    fn slots(pairs: &[(&str, &str)]) -> Vec<Slot> {
        pairs.iter().map(|(n, v)| Slot::new(*n, *v)).collect()
    }

    #[test]
    fn light_state_on_and_off() {
        assert_eq!(
            plan(CHANGE_LIGHT_STATE, &slots(&[("state", "on")])),
            vec![ActuationCommand::AllOn]
        );
        assert_eq!(
            plan(CHANGE_LIGHT_STATE, &slots(&[("state", "off")])),
            vec![ActuationCommand::AllOff]
        );
    }

    #[test]
    fn light_state_applies_every_matching_slot_in_order() {
        let planned = plan(
            CHANGE_LIGHT_STATE,
            &slots(&[("state", "on"), ("room", "kitchen"), ("state", "off")]),
        );
        assert_eq!(planned, vec![ActuationCommand::AllOn, ActuationCommand::AllOff]);

        let mut board = board();
        dispatch(
            CHANGE_LIGHT_STATE,
            &slots(&[("state", "on"), ("state", "off")]),
            &mut board,
        );
        assert!(board.lit().is_empty(), "last writer wins");
    }

    #[test]
    fn light_state_off_ignores_slots() {
        assert_eq!(
            plan(CHANGE_LIGHT_STATE_OFF, &slots(&[("state", "on"), ("color", "red")])),
            vec![ActuationCommand::AllOff]
        );
        assert_eq!(plan(CHANGE_LIGHT_STATE_OFF, &[]), vec![ActuationCommand::AllOff]);
    }

    #[test]
    fn change_color_green_lights_only_green() {
        let mut board = board();
        board.apply(&ActuationCommand::AllOn);
        let accepted = dispatch(CHANGE_COLOR, &slots(&[("color", "green")]), &mut board);
        assert_eq!(accepted, 1);
        assert_eq!(board.lit(), vec![Output::Green]);
    }

    #[test]
    fn unknown_color_changes_nothing() {
        let mut board = board();
        board.apply(&ActuationCommand::SetColor("orange".into()));
        let accepted =
            dispatch(CHANGE_COLOR, &slots(&[("color", "purple")]), &mut board);
        assert_eq!(accepted, 0);
        assert_eq!(board.lit(), vec![Output::Orange]);
    }

    #[test]
    fn unknown_intent_changes_nothing() {
        let mut board = board();
        board.apply(&ActuationCommand::AllOn);
        let accepted =
            dispatch("unknownIntent", &slots(&[("state", "off")]), &mut board);
        assert_eq!(accepted, 0);
        assert_eq!(board.states(), [true; 4]);
    }

    #[test]
    fn dispatch_is_idempotent() {
        let cases = [
            (CHANGE_LIGHT_STATE, slots(&[("state", "on")])),
            (CHANGE_LIGHT_STATE_OFF, vec![]),
            (CHANGE_COLOR, slots(&[("color", "red"), ("color", "blue")])),
        ];
        for (intent, slots) in cases {
            let mut board = board();
                dispatch(intent, &slots, &mut board);
            let once = board.states();
            dispatch(intent, &slots, &mut board);
            assert_eq!(board.states(), once, "intent {intent}");
        }
    }
}
