//! Records of the loop's side-effect callbacks and lifecycle changes.
//!
//! All types serialise to camelCase JSON so a host can forward them as-is.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::recognition::{Inference, Slot};

// ---------------------------------------------------------------------------
// Recognition events
// ---------------------------------------------------------------------------

/// A wake word was detected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeEvent {
    /// Monotonically increasing wake sequence number.
    pub seq: u64,
    /// Index of the keyword that fired, in configuration order.
    pub keyword_index: usize,
}

/// An utterance was finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceEvent {
    /// Matches the `seq` of the wake event that opened the utterance.
    pub seq: u64,
    pub is_understood: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<Slot>,
}

impl UtteranceEvent {
    /// Copy what a host needs out of a borrowed inference.
    pub fn from_inference(seq: u64, inference: &Inference<'_>) -> Self {
        match inference {
            Inference::NotUnderstood => Self {
                seq,
                is_understood: false,
                intent: None,
                slots: Vec::new(),
            },
            Inference::Understood(view) => Self {
                seq,
                is_understood: true,
                intent: Some(view.intent.to_string()),
                slots: view.slots.to_vec(),
            },
        }
    }
}

/// Console block, one key per line.
impl fmt::Display for UtteranceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "    is_understood : '{}',", self.is_understood)?;
        if let Some(intent) = self.intent.as_deref().filter(|_| self.is_understood) {
            writeln!(f, "    intent : '{intent}',")?;
            if !self.slots.is_empty() {
                writeln!(f, "    slots : {{")?;
                for slot in &self.slots {
                    writeln!(f, "        '{}' : '{}',", slot.name, slot.value)?;
                }
                writeln!(f, "    }}")?;
            }
        }
        write!(f, "}}")
    }
}

// ---------------------------------------------------------------------------
// Lifecycle events
// ---------------------------------------------------------------------------

/// Emitted whenever the assistant's lifecycle status changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantStatusEvent {
    pub status: AssistantStatus,
    /// Optional human-readable detail (e.g. the fatal error).
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantStatus {
    /// Engines built, loop not yet started.
    Idle,
    /// Loop running.
    Listening,
    /// Loop left through an external stop or an exhausted source.
    Stopped,
    /// Fatal engine error. Terminal: no transition leaves this state.
    Halted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::IntentView;

    #[test]
    fn understood_event_renders_block_with_slots() {
        let slots = [Slot::new("color", "green")];
        let event = UtteranceEvent::from_inference(
            4,
            &Inference::Understood(IntentView {
                intent: "changeColor",
                slots: &slots,
            }),
        );
        let expected = "{\n    is_understood : 'true',\n    intent : 'changeColor',\n    slots : {\n        'color' : 'green',\n    }\n}";
        assert_eq!(event.to_string(), expected);
    }

    #[test]
    fn not_understood_event_is_minimal() {
        let event = UtteranceEvent::from_inference(1, &Inference::NotUnderstood);
        assert_eq!(event.to_string(), "{\n    is_understood : 'false',\n}");

        let json = serde_json::to_value(&event).expect("serialize utterance event");
        assert_eq!(json["isUnderstood"], false);
        assert!(json.get("intent").is_none());
        assert!(json.get("slots").is_none());
    }

    #[test]
    fn understood_event_serializes_ordered_slots() {
        let slots = [Slot::new("state", "on"), Slot::new("state", "off")];
        let event = UtteranceEvent::from_inference(
            2,
            &Inference::Understood(IntentView {
                intent: "changeLightState",
                slots: &slots,
            }),
        );
        let json = serde_json::to_value(&event).expect("serialize utterance event");
        assert_eq!(json["intent"], "changeLightState");
        assert_eq!(json["slots"][0]["value"], "on");
        assert_eq!(json["slots"][1]["value"], "off");
    }

    #[test]
    fn status_serializes_lowercase() {
        let event = AssistantStatusEvent {
            status: AssistantStatus::Halted,
            detail: Some("wake-word process failed".into()),
        };
        let json = serde_json::to_value(&event).expect("serialize status event");
        assert_eq!(json["status"], "halted");
        let round_trip: AssistantStatusEvent =
            serde_json::from_value(json).expect("deserialize status event");
        assert_eq!(round_trip.status, AssistantStatus::Halted);
    }

    #[test]
    fn wake_event_uses_camel_case() {
        let json = serde_json::to_value(WakeEvent {
            seq: 9,
            keyword_index: 0,
        })
        .expect("serialize wake event");
        assert_eq!(json["keywordIndex"], 0);
    }
}
