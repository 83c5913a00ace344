//! Context blob format understood by the reference energy backend.
//!
//! A context declares the grammar's intents and their slots, plus a scripted
//! list of responses the backend cycles through, one per finalized utterance.
//! `null` in `responses` scripts a not-understood utterance.
//!
//! ```json
//! {
//!   "name": "smart_lighting",
//!   "intents": [
//!     { "name": "changeColor", "slots": ["color"],
//!       "expressions": ["change the color to $color"] }
//!   ],
//!   "responses": [
//!     { "intent": "changeColor", "slots": [{ "name": "color", "value": "green" }] },
//!     null
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::Slot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextScript {
    pub name: String,
    #[serde(default)]
    pub intents: Vec<IntentSpec>,
    #[serde(default)]
    pub responses: Vec<Option<ScriptedIntent>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentSpec {
    pub name: String,
    #[serde(default)]
    pub slots: Vec<String>,
    #[serde(default)]
    pub expressions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedIntent {
    pub intent: String,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

impl ContextScript {
    /// Parse and validate a context blob. On failure returns the diagnostic
    /// lines describing every problem found.
    pub fn parse(bytes: &[u8]) -> Result<Self, Vec<String>> {
        let script: ContextScript = serde_json::from_slice(bytes)
            .map_err(|e| vec![format!("context blob is not a valid context: {e}")])?;
        let problems = script.problems();
        if problems.is_empty() {
            Ok(script)
        } else {
            Err(problems)
        }
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("context name is empty".to_string());
        }
        if self.intents.is_empty() {
            problems.push(format!("context '{}' declares no intents", self.name));
        }
        for (idx, response) in self.responses.iter().enumerate() {
            let Some(response) = response else { continue };
            let Some(spec) = self.intents.iter().find(|i| i.name == response.intent) else {
                problems.push(format!(
                    "response {idx}: intent '{}' is not declared",
                    response.intent
                ));
                continue;
            };
            for slot in &response.slots {
                if !spec.slots.iter().any(|s| *s == slot.name) {
                    problems.push(format!(
                        "response {idx}: slot '{}' is not declared for intent '{}'",
                        slot.name, spec.name
                    ));
                }
            }
        }
        problems
    }

    /// YAML-style listing of the context's intents, slots and expressions.
    pub fn info(&self) -> String {
        let mut out = format!("context:\n  name: {}\n  intents:\n", self.name);
        for intent in &self.intents {
            out.push_str(&format!("    {}:\n", intent.name));
            if !intent.slots.is_empty() {
                out.push_str(&format!("      slots: [{}]\n", intent.slots.join(", ")));
            }
            for expression in &intent.expressions {
                out.push_str(&format!("      - {expression}\n"));
            }
        }
        out
    }

    /// Built-in lighting grammar used when no context file is configured.
    pub fn smart_lighting() -> Self {
        let intent = |name: &str, slots: &[&str], expressions: &[&str]| IntentSpec {
            name: name.into(),
            slots: slots.iter().map(|s| s.to_string()).collect(),
            expressions: expressions.iter().map(|s| s.to_string()).collect(),
        };
        let respond = |intent: &str, slots: &[(&str, &str)]| {
            Some(ScriptedIntent {
                intent: intent.into(),
                slots: slots.iter().map(|(n, v)| Slot::new(*n, *v)).collect(),
            })
        };

        Self {
            name: "smart_lighting".into(),
            intents: vec![
                intent(
                    "changeLightState",
                    &["state"],
                    &["turn $state:state the lights", "switch the lights $state:state"],
                ),
                intent("changeLightStateOff", &[], &["shut off the lights", "lights out"]),
                intent(
                    "changeColor",
                    &["color"],
                    &["change the color to $color:color", "make the lights $color:color"],
                ),
            ],
            responses: vec![
                respond("changeLightState", &[("state", "on")]),
                respond("changeColor", &[("color", "green")]),
                respond("changeColor", &[("color", "blue")]),
                None,
                respond("changeLightStateOff", &[]),
            ],
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_default()
    }
}
