//! Static keyword routing for fresh top-level messages
//!
//! This is the replaceable routing collaborator in front of the engine:
//! `classify(raw_input) -> RouteDecision`. It only runs when no dialog is
//! in progress; once a stack exists, every turn goes to the engine.

use serde::{Deserialize, Serialize};

/// What to do with a message that arrived outside any dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Reply with a canned message; no dialog begins
    Respond(String),

    /// Begin the intake conversation, optionally acknowledging first
    BeginIntake {
        /// Acknowledgement sent before the first prompt
        ack: Option<String>,
    },
}

/// Keyword table mapping utterances to intents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntentTable {
    /// Exact greetings
    pub greetings: Vec<String>,

    /// Exact "who are you" phrasings
    pub who_are_you: Vec<String>,

    /// Exact help requests
    pub help: Vec<String>,

    /// Substrings that signal a record request
    pub record: Vec<String>,
}

impl Default for IntentTable {
    fn default() -> Self {
        Self {
            greetings: vec!["hi".into(), "hello".into(), "hey".into()],
            who_are_you: vec![
                "who are you".into(),
                "who are you?".into(),
                "what are you".into(),
            ],
            help: vec!["help".into(), "what can you do".into()],
            record: vec![
                "emr".into(),
                "medical record".into(),
                "medical records".into(),
            ],
        }
    }
}

impl IntentTable {
    /// Load a table from its JSON encoding
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Classify a fresh top-level message
    pub fn classify(&self, raw_input: &str) -> RouteDecision {
        let input = raw_input.trim().to_ascii_lowercase();

        if self.greetings.iter().any(|g| g == &input) {
            return RouteDecision::Respond(
                "Hello! I'm your bot. Please type your request".into(),
            );
        }
        if self.who_are_you.iter().any(|w| w == &input) {
            return RouteDecision::Respond("I am Elite Bot. I display patient EMR.".into());
        }
        if self.help.iter().any(|h| h == &input) {
            return RouteDecision::Respond(
                "Please type 'EMR or I need EMR' If you want EMR.".into(),
            );
        }
        if self.record.iter().any(|r| input.contains(r.as_str())) {
            return RouteDecision::BeginIntake {
                ack: Some("You entered EMR.".into()),
            };
        }
        RouteDecision::Respond("Sorry, I did not recognize your request. Try again!".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_phrases_match_by_substring() {
        let table = IntentTable::default();
        assert!(matches!(
            table.classify("I need my EMR document"),
            RouteDecision::BeginIntake { .. }
        ));
        assert!(matches!(
            table.classify("get my medical record"),
            RouteDecision::BeginIntake { .. }
        ));
    }

    #[test]
    fn unknown_input_gets_the_fallback() {
        let table = IntentTable::default();
        let decision = table.classify("order me a pizza");
        assert_eq!(
            decision,
            RouteDecision::Respond("Sorry, I did not recognize your request. Try again!".into())
        );
    }

    #[test]
    fn table_deserializes_from_json() {
        let table = IntentTable::from_json(
            r#"{"whoAreYou": ["who made you"], "record": ["chart"]}"#,
        )
        .unwrap();
        assert!(matches!(
            table.classify("send my chart please"),
            RouteDecision::BeginIntake { .. }
        ));
        assert!(matches!(
            table.classify("who made you"),
            RouteDecision::Respond(_)
        ));
    }
}
