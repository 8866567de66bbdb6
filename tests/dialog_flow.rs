//! Integration tests for the intake conversation flow
//!
//! Drives the engine turn by turn through the persisted stack, the same
//! way a transport-level turn driver would.

use serde_json::{json, Value};

use parley::dialog::{ConversationId, ConversationStore, Engine, MemoryStore, OutboundMessage};
use parley::emr::dialogs::{build_registry, MAIN_DIALOG};
use parley::emr::document::{DocumentClient, DocumentResult};
use parley::emr::profile::UserProfile;
use parley::emr::EmrBot;

fn intake_engine() -> Engine<MemoryStore> {
    Engine::new(build_registry().unwrap(), MAIN_DIALOG, MemoryStore::new()).unwrap()
}

fn first_text(messages: &[OutboundMessage]) -> &str {
    messages
        .first()
        .and_then(OutboundMessage::as_text)
        .expect("expected a text message")
}

#[test]
fn full_intake_conversation_produces_the_profile() {
    let engine = intake_engine();
    let conversation = ConversationId::new("haya");

    let reply = engine.process_turn(&conversation, "I need my EMR").unwrap();
    assert_eq!(
        first_text(&reply.messages),
        "Let's get started. Please provide your first name."
    );
    assert!(reply.completion.is_none());
    assert!(engine.is_active(&conversation).unwrap());

    let reply = engine.process_turn(&conversation, "Haya").unwrap();
    assert_eq!(
        first_text(&reply.messages),
        "Now, please provide your last / family name."
    );

    let reply = engine.process_turn(&conversation, "Ahmad").unwrap();
    assert_eq!(
        first_text(&reply.messages),
        "Great, Now, please provide your full name."
    );

    let reply = engine
        .process_turn(&conversation, "Haya Zubair Ahmad")
        .unwrap();
    assert_eq!(
        first_text(&reply.messages),
        "Now, please provide your birth date."
    );

    let reply = engine.process_turn(&conversation, "1952-02-09").unwrap();
    assert!(first_text(&reply.messages).starts_with("Please select your gender"));

    let reply = engine.process_turn(&conversation, "Female").unwrap();
    assert_eq!(
        first_text(&reply.messages),
        "Lastly, please provide your postal code."
    );

    let reply = engine.process_turn(&conversation, "22042").unwrap();
    assert!(first_text(&reply.messages).starts_with("Thank you! Here is the summary:"));

    let completion = reply.completion.expect("conversation should be complete");
    assert_eq!(
        completion,
        json!({
            "Given": "Haya",
            "Family": "Ahmad",
            "Name": "Haya Zubair Ahmad",
            "BirthDate": "1952-02-09",
            "Gender": "Female",
            "AddressPostalcode": 22042,
        })
    );

    // The stack is empty again: the conversation is over.
    assert!(!engine.is_active(&conversation).unwrap());
}

/// Strip the retry bookkeeping so stacks can be compared across retries.
fn without_attempts(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != "attempts")
                .map(|(key, inner)| (key.clone(), without_attempts(inner)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(without_attempts).collect()),
        other => other.clone(),
    }
}

fn persisted_stack_value(engine: &Engine<MemoryStore>, conversation: &ConversationId) -> Value {
    let persisted = engine.store().load(conversation).unwrap().unwrap();
    serde_json::to_value(&persisted.stack).unwrap()
}

#[test]
fn invalid_replies_retry_without_advancing() {
    let engine = intake_engine();
    let conversation = ConversationId::new("retries");

    engine.process_turn(&conversation, "emr").unwrap();
    engine.process_turn(&conversation, "Haya").unwrap();
    engine.process_turn(&conversation, "Ahmad").unwrap();
    engine
        .process_turn(&conversation, "Haya Zubair Ahmad")
        .unwrap();

    let before = persisted_stack_value(&engine, &conversation);

    // Three malformed birth dates in a row.
    for bad in ["52-02-09", "1952/02/09", "1952-2-9"] {
        let reply = engine.process_turn(&conversation, bad).unwrap();
        assert_eq!(
            first_text(&reply.messages),
            "The birthdate should be in this format (yyyy-mm-dd). Try again."
        );
        assert!(reply.completion.is_none());
    }

    // Only the attempts counter may have moved.
    let after = persisted_stack_value(&engine, &conversation);
    assert_ne!(before, after);
    assert_eq!(without_attempts(&before), without_attempts(&after));

    // The next valid reply advances exactly one step.
    let reply = engine.process_turn(&conversation, "1952-02-09").unwrap();
    assert!(first_text(&reply.messages).starts_with("Please select your gender"));
}

#[test]
fn postal_code_validation_drives_retries() {
    let engine = intake_engine();
    let conversation = ConversationId::new("postal");

    for input in [
        "emr",
        "Haya",
        "Ahmad",
        "Haya Zubair Ahmad",
        "1952-02-09",
        "Female",
    ] {
        engine.process_turn(&conversation, input).unwrap();
    }

    for rejected in ["20000", "19999", "-5", "five digits"] {
        let reply = engine.process_turn(&conversation, rejected).unwrap();
        assert_eq!(
            first_text(&reply.messages),
            "The postal code must be of 5 digits. Try again."
        );
        assert!(engine.is_active(&conversation).unwrap());
    }

    let reply = engine.process_turn(&conversation, "20001").unwrap();
    assert!(reply.completion.is_some());
    assert!(!engine.is_active(&conversation).unwrap());
}

#[test]
fn choice_reply_must_match_exactly_or_by_ordinal() {
    let engine = intake_engine();
    let conversation = ConversationId::new("gender");

    for input in ["emr", "Haya", "Ahmad", "Haya Zubair Ahmad", "1952-02-09"] {
        engine.process_turn(&conversation, input).unwrap();
    }

    // Case mismatch is a recognition failure; the prompt re-sends itself.
    let reply = engine.process_turn(&conversation, "female").unwrap();
    assert!(first_text(&reply.messages).starts_with("Please select your gender"));

    // A 1-based ordinal selects the matching label.
    let reply = engine.process_turn(&conversation, "2").unwrap();
    assert_eq!(
        first_text(&reply.messages),
        "Lastly, please provide your postal code."
    );

    let reply = engine.process_turn(&conversation, "22042").unwrap();
    assert_eq!(reply.completion.unwrap()["Gender"], json!("Female"));
}

#[test]
fn cancellation_empties_the_stack_and_delivers_nothing() {
    let engine = intake_engine();
    let conversation = ConversationId::new("cancelled");

    engine.process_turn(&conversation, "emr").unwrap();
    engine.process_turn(&conversation, "Haya").unwrap();
    assert!(engine.is_active(&conversation).unwrap());

    engine.cancel(&conversation).unwrap();
    assert!(!engine.is_active(&conversation).unwrap());

    // A fresh turn starts over from the first prompt.
    let reply = engine.process_turn(&conversation, "emr").unwrap();
    assert_eq!(
        first_text(&reply.messages),
        "Let's get started. Please provide your first name."
    );
}

struct StubDocuments {
    bytes: Option<Vec<u8>>,
}

impl DocumentClient for StubDocuments {
    fn generate(&self, _profile: &UserProfile) -> DocumentResult<Vec<u8>> {
        match &self.bytes {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(parley::emr::document::DocumentError::Disabled),
        }
    }
}

fn drive_to_completion(bot: &EmrBot<MemoryStore, StubDocuments>) -> Vec<OutboundMessage> {
    let conversation = ConversationId::random();
    let mut last = Vec::new();
    for input in [
        "I need my EMR",
        "Haya",
        "Ahmad",
        "Haya Zubair Ahmad",
        "1952-02-09",
        "Female",
        "22042",
    ] {
        last = bot.handle_message(&conversation, input).unwrap();
    }
    last
}

#[test]
fn bot_routes_fresh_messages_through_the_intent_table() {
    let bot = EmrBot::new(MemoryStore::new(), StubDocuments { bytes: None }).unwrap();
    let conversation = ConversationId::new("routing");

    let messages = bot.handle_message(&conversation, "who are you").unwrap();
    assert_eq!(
        messages,
        vec![OutboundMessage::text("I am Elite Bot. I display patient EMR.")]
    );

    let messages = bot.handle_message(&conversation, "hello").unwrap();
    assert_eq!(
        messages,
        vec![OutboundMessage::text(
            "Hello! I'm your bot. Please type your request"
        )]
    );

    // Routing never began a dialog.
    assert!(!bot.engine().is_active(&conversation).unwrap());

    let messages = bot.handle_message(&conversation, "get my EMR").unwrap();
    assert_eq!(messages[0], OutboundMessage::text("You entered EMR."));
    assert_eq!(
        messages[1].as_text(),
        Some("Let's get started. Please provide your first name.")
    );
    assert!(bot.engine().is_active(&conversation).unwrap());
}

#[test]
fn completed_conversation_delivers_the_generated_document() {
    let bot = EmrBot::new(
        MemoryStore::new(),
        StubDocuments {
            bytes: Some(b"%PDF-1.4 stub".to_vec()),
        },
    )
    .unwrap();

    let messages = drive_to_completion(&bot);
    assert!(messages[0]
        .as_text()
        .unwrap()
        .starts_with("Thank you! Here is the summary:"));
    match &messages[1] {
        OutboundMessage::Attachment {
            name, content_type, ..
        } => {
            assert_eq!(name, "GeneratedPdf.pdf");
            assert_eq!(content_type, "application/pdf");
        }
        OutboundMessage::Text { .. } => panic!("expected the PDF attachment"),
    }
}

#[test]
fn document_failure_becomes_a_plain_message() {
    let bot = EmrBot::new(MemoryStore::new(), StubDocuments { bytes: None }).unwrap();

    let messages = drive_to_completion(&bot);
    let last = messages.last().unwrap().as_text().unwrap();
    assert!(last.starts_with("Failed to generate PDF"));
}
