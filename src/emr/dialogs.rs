//! The intake conversation: dialog registry assembly
//!
//! Two nested components: `get-user-details` collects the six profile
//! fields through prompts, and `main` wraps it with the summary step.
//! The parent stack only ever sees one frame for each component.

use serde_json::Value;

use crate::dialog::{
    step, ComponentDialog, DialogRegistry, DialogSet, EngineError, PromptDialog, PromptRequest,
    Result, StepContext, StepOutcome, Waterfall,
};

use super::profile::UserProfile;
use super::validators::{birth_date_validator, postal_code_validator};

/// Root dialog id begun for every new intake conversation
pub const MAIN_DIALOG: &str = "main";

/// The field-collection component
pub const GET_USER_DETAILS: &str = "get-user-details";

const TEXT_PROMPT: &str = "text-prompt";
const BIRTH_DATE_PROMPT: &str = "birth-date-prompt";
const GENDER_PROMPT: &str = "gender-prompt";
const POSTAL_CODE_PROMPT: &str = "postal-code-prompt";

const DETAILS_FLOW: &str = "details-flow";
const MAIN_FLOW: &str = "main-flow";

fn expect_text(ctx: &StepContext<'_>) -> Result<String> {
    ctx.result_str()
        .map(str::to_string)
        .ok_or_else(|| EngineError::CorruptStack("step expected a text result".into()))
}

fn expect_integer(ctx: &StepContext<'_>) -> Result<i64> {
    ctx.result_i64()
        .ok_or_else(|| EngineError::CorruptStack("step expected an integer result".into()))
}

fn details_flow() -> Waterfall {
    Waterfall::new([
        step(|_ctx| {
            StepOutcome::prompt(
                TEXT_PROMPT,
                PromptRequest::new("Let's get started. Please provide your first name."),
            )
        }),
        step(|ctx| {
            let given = expect_text(ctx)?;
            ctx.set("Given", given);
            StepOutcome::prompt(
                TEXT_PROMPT,
                PromptRequest::new("Now, please provide your last / family name."),
            )
        }),
        step(|ctx| {
            let family = expect_text(ctx)?;
            ctx.set("Family", family);
            StepOutcome::prompt(
                TEXT_PROMPT,
                PromptRequest::new("Great, Now, please provide your full name."),
            )
        }),
        step(|ctx| {
            let name = expect_text(ctx)?;
            ctx.set("Name", name);
            StepOutcome::prompt(
                BIRTH_DATE_PROMPT,
                PromptRequest::new("Now, please provide your birth date.")
                    .with_retry("The birthdate should be in this format (yyyy-mm-dd). Try again."),
            )
        }),
        step(|ctx| {
            let birth_date = expect_text(ctx)?;
            ctx.set("BirthDate", birth_date);
            StepOutcome::prompt(
                GENDER_PROMPT,
                PromptRequest::new("Please select your gender")
                    .with_choices(["Male", "Female", "Other"]),
            )
        }),
        step(|ctx| {
            let gender = expect_text(ctx)?;
            ctx.set("Gender", gender);
            StepOutcome::prompt(
                POSTAL_CODE_PROMPT,
                PromptRequest::new("Lastly, please provide your postal code.")
                    .with_retry("The postal code must be of 5 digits. Try again."),
            )
        }),
        step(|ctx| {
            let postal_code = expect_integer(ctx)?;
            ctx.set("AddressPostalcode", postal_code);
            let profile: UserProfile =
                serde_json::from_value(Value::Object(ctx.values().clone()))?;
            StepOutcome::end(&profile)
        }),
    ])
}

fn main_flow() -> Waterfall {
    Waterfall::new([
        step(|_ctx| Ok(StepOutcome::begin(GET_USER_DETAILS))),
        step(|ctx| {
            let Some(result) = ctx.result().filter(|r| !r.is_null()).cloned() else {
                ctx.send("PDF generation canceled, as User Info is empty.");
                return Ok(StepOutcome::end_empty());
            };
            let profile: UserProfile = serde_json::from_value(result.clone())?;
            ctx.send(format!("Thank you! Here is the summary:\n\n{profile}"));
            Ok(StepOutcome::EndDialog(result))
        }),
    ])
}

/// Build the frozen registry for the intake conversation
pub fn build_registry() -> Result<DialogRegistry> {
    let mut details = DialogSet::new();
    details.add(TEXT_PROMPT, PromptDialog::text());
    details.add(
        BIRTH_DATE_PROMPT,
        PromptDialog::text().with_validator(birth_date_validator()),
    );
    details.add(GENDER_PROMPT, PromptDialog::choice());
    details.add(
        POSTAL_CODE_PROMPT,
        PromptDialog::integer().with_validator(postal_code_validator()),
    );
    details.add(DETAILS_FLOW, details_flow());
    let details_component = ComponentDialog::new(details.freeze(), DETAILS_FLOW)?;

    let mut main = DialogSet::new();
    main.add(GET_USER_DETAILS, details_component);
    main.add(MAIN_FLOW, main_flow());
    let main_component = ComponentDialog::new(main.freeze(), MAIN_FLOW)?;

    let mut root = DialogSet::new();
    root.add(MAIN_DIALOG, main_component);
    Ok(root.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::DialogId;

    #[test]
    fn registry_exposes_only_the_root_dialog() {
        let registry = build_registry().unwrap();
        assert!(registry.contains(&DialogId::from(MAIN_DIALOG)));
        // Prompts live inside the components, invisible to the root.
        assert!(!registry.contains(&DialogId::from(TEXT_PROMPT)));
        assert!(!registry.contains(&DialogId::from(GET_USER_DETAILS)));
    }
}
