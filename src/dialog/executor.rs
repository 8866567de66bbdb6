//! The dialog stack state machine: begin, resume, deliver, cancel
//!
//! Every operation either runs to a terminal result within the current
//! turn or stops at exactly one `WaitingForInput` frame and hands control
//! back for persistence. Suspension is nothing more than the saved stack;
//! resumption re-enters from frame state alone, however many turns later.
//!
//! Result delivery works by popping: when a frame ends, its result value
//! becomes the previous-result input of the next step of the frame below.
//! Component frames recurse through their nested stack with their own
//! registry, so nesting depth is invisible to the parent.

use serde_json::Value;

use super::component::ComponentState;
use super::error::{EngineError, Result};
use super::prompt::{PromptRequest, PromptState};
use super::registry::{DialogDef, DialogRegistry};
use super::stack::{DialogStack, Frame};
use super::turn::{DialogId, Outbox};
use super::waterfall::{StepContext, StepOutcome, WaterfallState};

/// Executes dialog stack operations against one registry
#[derive(Debug, Clone, Copy)]
pub struct DialogExecutor<'r> {
    registry: &'r DialogRegistry,
}

impl<'r> DialogExecutor<'r> {
    /// Create an executor over a frozen registry
    pub fn new(registry: &'r DialogRegistry) -> Self {
        Self { registry }
    }

    /// Push a new frame for `id` and run its entry logic
    ///
    /// Returns `Ok(Some(result))` when the dialog ran to completion within
    /// this turn (no frame remains), `Ok(None)` when it suspended. Prompts
    /// must be begun with a serialized [`PromptRequest`] as options.
    pub fn begin(
        &self,
        stack: &mut DialogStack,
        outbox: &mut Outbox,
        id: &DialogId,
        options: Value,
    ) -> Result<Option<Value>> {
        match self.registry.get(id)? {
            DialogDef::Waterfall(_) => {
                stack.push(Frame::new(id.clone(), &WaterfallState::default())?);
                self.run_waterfall(stack, outbox, None)
            }
            DialogDef::Prompt(_) => {
                let request: PromptRequest = serde_json::from_value(options)?;
                tracing::debug!(dialog = %id, "prompt begun");
                outbox.send_text(request.render_prompt());
                stack.push(Frame::waiting(id.clone(), &PromptState::new(request))?);
                Ok(None)
            }
            DialogDef::Component(component) => {
                let inner_exec = DialogExecutor::new(component.dialogs());
                let mut inner = DialogStack::new();
                match inner_exec.begin(&mut inner, outbox, component.initial(), options)? {
                    // Inner flow finished without suspending; the component
                    // never leaves a frame behind.
                    Some(result) => Ok(Some(result)),
                    None => {
                        stack.push(Frame::waiting(id.clone(), &ComponentState { inner })?);
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Deliver the current turn's raw input to the suspended top frame
    ///
    /// Fails with [`EngineError::NoActiveDialog`] on an empty stack; the
    /// turn driver recovers by treating the input as a fresh top-level
    /// message.
    pub fn resume(
        &self,
        stack: &mut DialogStack,
        outbox: &mut Outbox,
        input: &str,
    ) -> Result<Option<Value>> {
        if stack.is_empty() {
            return Err(EngineError::NoActiveDialog);
        }
        if !stack.is_waiting() {
            return Err(EngineError::CorruptStack(
                "resumed a stack whose top frame is not waiting for input".into(),
            ));
        }
        let dialog_id = top_dialog_id(stack)?;
        match self.registry.get(&dialog_id)? {
            DialogDef::Prompt(prompt) => {
                let frame = top_frame_mut(stack)?;
                let mut state: PromptState = frame.read_state()?;
                match prompt.accept(&state.request, input) {
                    Some(value) => {
                        tracing::debug!(dialog = %dialog_id, "prompt reply accepted");
                        stack.pop();
                        self.deliver(stack, outbox, value)
                    }
                    None => {
                        // Recognition or validation failed. Re-issue the
                        // request and stay suspended; there is no retry
                        // ceiling.
                        state.attempts += 1;
                        tracing::debug!(
                            dialog = %dialog_id,
                            attempts = state.attempts,
                            "prompt reply rejected, retrying"
                        );
                        outbox.send_text(state.request.render_retry());
                        frame.write_state(&state)?;
                        Ok(None)
                    }
                }
            }
            DialogDef::Component(component) => {
                let frame = top_frame_mut(stack)?;
                let mut state: ComponentState = frame.read_state()?;
                let inner_exec = DialogExecutor::new(component.dialogs());
                match inner_exec.resume(&mut state.inner, outbox, input)? {
                    Some(result) => {
                        // Inner stack is empty: the component is done and
                        // ends transparently on the outer stack.
                        stack.pop();
                        self.deliver(stack, outbox, result)
                    }
                    None => {
                        frame.write_state(&state)?;
                        Ok(None)
                    }
                }
            }
            DialogDef::Waterfall(_) => Err(EngineError::CorruptStack(format!(
                "waterfall '{dialog_id}' was suspended at the top of the stack"
            ))),
        }
    }

    /// Pop every frame without delivering any result
    pub fn cancel_all(&self, stack: &mut DialogStack) {
        stack.cancel_all();
    }

    /// Hand a completed child's result to the frame below
    ///
    /// Cascades: when the receiving waterfall itself ends, its result
    /// becomes the input of the next frame down, until the stack either
    /// suspends or empties. A result only escapes on an empty stack.
    fn deliver(
        &self,
        stack: &mut DialogStack,
        outbox: &mut Outbox,
        mut result: Value,
    ) -> Result<Option<Value>> {
        loop {
            if stack.is_empty() {
                // The conversation is over for this turn.
                return Ok(Some(result));
            }
            let dialog_id = top_dialog_id(stack)?;
            match self.registry.get(&dialog_id)? {
                DialogDef::Waterfall(_) => {
                    match self.run_waterfall(stack, outbox, Some(result))? {
                        Some(ended) => result = ended,
                        None => return Ok(None),
                    }
                }
                _ => {
                    return Err(EngineError::CorruptStack(format!(
                        "result delivered to '{dialog_id}', which cannot have children on this stack"
                    )))
                }
            }
        }
    }

    /// Advance the waterfall at the top of the stack until it suspends or ends
    ///
    /// Each iteration runs exactly one step with the previous child's
    /// result. A child that completes synchronously feeds the next step in
    /// the same loop; a suspension returns control for persistence.
    fn run_waterfall(
        &self,
        stack: &mut DialogStack,
        outbox: &mut Outbox,
        mut incoming: Option<Value>,
    ) -> Result<Option<Value>> {
        loop {
            let dialog_id = top_dialog_id(stack)?;
            let DialogDef::Waterfall(waterfall) = self.registry.get(&dialog_id)? else {
                return Err(EngineError::CorruptStack(format!(
                    "'{dialog_id}' resumed as a waterfall but is not one"
                )));
            };

            let mut state: WaterfallState = top_frame_mut(stack)?.read_state()?;
            let index = state.step.map_or(0, |last| last + 1);
            let Some(step_fn) = waterfall.step_at(index) else {
                return Err(EngineError::WaterfallOverrun {
                    dialog: dialog_id.to_string(),
                    index,
                    steps: waterfall.len(),
                });
            };
            state.step = Some(index);

            let outcome = {
                let mut ctx = StepContext {
                    values: &mut state.values,
                    result: incoming.as_ref(),
                    outbox,
                };
                (step_fn.as_ref())(&mut ctx)?
            };

            match outcome {
                StepOutcome::EndDialog(value) => {
                    stack.pop();
                    return Ok(Some(value));
                }
                StepOutcome::BeginChild { dialog, options } => {
                    // Persist the advanced index and any bag mutations
                    // before the child takes the top of the stack.
                    top_frame_mut(stack)?.write_state(&state)?;
                    match self.begin(stack, outbox, &dialog, options)? {
                        Some(result) => incoming = Some(result),
                        None => return Ok(None),
                    }
                }
            }
        }
    }
}

fn top_dialog_id(stack: &DialogStack) -> Result<DialogId> {
    stack
        .top()
        .map(|frame| frame.dialog_id.clone())
        .ok_or_else(|| EngineError::CorruptStack("expected a frame on the stack".into()))
}

fn top_frame_mut(stack: &mut DialogStack) -> Result<&mut Frame> {
    stack
        .top_mut()
        .ok_or_else(|| EngineError::CorruptStack("expected a frame on the stack".into()))
}
