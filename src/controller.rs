// Conversation form controller.
// Owns the prompt field and the conversation for one page, and admits at most
// one outstanding submission at a time.

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::conversation::{Conversation, Turn, TurnId};
use crate::error::GatewayError;

/// Shown to the user when a submission fails.
pub const FAILURE_ALERT: &str = "An error occurred while generating the response. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Prompt is required.")]
    EmptyPrompt,
    #[error("a submission is already in progress")]
    Busy,
}

/// Carries a conversation to the completion gateway and returns the reply.
pub trait CompletionTransport: Send + Sync {
    fn complete<'a>(&'a self, turns: &'a [Turn]) -> BoxFuture<'a, Result<String, GatewayError>>;
}

/// Ticket for the one submission in flight. Only `finish` consumes it.
#[derive(Debug)]
#[must_use = "a pending submission must be passed back to finish()"]
pub struct PendingSubmission {
    user: TurnId,
    history: Vec<Turn>,
}

impl PendingSubmission {
    /// Everything sent to the gateway, the new prompt included.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed { user: TurnId, assistant: TurnId },
    Failed { user: TurnId, alert: String },
}

#[derive(Debug, Default)]
pub struct FormController {
    conversation: Conversation,
    input: String,
    in_flight: bool,
}

impl FormController {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            input: String::new(),
            in_flight: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// True while a submission is outstanding; the form is disabled.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Validate the prompt, record it as a user turn and open the slot.
    pub fn begin(&mut self, prompt: &str) -> Result<PendingSubmission, SubmitError> {
        if prompt.trim().is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        if self.in_flight {
            return Err(SubmitError::Busy);
        }

        self.input = prompt.to_string();
        let user = self.conversation.push(Turn::user(prompt));
        self.in_flight = true;
        debug!(turns = self.conversation.len(), "Submission started");

        Ok(PendingSubmission {
            user,
            history: self.conversation.turns().to_vec(),
        })
    }

    /// Close the slot with the gateway's answer.
    pub fn finish(
        &mut self,
        pending: PendingSubmission,
        result: Result<String, GatewayError>,
    ) -> SubmitOutcome {
        self.in_flight = false;
        match result {
            Ok(content) => {
                let assistant = self.conversation.push(Turn::assistant(content));
                self.input.clear();
                info!(turns = self.conversation.len(), "Submission completed");
                SubmitOutcome::Completed {
                    user: pending.user,
                    assistant,
                }
            }
            Err(e) => {
                error!(error = %e, "Error during chat generation");
                SubmitOutcome::Failed {
                    user: pending.user,
                    alert: FAILURE_ALERT.to_string(),
                }
            }
        }
    }

    /// One complete round trip: validate, send the whole conversation, record
    /// the reply. No retry and no timeout.
    pub async fn submit(
        &mut self,
        prompt: &str,
        transport: &dyn CompletionTransport,
    ) -> Result<SubmitOutcome, SubmitError> {
        let pending = self.begin(prompt)?;
        let result = transport.complete(pending.history()).await;
        Ok(self.finish(pending, result))
    }
}
