//! Intake Reviewer — sends one case submission to the model and returns the
//! formatted answer.
//!
//! Message order is fixed: criteria as `system`, the case as `user`, and the
//! reviewer instructions as a trailing `assistant` turn the model continues from.

use std::sync::Arc;

use tracing::info;

use crate::errors::IntakeError;
use crate::format::wrap_text;
use crate::llm_client::{
    ChatCompletionRequest, ChatMessage, CompletionBackend, SamplingParams, MODEL,
};

pub struct IntakeReviewer {
    backend: Arc<dyn CompletionBackend>,
    criteria: String,
    instructions: String,
    width: usize,
}

impl IntakeReviewer {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        criteria: String,
        instructions: String,
        width: usize,
    ) -> Result<Self, IntakeError> {
        if width == 0 {
            return Err(IntakeError::InvalidWidth(width));
        }
        Ok(Self {
            backend,
            criteria,
            instructions,
            width,
        })
    }

    pub fn build_request(&self, case_text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: MODEL.to_string(),
            messages: vec![
                ChatMessage::system(self.criteria.as_str()),
                ChatMessage::user(case_text),
                ChatMessage::assistant(self.instructions.as_str()),
            ],
            sampling: SamplingParams::default(),
        }
    }

    /// Performs exactly one completion call. Any remote failure comes back as
    /// `IntakeError::RemoteCallFailed` with the client error as its source.
    pub async fn review(&self, case_text: &str) -> Result<String, IntakeError> {
        let request = self.build_request(case_text);
        let response = self.backend.complete(&request).await?;
        let answer = response.first_text()?;

        info!(
            chars = answer.chars().count(),
            choices = response.choices.len(),
            "Received intake review"
        );

        wrap_text(answer, self.width)
    }
}
