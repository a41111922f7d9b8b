use crate::chat::{ChatTurn, Transcript};
use crate::core::Backend;
use crate::openai::{AssistantReply, CompletionClient, CompletionError};

/// A single interactive chat session. Owns its transcript and the
/// backend currently selected; nothing is shared between sessions.
pub struct ChatSession {
    backend: Backend,
    client: CompletionClient,
    transcript: Transcript,
}

impl ChatSession {
    pub fn new(backend: Backend, client: CompletionClient) -> Self {
        Self {
            backend,
            client,
            transcript: Transcript::new(),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Switch the backend used for subsequent turns. The transcript is
    /// kept as is.
    pub fn select_backend(&mut self, backend: Backend) {
        tracing::info!("Selected backend {}", backend);
        self.backend = backend;
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn reset(&mut self) {
        self.transcript.reset();
    }

    /// Runs the next turn in chat. Blank input is ignored and returns
    /// `Ok(None)` without calling the backend. Otherwise the user turn
    /// is recorded before the request is made and stays in the
    /// transcript even if the request fails. The assistant turn is only
    /// appended once a reply has been parsed.
    pub fn submit(&mut self, input: &str) -> Result<Option<AssistantReply>, CompletionError> {
        if input.trim().is_empty() {
            return Ok(None);
        }

        self.transcript.append(ChatTurn::user(input));

        match self
            .client
            .complete(&self.backend.name, &self.backend.endpoint, &self.transcript)
        {
            Ok(reply) => {
                self.transcript.append(ChatTurn::assistant(&reply.content));
                Ok(Some(reply))
            }
            Err(err) => {
                tracing::warn!("Completion via {} failed: {}", self.backend, err);
                Err(err)
            }
        }
    }
}
