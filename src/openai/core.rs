use std::time::Duration;

use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::chat::{ChatTurn, Role, Transcript};

const TOP_P: f64 = 1.0;
const N: u32 = 1;
const MAX_TOKENS: u32 = 600;

#[derive(Error, Debug)]
pub enum CompletionError {
    /// The request never got a 2xx response: connection, DNS, timeout,
    /// or an error status from the backend.
    #[error("Error making request: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered 2xx but the body wasn't the chat
    /// completion shape.
    #[error("Failed to get response from the API: {0}")]
    MalformedResponse(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: String,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Serialize, Debug, PartialEq)]
pub struct RequestPayload<'a> {
    pub model: &'a str,
    pub messages: Vec<&'a ChatTurn>,
    pub top_p: f64,
    pub n: u32,
    pub max_tokens: u32,
}

/// Only the most recent user turn is ever sent to the backend. Prior
/// turns, including all assistant turns, are left out no matter how
/// long the transcript gets.
pub fn select_last_user_turn(transcript: &Transcript) -> Vec<&ChatTurn> {
    transcript
        .iter()
        .rev()
        .find(|turn| turn.role() == Role::User)
        .into_iter()
        .collect()
}

pub fn build_payload<'a>(model: &'a str, last_user_turns: Vec<&'a ChatTurn>) -> RequestPayload<'a> {
    RequestPayload {
        model,
        messages: last_user_turns,
        top_p: TOP_P,
        n: N,
        max_tokens: MAX_TOKENS,
    }
}

/// Pulls `choices[0].message.content` out of a response body.
pub fn parse_reply(body: &str) -> Result<AssistantReply, CompletionError> {
    let resp: Value = serde_json::from_str(body).map_err(|e| {
        CompletionError::MalformedResponse(format!("Response is not valid JSON: {}", e))
    })?;

    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| AssistantReply {
            content: content.to_string(),
        })
        .ok_or_else(|| {
            CompletionError::MalformedResponse(format!(
                "No message received. Resp:\n\n {}",
                resp
            ))
        })
}

/// Blocking client for OpenAI compatible chat completion endpoints.
/// One call at a time, no retries.
#[derive(Clone, Debug)]
pub struct CompletionClient {
    http: reqwest::blocking::Client,
}

impl CompletionClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, CompletionError> {
        // The blocking client defaults to a 30s timeout so it needs to
        // be cleared explicitly when none is configured
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    pub fn complete(
        &self,
        model: &str,
        endpoint: &Url,
        transcript: &Transcript,
    ) -> Result<AssistantReply, CompletionError> {
        let payload = build_payload(model, select_last_user_turn(transcript));

        tracing::debug!(
            "Sending completion request to {} for model {} with {} message(s)",
            endpoint,
            model,
            payload.messages.len()
        );

        let response = self
            .http
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()?;

        tracing::debug!("Completion response status: {}", response.status());

        let body = response.error_for_status()?.text()?;
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn endpoint(server: &mockito::Server) -> Url {
        Url::parse(&format!("{}/v1/chat/completions", server.url())).unwrap()
    }

    fn transcript() -> Transcript {
        Transcript::new_with_turns(vec![
            ChatTurn::user("hi"),
            ChatTurn::assistant("hello"),
            ChatTurn::user("what's 2+2?"),
        ])
    }

    #[test]
    fn test_select_last_user_turn() {
        let transcript = transcript();
        let selected = select_last_user_turn(&transcript);
        assert_eq!(selected, vec![&ChatTurn::user("what's 2+2?")]);
    }

    #[test]
    fn test_select_last_user_turn_skips_trailing_assistant() {
        let mut transcript = transcript();
        transcript.append(ChatTurn::assistant("4"));
        transcript.append(ChatTurn::assistant("anything else?"));
        let selected = select_last_user_turn(&transcript);
        assert_eq!(selected, vec![&ChatTurn::user("what's 2+2?")]);
    }

    #[test]
    fn test_select_last_user_turn_empty() {
        assert!(select_last_user_turn(&Transcript::new()).is_empty());

        let only_assistant = Transcript::new_with_turns(vec![ChatTurn::assistant("hello")]);
        assert!(select_last_user_turn(&only_assistant).is_empty());
    }

    #[test]
    fn test_payload_shape() {
        let transcript = transcript();
        let payload = build_payload("meta/llama-2-7b-chat", select_last_user_turn(&transcript));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "model": "meta/llama-2-7b-chat",
                "messages": [{"role": "user", "content": "what's 2+2?"}],
                "top_p": 1.0,
                "n": 1,
                "max_tokens": 600
            })
        );

        let empty = Transcript::new();
        let payload = build_payload("m", select_last_user_turn(&empty));
        assert!(payload.messages.is_empty());
        assert_eq!(payload.top_p, 1.0);
        assert_eq!(payload.n, 1);
        assert_eq!(payload.max_tokens, 600);
    }

    #[test]
    fn test_parse_reply() {
        let reply = parse_reply(r#"{"choices":[{"message":{"content":"4"}}]}"#).unwrap();
        assert_eq!(reply.content, "4");

        assert!(matches!(
            parse_reply(r#"{"foo":"bar"}"#),
            Err(CompletionError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_reply("<html>oops</html>"),
            Err(CompletionError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"choices":[]}"#),
            Err(CompletionError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_complete_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("content-type", "application/json")
            .match_header("accept", "application/json")
            .match_body(Matcher::Json(json!({
                "model": "meta/llama-2-7b-chat",
                "messages": [{"role": "user", "content": "what's 2+2?"}],
                "top_p": 1.0,
                "n": 1,
                "max_tokens": 600
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"4"}}]}"#)
            .create();

        let client = CompletionClient::new(None).unwrap();
        let reply = client
            .complete("meta/llama-2-7b-chat", &endpoint(&server), &transcript())
            .unwrap();

        mock.assert();
        assert_eq!(
            reply,
            AssistantReply {
                content: "4".to_string()
            }
        );
    }

    #[test]
    fn test_complete_error_status_is_transport() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("internal error")
            .create();

        let client = CompletionClient::new(None).unwrap();
        let result = client.complete("m", &endpoint(&server), &transcript());
        assert!(matches!(result, Err(CompletionError::Transport(_))));
    }

    #[test]
    fn test_complete_malformed() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"foo":"bar"}"#)
            .create();

        let client = CompletionClient::new(None).unwrap();
        let result = client.complete("m", &endpoint(&server), &transcript());
        assert!(matches!(result, Err(CompletionError::MalformedResponse(_))));
    }

    #[test]
    fn test_complete_connection_refused() {
        // Nothing listens on port 1
        let url = Url::parse("http://127.0.0.1:1/v1/chat/completions").unwrap();
        let client = CompletionClient::new(Some(Duration::from_secs(5))).unwrap();
        let result = client.complete("m", &url, &transcript());
        assert!(matches!(result, Err(CompletionError::Transport(_))));
    }
}
