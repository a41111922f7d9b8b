//! Plain text rendering of the transcript and backend list.
use crate::chat::{ChatTurn, Transcript};
use crate::core::{Backend, BackendDirectory};
use crate::openai::CompletionError;

pub const TITLE: &str = "💬 Chatbot";
pub const CAPTION: &str = "Terminal chatbot for OpenAI compatible NIM endpoints";

pub fn turn(turn: &ChatTurn) -> String {
    format!("{}: {}", turn.role(), turn.content())
}

pub fn transcript(transcript: &Transcript) -> String {
    transcript.iter().map(turn).collect::<Vec<_>>().join("\n")
}

/// One line per backend, numbered from 1, with the active one marked.
pub fn backends(directory: &BackendDirectory, active: &Backend) -> String {
    directory
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let marker = if b.name == active.name { "*" } else { " " };
            format!("{} {}. {}\t{}", marker, i + 1, b.name, b.endpoint)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn error(err: &CompletionError) -> String {
    match err {
        CompletionError::Transport(cause) => format!("Error making request: {}", cause),
        CompletionError::MalformedResponse(_) => {
            String::from("Failed to get response from the API")
        }
    }
}
