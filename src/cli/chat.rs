use anyhow::{Context, Result, anyhow};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::chat::ChatSession;
use crate::cli::render;
use crate::core::AppConfig;
use crate::openai::CompletionClient;

const HELP: &str = "\
/models          list available backends
/model <name|n>  switch backend
//<text>         send a message starting with /
/history         show the transcript
/clear           start over with an empty transcript
/help            show this message
/quit            end the session";

#[derive(Debug, PartialEq)]
enum Input<'a> {
    Message(&'a str),
    Models,
    Model(&'a str),
    History,
    Clear,
    Help,
    Quit,
}

/// Known slash commands are handled locally. Anything else, including
/// lines that merely start with `/`, is sent as a message. A leading
/// `//` sends the rest of the line with a single `/`.
fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.starts_with("//") {
        return Input::Message(&trimmed[1..]);
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Message(line);
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(name, arg)| (name, arg.trim()))
        .unwrap_or((command, ""));

    match name {
        "models" => Input::Models,
        "model" if arg.is_empty() => Input::Models,
        "model" => Input::Model(arg),
        "history" => Input::History,
        "clear" => Input::Clear,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => Input::Message(line),
    }
}

pub fn run(config: &AppConfig, model: Option<&str>) -> Result<()> {
    let backend = match model {
        Some(key) => config
            .backends
            .select(key)
            .ok_or(anyhow!("Unknown model '{}'. Run `models` to list them.", key))?,
        None => config.default_backend(),
    };
    let client = CompletionClient::new(config.request_timeout)?;
    let mut session = ChatSession::new(backend.clone(), client);
    tracing::info!("Selected backend {}", session.backend());

    let mut rl = DefaultEditor::new().context("Failed to start line editor")?;

    println!("{}\n{}", render::TITLE, render::CAPTION);
    println!("Model: {} (type /help for commands)", session.backend().name);

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match parse_input(&line) {
                    Input::Message(msg) => match session.submit(msg) {
                        Ok(Some(reply)) => println!("assistant: {}", reply.content),
                        Ok(None) => {}
                        Err(err) => println!("{}", render::error(&err)),
                    },
                    Input::Models => {
                        println!("{}", render::backends(&config.backends, session.backend()));
                    }
                    Input::Model(key) => match config.backends.select(key) {
                        Some(backend) => {
                            session.select_backend(backend.clone());
                            println!("Model: {}", backend.name);
                        }
                        None => println!("Unknown model '{}'", key),
                    },
                    Input::History => {
                        if !session.transcript().is_empty() {
                            println!("{}", render::transcript(session.transcript()));
                        }
                    }
                    Input::Clear => {
                        session.reset();
                        println!("Transcript cleared");
                    }
                    Input::Help => println!("{}", HELP),
                    Input::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("Failed to read input"),
        }
    }

    Ok(())
}
