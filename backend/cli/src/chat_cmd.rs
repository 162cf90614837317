//! CLI Chat Command
//!
//! Terminal chat surface. Plain lines are prompts, slash lines are commands;
//! the coordinator runs exactly as it does behind a panel.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use qchat_core::{ChatError, DisplaySink, Model, Notification, UiEvent};
use qchat_session::{ChatContext, Coordinator};

use crate::models_cmd;
use crate::terminal_output::{
    note_info, note_success, note_warn, stream_write, supports_color, TranscriptRenderer,
};

const HELP: &str = "\
Commands:
  /stop          stop the current response
  /clear         clear the transcript
  /models        list available models
  /model <id>    switch model
  /quit          exit
Anything else is sent as a prompt.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    Prompt(String),
    Stop,
    Clear,
    ListModels,
    SelectModel(String),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    if !line.starts_with('/') {
        return ReplCommand::Prompt(line.to_string());
    }

    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };
    match (command, arg) {
        ("/stop", _) => ReplCommand::Stop,
        ("/clear", _) => ReplCommand::Clear,
        ("/models", _) => ReplCommand::ListModels,
        ("/model", id) if !id.is_empty() => ReplCommand::SelectModel(id.to_string()),
        ("/help", _) => ReplCommand::Help,
        ("/quit" | "/exit", _) => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

/// What the coordinator hands the terminal, in posting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalUpdate {
    Begin,
    Notify(Notification),
}

/// Coordinator sink for the REPL. Unlike a panel, the terminal has to be told
/// where one response ends and the next begins.
pub struct TerminalSink(mpsc::UnboundedSender<TerminalUpdate>);

impl TerminalSink {
    fn forward(&self, update: TerminalUpdate) {
        if self.0.send(update).is_err() {
            debug!("Terminal renderer closed, update dropped");
        }
    }
}

impl DisplaySink for TerminalSink {
    fn post(&self, notification: Notification) {
        self.forward(TerminalUpdate::Notify(notification));
    }

    fn begin_response(&self) {
        self.forward(TerminalUpdate::Begin);
    }
}

/// Pick `requested`, or the first catalog entry.
pub fn select_model(requested: Option<String>, models: &[Model]) -> Option<String> {
    requested.or_else(|| models.first().map(|m| m.id.clone()))
}

pub async fn run(context: ChatContext, models: Vec<Model>, mut model: String) -> Result<()> {
    let (update_tx, mut update_rx) = mpsc::unbounded_channel::<TerminalUpdate>();
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();

    let coordinator = Coordinator::new(context, Arc::new(TerminalSink(update_tx)));
    let coordinator_task = tokio::spawn(coordinator.run(ui_rx));

    let color = supports_color();
    let render_task = tokio::spawn(async move {
        let mut renderer = TranscriptRenderer::new(color);
        let mut stdout = std::io::stdout();
        while let Some(update) = update_rx.recv().await {
            let text = match update {
                TerminalUpdate::Begin => renderer.begin_response(),
                TerminalUpdate::Notify(notification) => renderer.render(&notification),
            };
            if let Some(text) = text {
                if stream_write(&mut stdout, &text).is_err() {
                    break;
                }
            }
        }
    });

    note_info(&format!("Chatting with {model}. Type /help for commands."));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let event = match parse_line(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Prompt(prompt) => UiEvent::SendMessage {
                prompt,
                model: model.clone(),
            },
            ReplCommand::Stop => UiEvent::StopGeneration,
            ReplCommand::Clear => UiEvent::ClearChat,
            ReplCommand::ListModels => {
                models_cmd::run(&models);
                continue;
            }
            ReplCommand::SelectModel(id) => {
                if !models.is_empty() && !models.iter().any(|m| m.id == id) {
                    note_warn(&format!("{id} is not in the model catalog; using it anyway."));
                }
                model = id;
                note_success(&format!("Now chatting with {model}."));
                continue;
            }
            ReplCommand::Help => {
                println!("{HELP}");
                continue;
            }
            ReplCommand::Quit => break,
            ReplCommand::Unknown(command) => {
                note_warn(&format!("Unknown command {command}. Type /help for commands."));
                continue;
            }
        };

        debug!(?event, "Terminal event");
        if ui_tx.send(event).is_err() {
            return Err(ChatError::ChannelClosed("coordinator stopped".into()).into());
        }
    }

    // Closing the event queue ends the loop and cancels any live response.
    drop(ui_tx);
    coordinator_task.await.context("Coordinator task failed")?;
    render_task.await.context("Renderer task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prompts_and_commands() {
        assert_eq!(parse_line("   "), ReplCommand::Empty);
        assert_eq!(
            parse_line("  what is a qubit? "),
            ReplCommand::Prompt("what is a qubit?".into())
        );
        assert_eq!(parse_line("/stop"), ReplCommand::Stop);
        assert_eq!(parse_line("/clear"), ReplCommand::Clear);
        assert_eq!(parse_line("/models"), ReplCommand::ListModels);
        assert_eq!(
            parse_line("/model  gpt-4o-mini "),
            ReplCommand::SelectModel("gpt-4o-mini".into())
        );
        assert_eq!(parse_line("/quit"), ReplCommand::Quit);
        assert_eq!(parse_line("/exit"), ReplCommand::Quit);
    }

    #[test]
    fn rejects_unknown_or_incomplete_commands() {
        assert_eq!(parse_line("/model"), ReplCommand::Unknown("/model".into()));
        assert_eq!(parse_line("/launch now"), ReplCommand::Unknown("/launch now".into()));
    }

    #[test]
    fn selects_requested_or_first_model() {
        let models = vec![Model::new("a", ""), Model::new("b", "")];
        assert_eq!(select_model(Some("b".into()), &models).as_deref(), Some("b"));
        assert_eq!(select_model(None, &models).as_deref(), Some("a"));
        assert_eq!(select_model(None, &[]), None);
    }

    #[test]
    fn terminal_sink_keeps_begin_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TerminalSink(tx);
        sink.post(Notification::response("<p>a</p>"));
        sink.begin_response();
        sink.post(Notification::End);

        assert_eq!(
            rx.try_recv().unwrap(),
            TerminalUpdate::Notify(Notification::response("<p>a</p>"))
        );
        assert_eq!(rx.try_recv().unwrap(), TerminalUpdate::Begin);
        assert_eq!(rx.try_recv().unwrap(), TerminalUpdate::Notify(Notification::End));
    }
}
