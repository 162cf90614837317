//! Interactive API key prompt.
//!
//! On a terminal the key is read in raw mode so nothing is echoed. Piped
//! input is read as a plain line.

use std::io::{BufRead, IsTerminal, Write};

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use qchat_providers::KeyPrompter;

use crate::terminal_output::note_error;

const PROMPT: &str = "Enter your qBraid API key: ";

pub struct StdinPrompter;

#[async_trait]
impl KeyPrompter for StdinPrompter {
    async fn request_key(&self) -> Option<String> {
        let key = tokio::task::spawn_blocking(|| {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{PROMPT}");
            let _ = stdout.flush();

            if std::io::stdin().is_terminal() {
                read_hidden()
            } else {
                read_piped()
            }
        })
        .await
        .ok()
        .flatten()?;

        Some(key.trim().to_string())
    }

    async fn report_invalid(&self, message: &str) {
        note_error(message);
    }
}

fn read_piped() -> Option<String> {
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

fn read_hidden() -> Option<String> {
    if enable_raw_mode().is_err() {
        return read_piped();
    }

    let mut input = String::new();
    let outcome = loop {
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(_) => break KeyInput::Abort,
        };
        match apply_key(&mut input, key) {
            KeyInput::Pending => continue,
            done => break done,
        }
    };

    let _ = disable_raw_mode();
    println!();

    match outcome {
        KeyInput::Submit => Some(input),
        _ => None,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyInput {
    Pending,
    Submit,
    Abort,
}

/// Fold one key press into the hidden input buffer.
fn apply_key(input: &mut String, key: KeyEvent) -> KeyInput {
    if key.kind != KeyEventKind::Press {
        return KeyInput::Pending;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyInput::Abort,
        KeyCode::Esc => KeyInput::Abort,
        KeyCode::Enter => KeyInput::Submit,
        KeyCode::Backspace => {
            input.pop();
            KeyInput::Pending
        }
        KeyCode::Char(c) => {
            input.push(c);
            KeyInput::Pending
        }
        _ => KeyInput::Pending,
    }
}
