//! Terminal prompts and the device-owner verifier built on them.
//!
//! All reads go through one [`Prompter`] so a verification prompt can never
//! interleave with the console's own line reading.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use warden_engine::{DeviceVerifier, VerifyFut};

pub struct Prompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
    interactive: bool,
}

impl Prompter {
    pub fn stdin() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            interactive: io::stdin().is_terminal(),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// `Ok(None)` on end of input.
    pub async fn read_line(&self, prompt: &str) -> io::Result<Option<String>> {
        let mut lines = self.lines.lock().await;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        lines.next_line().await
    }

    /// Like [`Prompter::read_line`], without echo when attached to a terminal.
    pub async fn read_secret(&self, prompt: &str) -> io::Result<Option<String>> {
        if !self.interactive {
            return self.read_line(prompt).await;
        }
        let _exclusive = self.lines.lock().await;
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || read_hidden(&prompt))
            .await
            .map_err(io::Error::other)?
    }
}

fn read_hidden(prompt: &str) -> io::Result<Option<String>> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    terminal::enable_raw_mode()?;
    let secret = read_hidden_keys();
    let restored = terminal::disable_raw_mode();
    writeln!(stdout)?;
    restored?;
    secret
}

fn read_hidden_keys() -> io::Result<Option<String>> {
    let mut secret = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => return Ok(Some(secret)),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Backspace => {
                secret.pop();
            }
            KeyCode::Char(c) => secret.push(c),
            _ => {}
        }
    }
}

/// Device-owner confirmation at the terminal. Unavailable when stdin is not
/// a terminal, so piped input can never confirm a privileged action.
pub struct TerminalVerifier {
    prompter: Arc<Prompter>,
}

impl TerminalVerifier {
    pub fn new(prompter: Arc<Prompter>) -> Self {
        Self { prompter }
    }
}

impl DeviceVerifier for TerminalVerifier {
    fn can_verify(&self) -> bool {
        self.prompter.is_interactive()
    }

    fn verify<'a>(&'a self, reason: &'a str) -> VerifyFut<'a> {
        Box::pin(async move {
            let prompt = format!("Confirm device owner to {reason} [y/N]: ");
            match self.prompter.read_line(&prompt).await {
                Ok(Some(answer)) => is_affirmative(&answer),
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!(error = %e, "Verification prompt failed");
                    false
                }
            }
        })
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
