//! Line-driven admin console.

use std::fmt::Write as _;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;

use warden_engine::warden_types::{
    AdminError, BanDuration, ImpersonationReason, Password, UserId,
};
use warden_engine::{AdminControl, AdminSessionState, Moderation, RenewOutcome};

use crate::terminal::Prompter;

pub const HELP: &str = "\
Commands:
  tap                                 hidden trigger; three quick taps start `enter`
  enter                               enter admin mode (founder only)
  renew                               extend the admin session
  end                                 leave admin mode
  status                              show admin and impersonation state
  ban <user> <hours|perm> <reason...> ban an account
  shadowban <user> <reason...>        shadowban an account
  unban <user>                        lift a ban
  unshadowban <user>                  lift a shadowban
  impersonate <user> <reason...>      impersonate an account (password prompted)
  end-impersonation                   end the live impersonation session
  help                                show this text
  quit                                end all sessions and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tap,
    Enter,
    Renew,
    End,
    Status,
    Ban {
        user: String,
        duration: BanDuration,
        reason: String,
    },
    Shadowban {
        user: String,
        reason: String,
    },
    Unban {
        user: String,
    },
    Unshadowban {
        user: String,
    },
    Impersonate {
        user: String,
        reason: String,
    },
    EndImpersonation,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid ban duration '{0}': expected hours or `perm`")]
    InvalidDuration(String),
}

impl Command {
    /// `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let mut next = |usage| words.next().map(str::to_string).ok_or(CommandError::Usage(usage));

        let command = match name.to_ascii_lowercase().as_str() {
            "tap" => Self::Tap,
            "enter" => Self::Enter,
            "renew" => Self::Renew,
            "end" => Self::End,
            "status" => Self::Status,
            "ban" => {
                const USAGE: &str = "ban <user> <hours|perm> <reason...>";
                let user = next(USAGE)?;
                let duration = parse_duration(&next(USAGE)?)?;
                let reason = rest(line, 3).ok_or(CommandError::Usage(USAGE))?;
                Self::Ban {
                    user,
                    duration,
                    reason,
                }
            }
            "shadowban" => {
                const USAGE: &str = "shadowban <user> <reason...>";
                let user = next(USAGE)?;
                let reason = rest(line, 2).ok_or(CommandError::Usage(USAGE))?;
                Self::Shadowban { user, reason }
            }
            "unban" => Self::Unban {
                user: next("unban <user>")?,
            },
            "unshadowban" => Self::Unshadowban {
                user: next("unshadowban <user>")?,
            },
            "impersonate" => {
                const USAGE: &str = "impersonate <user> <reason...>";
                let user = next(USAGE)?;
                let reason = rest(line, 2).ok_or(CommandError::Usage(USAGE))?;
                Self::Impersonate { user, reason }
            }
            "end-impersonation" => Self::EndImpersonation,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    /// Whether the command acts on other accounts and is only offered in admin mode.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Self::Ban { .. }
                | Self::Shadowban { .. }
                | Self::Unban { .. }
                | Self::Unshadowban { .. }
                | Self::Impersonate { .. }
        )
    }
}

fn parse_duration(raw: &str) -> Result<BanDuration, CommandError> {
    let lowered = raw.to_ascii_lowercase();
    if matches!(lowered.as_str(), "perm" | "permanent") {
        return Ok(BanDuration::Permanent);
    }
    lowered
        .trim_end_matches('h')
        .parse::<u32>()
        .map(BanDuration::from_hours)
        .map_err(|_| CommandError::InvalidDuration(raw.to_string()))
}

/// Text after the first `skip` words, with inner spacing preserved.
fn rest(line: &str, skip: usize) -> Option<String> {
    let mut remaining = line.trim_start();
    for _ in 0..skip {
        let end = remaining.find(char::is_whitespace)?;
        remaining = remaining[end..].trim_start();
    }
    let remaining = remaining.trim_end();
    (!remaining.is_empty()).then(|| remaining.to_string())
}

fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn wall_clock_after(remaining: Duration) -> String {
    chrono::Duration::from_std(remaining)
        .ok()
        .and_then(|delta| chrono::Local::now().checked_add_signed(delta))
        .map_or_else(|| "unknown".to_string(), |at| at.format("%H:%M:%S").to_string())
}

pub fn describe_status(control: &AdminControl) -> String {
    let mut out = String::new();
    match control.session().state() {
        AdminSessionState::Active { .. } => {
            let remaining = control.session().remaining().unwrap_or_default();
            let _ = writeln!(
                out,
                "admin mode: active, {} left (until {})",
                format_remaining(remaining),
                wall_clock_after(remaining)
            );
        }
        AdminSessionState::Inactive => {
            let _ = writeln!(out, "admin mode: inactive");
        }
    }
    match control.impersonation().current() {
        Some(session) => {
            let remaining = session
                .expires_at()
                .saturating_duration_since(tokio::time::Instant::now());
            let _ = write!(
                out,
                "impersonating: {} ({} left)",
                session.target_user_id(),
                format_remaining(remaining)
            );
        }
        None => {
            let _ = write!(out, "impersonating: nobody");
        }
    }
    out
}

/// Local checks the gateway repeats, run before the password is collected.
fn check_impersonation(user: &str, reason: &str) -> Result<(), AdminError> {
    UserId::new(user)?;
    ImpersonationReason::new(reason)?;
    Ok(())
}

fn report(outcome: Result<(), AdminError>, done: &str) {
    match outcome {
        Ok(()) => println!("{done}"),
        Err(e) => println!("error: {}", e.user_message()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub async fn execute(control: &AdminControl, prompter: &Prompter, command: Command) -> Result<Flow> {
    if command.is_privileged() && !control.session().is_active() {
        println!("error: enter admin mode first");
        return Ok(Flow::Continue);
    }

    match command {
        Command::Tap => {
            if control.register_trigger_tap() {
                report(enter(control).await, "admin mode active");
            }
        }
        Command::Enter => report(enter(control).await, "admin mode active"),
        Command::Renew => match control.session().renew().await {
            RenewOutcome::Renewed { .. } => println!("admin session extended"),
            RenewOutcome::NotActive => println!("admin mode is not active"),
            RenewOutcome::Ended => println!("verification failed; admin mode ended"),
            RenewOutcome::Superseded => println!("admin session changed; nothing renewed"),
        },
        Command::End => {
            if control.session().end() {
                println!("admin mode ended");
            } else {
                println!("admin mode is not active");
            }
        }
        Command::Status => println!("{}", describe_status(control)),
        Command::Ban {
            user,
            duration,
            reason,
        } => report(
            control
                .gateway()
                .execute(
                    &user,
                    Moderation::Ban {
                        reason: &reason,
                        duration,
                    },
                )
                .await,
            "banned",
        ),
        Command::Shadowban { user, reason } => report(
            control
                .gateway()
                .execute(&user, Moderation::Shadowban { reason: &reason })
                .await,
            "shadowbanned",
        ),
        Command::Unban { user } => report(
            control.gateway().execute(&user, Moderation::Unban).await,
            "unbanned",
        ),
        Command::Unshadowban { user } => report(
            control.gateway().execute(&user, Moderation::Unshadowban).await,
            "unshadowbanned",
        ),
        Command::Impersonate { user, reason } => {
            if let Err(e) = check_impersonation(&user, &reason) {
                println!("error: {}", e.user_message());
                return Ok(Flow::Continue);
            }
            let Some(password) = prompter.read_secret("Password: ").await? else {
                println!("impersonation cancelled");
                return Ok(Flow::Continue);
            };
            let password = Password::new(password);
            match control.gateway().impersonate(&user, &reason, &password).await {
                Ok(session) => println!(
                    "impersonating {} for {} minutes",
                    session.target_user_id(),
                    (session.expires_at() - session.started_at()).as_secs() / 60
                ),
                Err(e) => println!("error: {}", e.user_message()),
            }
        }
        Command::EndImpersonation => {
            if control.gateway().end_impersonation().await {
                println!("impersonation ended");
            } else {
                println!("no live impersonation");
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

async fn enter(control: &AdminControl) -> Result<(), AdminError> {
    control.session().enter().await.map(|_| ())
}

/// Read-eval loop until `quit` or end of input.
pub async fn run(control: &AdminControl, prompter: &Prompter) -> Result<()> {
    if !prompter.is_interactive() {
        println!("stdin is not a terminal: device verification is unavailable");
    }
    while let Some(line) = prompter.read_line("warden> ").await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if execute(control, prompter, command).await? == Flow::Quit {
            break;
        }
    }
    Ok(())
}
