//! Line-oriented terminal front end
//!
//! Turns input lines into session events and session updates into text.

use crate::booking::CardForm;
use crate::gateway::Recommendation;
use crate::runtime::SessionUpdate;
use crate::state_machine::{Event, FailureKind, ViewState};
use crate::transcript::Role;
use std::fmt::Write;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  <text>                          send a message
  /start                          open the chat
  /end                            end the chat and see your analysis
  /dismiss                        hide the error banner
  /join                           join the recommended circle
  /reserve                        reserve your seat
  /pay name|number|MM/YY|cvv      pay for the session
  /reset                          start over
  /help                           show this help
  /quit                           exit";

#[derive(Debug, Clone)]
pub enum Command {
    Event(Event),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try /help)")]
    Unknown(String),
    #[error("Usage: /pay name|number|MM/YY|cvv")]
    PayUsage,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if !line.starts_with('/') {
        return Ok(Some(Command::Event(Event::UserMessage {
            text: line.to_string(),
        })));
    }

    let (name, args) = line.split_once(' ').unwrap_or((line, ""));
    let event = match name {
        "/start" => Event::Start,
        "/end" => Event::EndSession,
        "/dismiss" => Event::DismissBanner,
        "/join" => Event::JoinCircle,
        "/reserve" => Event::ReserveSeat,
        "/reset" => Event::Reset,
        "/pay" => Event::SubmitPayment {
            form: parse_card(args)?,
        },
        "/help" => return Ok(Some(Command::Help)),
        "/quit" | "/exit" => return Ok(Some(Command::Quit)),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(Command::Event(event)))
}

fn parse_card(args: &str) -> Result<CardForm, CommandError> {
    let fields: Vec<&str> = args.split('|').map(str::trim).collect();
    match fields.as_slice() {
        [name, number, expiry, cvv] => Ok(CardForm::new(name, number, expiry, cvv)),
        _ => Err(CommandError::PayUsage),
    }
}

/// Text for an update, or `None` when there is nothing worth printing
pub fn render_update(update: &SessionUpdate) -> Option<String> {
    match update {
        SessionUpdate::Message { message } => Some(match message.role {
            Role::User => format!("you: {}", message.content),
            Role::Assistant => format!("mentra: {}", message.content),
        }),
        SessionUpdate::State { state } => render_state(state),
        SessionUpdate::Cleared => None,
        SessionUpdate::Error { message } => Some(format!("! {message}")),
    }
}

pub fn render_state(state: &ViewState) -> Option<String> {
    let text = match state {
        ViewState::Landing => {
            "Welcome to Mentra. Say whatever is on your mind, or type /start.".to_string()
        }
        ViewState::Chatting {
            awaiting_reply,
            banner,
            ..
        } => match banner {
            Some(banner) => match banner.kind {
                FailureKind::Busy => {
                    "! Mentra is busy right now, try again in a moment. (/dismiss)".to_string()
                }
                FailureKind::Generic => format!("! Something went wrong: {} (/dismiss)", banner.message),
            },
            None if *awaiting_reply => "(mentra is typing)".to_string(),
            None => return None,
        },
        ViewState::Analyzing { .. } => "Reflecting on your conversation...".to_string(),
        ViewState::Results { analysis } => {
            let mut out = String::new();
            let _ = writeln!(out, "Theme: {}", analysis.theme);
            let _ = writeln!(out, "{}", analysis.summary);
            let _ = writeln!(out, "Insight: {}", analysis.insight);
            match &analysis.recommendation {
                Recommendation::Group(group) => {
                    let _ = writeln!(out, "Circle: {} ({})", group.theme, group.focus);
                    let _ = writeln!(out, "{}", group.description);
                    let _ = writeln!(
                        out,
                        "Led by {}, {}",
                        group.therapist.name, group.therapist.credentials
                    );
                }
                Recommendation::Therapists {
                    matches,
                    suggested_action,
                } => {
                    for m in matches {
                        let _ = writeln!(
                            out,
                            "- {} ({}), {:.0}% match: {}",
                            m.name, m.specialty, m.match_score, m.description
                        );
                    }
                    let _ = writeln!(out, "{suggested_action}");
                }
            }
            out.push_str("Type /join to find a circle.");
            out
        }
        ViewState::Waiting { .. } => "Finding your circle... (/reset to cancel)".to_string(),
        ViewState::Proposal { booking, .. } => format!(
            "A seat is open: {} for {}. Type /reserve to hold it.",
            booking.date_time, booking.price
        ),
        ViewState::Payment {
            processing: true, ..
        } => "Processing payment...".to_string(),
        ViewState::Payment { booking, .. } => format!(
            "Total {}. Pay with /pay name|number|MM/YY|cvv",
            booking.price
        ),
        ViewState::Confirmed {
            booking,
            card_last4,
            ..
        } => format!(
            "You're in. See you {}. Charged {} to card ending {}. Type /reset to return home.",
            booking.date_time, booking.price, card_last4
        ),
    };
    Some(text)
}
