use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use provider_client::google::{EventDraft, WorkspaceError};
use regex::Regex;
use serde_json::json;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, PrimitiveDateTime};

use super::wrap_handler;
use crate::state::{AppContext, DomainRequest, HandlerDescriptor, HandlerInvoke, HandlerResult};

const LIST_LIMIT: usize = 10;
const DEFAULT_TITLE: &str = "New event";

const DATETIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

static DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2})?").expect("datetime pattern")
});
static QUOTED_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("quoted title pattern"));
static NAMED_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:called|titled|chamado)\s+(.+?)(?:\s+\d{4}-\d{2}-\d{2}T.*)?$")
        .expect("named title pattern")
});

#[must_use]
pub fn descriptor() -> HandlerDescriptor {
    HandlerDescriptor::new(
        "calendar",
        "Manages Google Calendar, including creating and listing events.",
        &["calendar", "event", "schedule", "meeting", "appointment"],
        &["create event", "list events"],
        true,
        HandlerInvoke::Ready(wrap_handler(handle)),
    )
}

/// What the free text asks the calendar handler to do. A request carrying
/// at least one RFC-3339-style timestamp is a creation; anything else lists
/// the upcoming agenda.
#[derive(Debug, PartialEq, Eq)]
pub enum CalendarIntent {
    Create {
        title: String,
        start: String,
        end: String,
    },
    List,
}

#[must_use]
pub fn parse_intent(text: &str) -> CalendarIntent {
    let stamps: Vec<String> = DATETIME_RE
        .find_iter(text)
        .map(|m| normalize_stamp(m.as_str()))
        .collect();
    let Some(start) = stamps.first().cloned() else {
        return CalendarIntent::List;
    };

    let end = stamps
        .get(1)
        .cloned()
        .unwrap_or_else(|| one_hour_after(&start));

    let title = QUOTED_TITLE_RE
        .captures(text)
        .or_else(|| NAMED_TITLE_RE.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    CalendarIntent::Create { title, start, end }
}

fn normalize_stamp(stamp: &str) -> String {
    // Seconds are optional in user text but fixed on the wire.
    if stamp.len() == 16 {
        format!("{stamp}:00")
    } else {
        stamp.to_string()
    }
}

fn one_hour_after(start: &str) -> String {
    PrimitiveDateTime::parse(start, DATETIME_FORMAT)
        .ok()
        .and_then(|parsed| parsed.checked_add(Duration::hours(1)))
        .and_then(|end| end.format(DATETIME_FORMAT).ok())
        .unwrap_or_else(|| start.to_string())
}

async fn handle(context: Arc<AppContext>, request: DomainRequest) -> Result<HandlerResult> {
    let Some(token) = request.auth_token.as_deref() else {
        return Ok(HandlerResult::authentication_required("calendar"));
    };

    match parse_intent(&request.text) {
        CalendarIntent::Create { title, start, end } => {
            let draft = EventDraft {
                title: title.clone(),
                start: start.clone(),
                end,
                description: String::new(),
                location: String::new(),
                attendees: Vec::new(),
            };
            match context.providers.workspace.create_event(token, &draft).await {
                Ok(created) => Ok(HandlerResult::ok_with_data(
                    format!("Event '{title}' created for {start}."),
                    json!({
                        "type": "event_created",
                        "event_id": created.id,
                        "html_link": created.html_link,
                    }),
                )),
                Err(WorkspaceError::Unauthorized) => {
                    Ok(HandlerResult::authentication_required("calendar"))
                }
                Err(error) => Ok(HandlerResult::failure(
                    "I couldn't create that event. Please try again.",
                    Some(error.to_string()),
                )),
            }
        }
        CalendarIntent::List => {
            match context
                .providers
                .workspace
                .list_events(token, LIST_LIMIT)
                .await
            {
                Ok(events) if events.is_empty() => {
                    Ok(HandlerResult::ok("Your calendar is clear."))
                }
                Ok(events) => {
                    let mut message = format!("You have {} upcoming events:\n", events.len());
                    for event in &events {
                        let _ = writeln!(message, "• {} — {}", event.title, event.start);
                    }
                    Ok(HandlerResult::ok_with_data(
                        message.trim_end(),
                        json!({ "type": "event_list", "events": events }),
                    ))
                }
                Err(WorkspaceError::Unauthorized) => {
                    Ok(HandlerResult::authentication_required("calendar"))
                }
                Err(error) => Ok(HandlerResult::failure(
                    "I couldn't read your calendar. Please try again.",
                    Some(error.to_string()),
                )),
            }
        }
    }
}
