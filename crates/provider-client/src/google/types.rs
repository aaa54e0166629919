use serde::{Deserialize, Serialize};

/// Draft of a calendar event to be created. Times are RFC 3339 strings in
/// the configured timezone.
#[derive(Debug, Clone, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub start: String,
    pub end: String,
    pub description: String,
    pub location: String,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentMessage {
    pub id: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    pub start: String,
    pub end: String,
}

// Wire shapes.

#[derive(Debug, Deserialize)]
pub(crate) struct GmailSendResponse {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GmailListResponse {
    #[serde(default)]
    pub messages: Vec<GmailMessageRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GmailMessageRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub payload: GmailPayload,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GmailPayload {
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GmailHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarEventResponse {
    pub id: String,
    #[serde(rename = "htmlLink", default)]
    pub html_link: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub start: CalendarTime,
    #[serde(default)]
    pub end: CalendarTime,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CalendarTime {
    #[serde(rename = "dateTime")]
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl CalendarTime {
    pub(crate) fn label(&self) -> String {
        self.date_time
            .clone()
            .or_else(|| self.date.clone())
            .unwrap_or_default()
    }
}
