use std::time::Duration as StdDuration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::instrument;

use super::types::{
    CalendarEventResponse, CalendarListResponse, CreatedEvent, EventDraft, EventSummary,
    GmailListResponse, GmailMessage, GmailSendResponse, MessageSummary, SentMessage,
};

const GMAIL_API: &str = "https://gmail.googleapis.com/gmail/v1";
const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
const DEFAULT_FROM_NAME: &str = "Assistant";
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(15);

#[derive(Debug, Clone, Error)]
pub enum WorkspaceError {
    #[error("authentication required")]
    Unauthorized,
    #[error("workspace request failed: {0}")]
    Http(String),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error("failed to decode workspace response: {0}")]
    Decode(String),
}

impl WorkspaceError {
    fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Unauthorized
        } else {
            Self::Status(status)
        }
    }
}

/// Bearer-token Gmail and Calendar collaborator. Every call takes the
/// caller's OAuth access token; nothing is cached between requests.
#[derive(Debug)]
pub struct WorkspaceClient {
    http: Client,
}

impl Default for WorkspaceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceClient {
    #[must_use]
    pub fn new() -> Self {
        let http = Client::builder()
            .user_agent("AssistantBackend/1.0")
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");
        Self { http }
    }

    #[instrument(name = "workspace.send_email", skip(self, access_token, body))]
    pub async fn send_email(
        &self,
        access_token: &str,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SentMessage, WorkspaceError> {
        let raw = encode_message(DEFAULT_FROM_NAME, to, subject, body);
        let response = self
            .http
            .post(format!("{GMAIL_API}/users/me/messages/send"))
            .bearer_auth(access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await
            .map_err(|error| WorkspaceError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(WorkspaceError::from_status(response.status()));
        }

        let sent: GmailSendResponse = response
            .json()
            .await
            .map_err(|error| WorkspaceError::Decode(error.to_string()))?;
        Ok(SentMessage {
            id: sent.id,
            to: to.to_string(),
        })
    }

    #[instrument(name = "workspace.search_messages", skip(self, access_token))]
    pub async fn search_messages(
        &self,
        access_token: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<MessageSummary>, WorkspaceError> {
        let max = max_results.to_string();
        let response = self
            .http
            .get(format!("{GMAIL_API}/users/me/messages"))
            .bearer_auth(access_token)
            .query(&[("q", query), ("maxResults", max.as_str())])
            .send()
            .await
            .map_err(|error| WorkspaceError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(WorkspaceError::from_status(response.status()));
        }

        let listing: GmailListResponse = response
            .json()
            .await
            .map_err(|error| WorkspaceError::Decode(error.to_string()))?;

        let mut summaries = Vec::with_capacity(listing.messages.len());
        for reference in listing.messages.into_iter().take(max_results) {
            summaries.push(self.fetch_message(access_token, &reference.id).await?);
        }
        Ok(summaries)
    }

    async fn fetch_message(
        &self,
        access_token: &str,
        id: &str,
    ) -> Result<MessageSummary, WorkspaceError> {
        let response = self
            .http
            .get(format!("{GMAIL_API}/users/me/messages/{id}"))
            .bearer_auth(access_token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Subject"),
            ])
            .send()
            .await
            .map_err(|error| WorkspaceError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(WorkspaceError::from_status(response.status()));
        }

        let message: GmailMessage = response
            .json()
            .await
            .map_err(|error| WorkspaceError::Decode(error.to_string()))?;
        let header = |name: &str| {
            message
                .payload
                .headers
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.clone())
                .unwrap_or_default()
        };
        Ok(MessageSummary {
            id: message.id,
            from: header("From"),
            subject: header("Subject"),
            snippet: message.snippet,
        })
    }

    #[instrument(name = "workspace.create_event", skip(self, access_token, draft))]
    pub async fn create_event(
        &self,
        access_token: &str,
        draft: &EventDraft,
    ) -> Result<CreatedEvent, WorkspaceError> {
        let attendees: Vec<_> = draft
            .attendees
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();
        let payload = json!({
            "summary": draft.title,
            "description": draft.description,
            "location": draft.location,
            "start": { "dateTime": draft.start, "timeZone": DEFAULT_TIMEZONE },
            "end": { "dateTime": draft.end, "timeZone": DEFAULT_TIMEZONE },
            "attendees": attendees,
        });

        let response = self
            .http
            .post(format!("{CALENDAR_API}/calendars/primary/events"))
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|error| WorkspaceError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(WorkspaceError::from_status(response.status()));
        }

        let created: CalendarEventResponse = response
            .json()
            .await
            .map_err(|error| WorkspaceError::Decode(error.to_string()))?;
        Ok(CreatedEvent {
            id: created.id,
            html_link: created.html_link,
        })
    }

    #[instrument(name = "workspace.list_events", skip(self, access_token))]
    pub async fn list_events(
        &self,
        access_token: &str,
        max_results: usize,
    ) -> Result<Vec<EventSummary>, WorkspaceError> {
        let time_min = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| WorkspaceError::Decode(error.to_string()))?;
        let max = max_results.to_string();
        let response = self
            .http
            .get(format!("{CALENDAR_API}/calendars/primary/events"))
            .bearer_auth(access_token)
            .query(&[
                ("maxResults", max.as_str()),
                ("orderBy", "startTime"),
                ("singleEvents", "true"),
                ("timeMin", time_min.as_str()),
            ])
            .send()
            .await
            .map_err(|error| WorkspaceError::Http(error.to_string()))?;
        if !response.status().is_success() {
            return Err(WorkspaceError::from_status(response.status()));
        }

        let listing: CalendarListResponse = response
            .json()
            .await
            .map_err(|error| WorkspaceError::Decode(error.to_string()))?;
        Ok(listing
            .items
            .into_iter()
            .map(|event| EventSummary {
                id: event.id,
                title: event.summary,
                start: event.start.label(),
                end: event.end.label(),
            })
            .collect())
    }
}

/// RFC 2822 message encoded the way the Gmail send endpoint expects:
/// URL-safe base64 without padding.
fn encode_message(from_name: &str, to: &str, subject: &str, body: &str) -> String {
    let message = format!(
        "From: {from_name}\r\nTo: {to}\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}"
    );
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}
