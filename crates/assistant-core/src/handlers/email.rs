use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use provider_client::google::WorkspaceError;
use regex::Regex;
use serde_json::json;

use super::wrap_handler;
use crate::state::{AppContext, DomainRequest, HandlerDescriptor, HandlerInvoke, HandlerResult};

const SEARCH_LIMIT: usize = 10;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("address pattern")
});
static SUBJECT_BODY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bsubject:?\s+(.+?)(?:\s+\bbody:?\s+(.+))?$").expect("subject pattern")
});
static SEARCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:search|find|procurar|buscar)\b\s+(?:for\s+)?(?:emails?\s+)?(?:about\s+)?(.+)$")
        .expect("search pattern")
});

#[must_use]
pub fn descriptor() -> HandlerDescriptor {
    HandlerDescriptor::new(
        "email",
        "Manages emails via Gmail, including sending and searching for messages.",
        &["email", "gmail", "send", "message", "mail", "inbox"],
        &["send email", "search emails"],
        true,
        HandlerInvoke::Ready(wrap_handler(handle)),
    )
}

/// What the free text asks the mail handler to do.
#[derive(Debug, PartialEq, Eq)]
pub enum MailIntent {
    Send {
        to: String,
        subject: String,
        body: String,
    },
    Search {
        query: String,
    },
    Unclear,
}

#[must_use]
pub fn parse_intent(text: &str) -> MailIntent {
    if let Some(captures) = SEARCH_RE.captures(text) {
        let query = captures
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if !query.is_empty() {
            return MailIntent::Search { query };
        }
    }

    if let Some(address) = ADDRESS_RE.find(text) {
        let (subject, body) = match SUBJECT_BODY_RE.captures(text) {
            Some(captures) => {
                let subject = captures
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                let body = captures
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_else(|| subject.clone());
                (subject, body)
            }
            None => return MailIntent::Unclear,
        };
        return MailIntent::Send {
            to: address.as_str().to_string(),
            subject,
            body,
        };
    }

    MailIntent::Unclear
}

async fn handle(context: Arc<AppContext>, request: DomainRequest) -> Result<HandlerResult> {
    let Some(token) = request.auth_token.as_deref() else {
        // The dispatcher gates this, but the handler stays safe on its own.
        return Ok(HandlerResult::authentication_required("email"));
    };

    match parse_intent(&request.text) {
        MailIntent::Send { to, subject, body } => {
            match context
                .providers
                .workspace
                .send_email(token, &to, &subject, &body)
                .await
            {
                Ok(sent) => Ok(HandlerResult::ok_with_data(
                    format!("Email sent to {to}."),
                    json!({ "type": "email_sent", "message_id": sent.id, "to": sent.to }),
                )),
                Err(WorkspaceError::Unauthorized) => {
                    Ok(HandlerResult::authentication_required("email"))
                }
                Err(error) => Ok(HandlerResult::failure(
                    "I couldn't send that email. Please try again.",
                    Some(error.to_string()),
                )),
            }
        }
        MailIntent::Search { query } => {
            match context
                .providers
                .workspace
                .search_messages(token, &query, SEARCH_LIMIT)
                .await
            {
                Ok(messages) if messages.is_empty() => Ok(HandlerResult::ok(format!(
                    "No emails matched '{query}'."
                ))),
                Ok(messages) => {
                    let mut message =
                        format!("Found {} emails matching '{query}':\n", messages.len());
                    for summary in &messages {
                        let _ = writeln!(message, "• {} — {}", summary.from, summary.subject);
                    }
                    Ok(HandlerResult::ok_with_data(
                        message.trim_end(),
                        json!({ "type": "email_list", "messages": messages }),
                    ))
                }
                Err(WorkspaceError::Unauthorized) => {
                    Ok(HandlerResult::authentication_required("email"))
                }
                Err(error) => Ok(HandlerResult::failure(
                    "I couldn't search your inbox. Please try again.",
                    Some(error.to_string()),
                )),
            }
        }
        MailIntent::Unclear => Ok(HandlerResult::failure(
            "Tell me who to write to and what about — for example \
'send an email to ana@example.com subject: dinner body: see you at 8'.",
            Some("could not extract recipient and subject".to_string()),
        )),
    }
}
