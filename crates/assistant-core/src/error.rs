use thiserror::Error;

/// Failure taxonomy for the request pipeline. Low-level components return
/// these as values; only the dispatcher owns a catch-all, and it converts
/// everything into a well-formed handler result.
#[derive(Debug, Clone, Error)]
pub enum AssistantError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("authentication required for {0}")]
    AuthenticationRequired(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("unknown provider '{requested}'; available: {available:?}")]
    ProviderNotFound {
        requested: String,
        available: Vec<&'static str>,
    },
    #[error("unknown handler: {0}")]
    HandlerNotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}
