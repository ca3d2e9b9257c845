//! Failure taxonomy shared by the extraction adapter, the store and the session.

use thiserror::Error;

/// Hint appended to failures caused by the document rather than the service.
pub const CLARITY_HINT: &str = "Please check your image clarity and try again.";
pub const KEY_HINT: &str =
    "Please check your Gemini API key (GEMINI_API_KEY or scanner auth paste-gemini-key).";
pub const QUOTA_HINT: &str = "The API quota is exhausted, please try again later.";
pub const CONNECTION_HINT: &str = "Please check your connection and try again.";
pub const MODEL_HINT: &str = "Please check the model name in config.toml.";

/// Longest slice of a non-JSON error body shown to the user.
const MAX_DETAIL_CHARS: usize = 200;

/// The input document could not be obtained.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("File reading failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type '{0}' (expected an image or a PDF)")]
    UnsupportedType(String),

    #[error("File is empty")]
    Empty,
}

/// The inference call failed or returned something that is not an extraction result.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No API key was available for the inference service
    #[error("Missing credential: {0}")]
    Credential(String),

    /// Connection failed, timed out or the request could not be built
    #[error("Request to inference service failed: {0}")]
    Transport(String),

    /// Non-2xx status (quota, auth, bad request)
    #[error("Inference service error {status}: {body}")]
    Service { status: u16, body: String },

    #[error("No data returned from Gemini")]
    EmptyResponse,

    /// Response body did not decode into the statement shape
    #[error("Malformed extraction response: {0}")]
    Malformed(String),
}

impl ExtractionError {
    /// What the user can do about this failure.
    pub fn hint(&self) -> &'static str {
        match self {
            ExtractionError::Credential(_) => KEY_HINT,
            ExtractionError::Transport(_) => CONNECTION_HINT,
            ExtractionError::Service { status, .. } => match status {
                401 | 403 => KEY_HINT,
                404 => MODEL_HINT,
                429 => QUOTA_HINT,
                500..=599 => CONNECTION_HINT,
                _ => CLARITY_HINT,
            },
            ExtractionError::EmptyResponse | ExtractionError::Malformed(_) => CLARITY_HINT,
        }
    }

    /// Message suitable for showing to the user, always ending in [`Self::hint`].
    pub fn user_message(&self) -> String {
        match self {
            ExtractionError::Service { status, body } => format!(
                "Inference service error {status}: {}. {}",
                service_detail(body),
                self.hint()
            ),
            _ => format!("{self}. {}", self.hint()),
        }
    }
}

/// `error.message` of a Google API error body, else the (truncated) body itself.
fn service_detail(body: &str) -> String {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string));
    let detail = match message {
        Some(m) => m,
        None => body.trim().chars().take(MAX_DETAIL_CHARS).collect(),
    };
    let detail = detail.trim().trim_end_matches('.');
    if detail.is_empty() {
        "no details".to_string()
    } else {
        detail.to_string()
    }
}

/// An edit entry point was called in a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("No extraction result loaded")]
    NoResult,

    #[error("Row {index} is out of range (have {len} rows)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("No row is being edited")]
    NoActiveEdit,

    #[error("An extraction is in progress")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(status: u16, body: &str) -> ExtractionError {
        ExtractionError::Service {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_user_message_adds_hint_for_document_failures() {
        let m = ExtractionError::Malformed("missing transactions".into()).user_message();
        assert!(m.starts_with("Malformed extraction response: missing transactions"));
        assert!(m.ends_with(CLARITY_HINT));

        let m = ExtractionError::EmptyResponse.user_message();
        assert_eq!(m, format!("No data returned from Gemini. {CLARITY_HINT}"));
    }

    #[test]
    fn test_credential_and_transport_hints() {
        let m = ExtractionError::Credential("no Gemini API key configured".into()).user_message();
        assert_eq!(m, format!("Missing credential: no Gemini API key configured. {KEY_HINT}"));

        let m = ExtractionError::Transport("connection refused".into()).user_message();
        assert!(m.starts_with("Request to inference service failed: connection refused"));
        assert!(m.ends_with(CONNECTION_HINT));
    }

    #[test]
    fn test_service_message_uses_google_error_message() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted.","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            service(429, body).user_message(),
            format!("Inference service error 429: Resource has been exhausted. {QUOTA_HINT}")
        );
        assert!(!service(429, body).user_message().contains('{'));
    }

    #[test]
    fn test_service_hint_by_status() {
        assert_eq!(service(401, "").hint(), KEY_HINT);
        assert_eq!(service(403, "").hint(), KEY_HINT);
        assert_eq!(service(404, "").hint(), MODEL_HINT);
        assert_eq!(service(429, "").hint(), QUOTA_HINT);
        assert_eq!(service(503, "").hint(), CONNECTION_HINT);
        assert_eq!(service(400, "").hint(), CLARITY_HINT);
    }

    #[test]
    fn test_service_detail_falls_back_to_trimmed_body() {
        assert_eq!(
            service(502, "  <html>bad gateway</html>\n").user_message(),
            format!("Inference service error 502: <html>bad gateway</html>. {CONNECTION_HINT}")
        );
        assert_eq!(
            service(500, "").user_message(),
            format!("Inference service error 500: no details. {CONNECTION_HINT}")
        );
        let long = "x".repeat(500);
        let m = service(500, &long).user_message();
        assert!(m.contains(&"x".repeat(MAX_DETAIL_CHARS)));
        assert!(!m.contains(&"x".repeat(MAX_DETAIL_CHARS + 1)));
    }
}
