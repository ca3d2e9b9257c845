//! Gemini `generateContent` client used as the statement extractor.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use scanner_core::{ExtractionError, ExtractionResult};
use serde::Deserialize;
use std::time::Duration;

use crate::decode::decode_extraction;
use crate::extractor::StatementExtractor;
use crate::payload::DocumentPayload;
use crate::request::build_request;

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_THINKING_BUDGET: i32 = 4000;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// None leaves thinking at the model default
    pub thinking_budget: Option<i32>,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            thinking_budget: Some(DEFAULT_THINKING_BUDGET),
            timeout: Duration::from_secs(180),
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Pull the model's answer out of a `generateContent` response body and decode it.
pub fn parse_generate_response(body: &str) -> Result<ExtractionResult, ExtractionError> {
    if body.trim().is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }
    let resp: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::Malformed(format!("service envelope: {e}")))?;

    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        tracing::warn!(block_reason = %reason, "request blocked by service");
    }

    let Some(first) = resp.candidates.into_iter().next() else {
        return Err(ExtractionError::EmptyResponse);
    };

    let mut text = String::new();
    for part in first.content.map(|c| c.parts).unwrap_or_default() {
        if part.thought {
            continue;
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    if text.trim().is_empty() {
        tracing::warn!(finish_reason = ?first.finish_reason, "candidate carried no text");
        return Err(ExtractionError::EmptyResponse);
    }

    decode_extraction(&text)
}

pub struct GeminiExtractor {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(config: GeminiConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl StatementExtractor for GeminiExtractor {
    async fn extract(&self, payload: &DocumentPayload) -> Result<ExtractionResult, ExtractionError> {
        if self.config.api_key.trim().is_empty() {
            return Err(ExtractionError::Credential(
                "no Gemini API key configured".to_string(),
            ));
        }

        let body = build_request(payload, self.config.thinking_budget);

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| ExtractionError::Credential(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::info!(
            model = %self.config.model,
            file = %payload.file_name,
            mime = %payload.mime_type,
            bytes = payload.bytes.len(),
            "requesting statement extraction"
        );

        let resp = self
            .client
            .post(self.config.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "extraction request rejected");
            return Err(ExtractionError::Service {
                status: status.as_u16(),
                body: text,
            });
        }

        let result = parse_generate_response(&text)?;
        tracing::info!(
            rows = result.len(),
            bank = result.bank_name.as_deref().unwrap_or("-"),
            "extraction complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_core::{Amount, Transaction};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one HTTP request with `status` and `body`; the task yields the raw request.
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                if let Some(end) = req.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&req[..end]).to_ascii_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if req.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            String::from_utf8_lossy(&req).into_owned()
        });
        (format!("http://{addr}"), task)
    }

    fn local_extractor(base_url: String) -> GeminiExtractor {
        let mut cfg = GeminiConfig::new("test-key-123");
        cfg.base_url = base_url;
        cfg.timeout = Duration::from_secs(10);
        GeminiExtractor::new(cfg).unwrap()
    }

    fn png() -> DocumentPayload {
        DocumentPayload::new("stmt.png", "image/png", b"hello".to_vec()).unwrap()
    }

    fn envelope(parts: serde_json::Value) -> String {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": parts }, "finishReason": "STOP" }]
        })
        .to_string()
    }

    #[test]
    fn test_endpoint() {
        let mut cfg = GeminiConfig::new("k");
        cfg.base_url = "http://localhost:8080/".to_string();
        assert_eq!(
            cfg.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-3-pro-preview:generateContent"
        );
    }

    #[test]
    fn test_parse_skips_thought_parts() {
        let body = envelope(json!([
            { "text": "thinking about rows", "thought": true },
            { "text": "{\"transactions\":[{\"date\":\"01/02/24\",\"description\":\"Coffee\",\"amount\":-4.5}]}" }
        ]));
        let r = parse_generate_response(&body).unwrap();
        assert_eq!(r.transactions[0].amount, Amount::Number(-4.5));
    }

    #[test]
    fn test_parse_joins_split_text_parts() {
        let body = envelope(json!([
            { "text": "{\"bankName\":\"ING\"," },
            { "text": "\"transactions\":[]}" }
        ]));
        let r = parse_generate_response(&body).unwrap();
        assert_eq!(r.bank_name.as_deref(), Some("ING"));
    }

    #[test]
    fn test_parse_empty_candidates() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        assert!(matches!(parse_generate_response(&body), Err(ExtractionError::EmptyResponse)));

        let body = envelope(json!([]));
        assert!(matches!(parse_generate_response(&body), Err(ExtractionError::EmptyResponse)));
    }

    #[test]
    fn test_parse_missing_transactions() {
        let body = envelope(json!([{ "text": "{\"bankName\":\"ING\"}" }]));
        assert!(matches!(parse_generate_response(&body), Err(ExtractionError::Malformed(_))));
    }

    #[test]
    fn test_parse_non_json_envelope() {
        assert!(matches!(
            parse_generate_response("<html>bad gateway</html>"),
            Err(ExtractionError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_empty_body() {
        assert!(matches!(parse_generate_response(""), Err(ExtractionError::EmptyResponse)));
        assert!(matches!(parse_generate_response(" \n"), Err(ExtractionError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_extract_success_sends_key_and_json_body() {
        let answer = envelope(json!([{
            "text": "{\"bankName\":\"ING\",\"transactions\":[{\"date\":\"01/02/24\",\"description\":\"Coffee\",\"amount\":-4.5}]}"
        }]));
        let (base, server) = serve_once("200 OK", answer).await;

        let result = local_extractor(base).extract(&png()).await.unwrap();
        assert_eq!(result.bank_name.as_deref(), Some("ING"));
        assert_eq!(result.transactions, vec![Transaction::new("01/02/24", "Coffee", -4.5)]);

        let req = server.await.unwrap();
        let (head, body) = req.split_once("\r\n\r\n").unwrap();
        let head = head.to_ascii_lowercase();
        assert!(head.starts_with("post /v1beta/models/gemini-3-pro-preview:generatecontent "));
        assert!(head.contains("x-goog-api-key: test-key-123"));
        assert!(head.contains("content-type: application/json"));

        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        let inline = &sent["contents"][0]["parts"][0]["inlineData"];
        assert_eq!(inline["mimeType"], "image/png");
        assert_eq!(inline["data"], "aGVsbG8=");
        assert_eq!(sent["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_extract_non_2xx_is_service_error() {
        let body = json!({ "error": { "code": 429, "message": "quota" } }).to_string();
        let (base, server) = serve_once("429 Too Many Requests", body.clone()).await;

        let err = local_extractor(base).extract(&png()).await.unwrap_err();
        server.await.unwrap();
        match &err {
            ExtractionError::Service { status, body: got } => {
                assert_eq!(*status, 429);
                assert_eq!(got, &body);
            }
            other => panic!("expected Service, got {other:?}"),
        }
        let msg = err.user_message();
        assert!(msg.starts_with("Inference service error 429: quota."));
        assert!(msg.ends_with(scanner_core::QUOTA_HINT));
    }

    #[tokio::test]
    async fn test_extract_empty_success_body() {
        let (base, server) = serve_once("200 OK", String::new()).await;
        let err = local_extractor(base).extract(&png()).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, ExtractionError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let ex = GeminiExtractor::new(GeminiConfig::new("")).unwrap();
        let payload = DocumentPayload::new("a.png", "image/png", vec![1]).unwrap();
        assert!(matches!(ex.extract(&payload).await, Err(ExtractionError::Credential(_))));
    }
}
