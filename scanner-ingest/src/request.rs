//! Request contract for the vision model: instruction text, output schema and
//! the inline document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde_json::{Value, json};

use crate::payload::DocumentPayload;

pub const EXTRACTION_PROMPT: &str = "\
Analyze this bank statement image. Extract all transactions.
Ensure amounts are positive for deposits/credits and negative for withdrawals/debits if possible,
or simply extract the absolute value if the sign is unclear.
If the date is in a specific format like DD/MM/YY, keep it consistent.
For each transaction, provide:
- date: The date of the transaction.
- description: The full title or description of the transaction.
- amount: The numeric value.
- notes: Any additional info like categories, reference numbers, or merchant locations found.

Also extract the bank name and statement period if visible.";

/// Structured-output schema the service must conform to.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "bankName": { "type": "STRING" },
            "period": { "type": "STRING" },
            "currency": { "type": "STRING" },
            "transactions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "amount": { "type": "NUMBER" },
                        "notes": { "type": "STRING" }
                    },
                    "required": ["date", "description", "amount"]
                }
            }
        },
        "required": ["transactions"]
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<RequestContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// base64 of the raw document bytes
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: i32,
}

pub fn build_request(payload: &DocumentPayload, thinking_budget: Option<i32>) -> GenerateRequest {
    let parts = vec![
        RequestPart::Inline {
            inline_data: InlineData {
                mime_type: payload.mime_type.clone(),
                data: STANDARD.encode(&payload.bytes),
            },
        },
        RequestPart::Text {
            text: EXTRACTION_PROMPT.to_string(),
        },
    ];

    GenerateRequest {
        contents: vec![RequestContent { parts }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
            thinking_config: thinking_budget.map(|thinking_budget| ThinkingConfig { thinking_budget }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> DocumentPayload {
        DocumentPayload::new("s.png", "image/png", b"hello".to_vec()).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(build_request(&payload(), Some(4000))).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert!(parts[1]["text"].as_str().unwrap().contains("negative for withdrawals/debits"));

        let cfg = &body["generationConfig"];
        assert_eq!(cfg["responseMimeType"], "application/json");
        assert_eq!(cfg["thinkingConfig"]["thinkingBudget"], 4000);
        assert_eq!(cfg["responseSchema"]["required"], json!(["transactions"]));
    }

    #[test]
    fn test_thinking_config_omitted_when_unset() {
        let body = serde_json::to_value(build_request(&payload(), None)).unwrap();
        assert!(body["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn test_schema_requires_core_row_fields() {
        let schema = response_schema();
        let items = &schema["properties"]["transactions"]["items"];
        assert_eq!(items["required"], json!(["date", "description", "amount"]));
        assert_eq!(items["properties"]["amount"]["type"], "NUMBER");
        assert!(schema["properties"].get("bankName").is_some());
    }
}
