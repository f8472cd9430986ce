//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{text_prompt, ExtractionClient, ExtractionInput};
use crate::error::ModelCallError;
use crate::models::config::ModelConfig;

/// Client for the Gemini generative language REST API.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a client.
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelCallError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    /// Create a client from configuration, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelCallError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| ModelCallError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl ExtractionClient for GeminiClient {
    async fn extract_items(
        &self,
        instruction: &str,
        input: &ExtractionInput,
    ) -> Result<String, ModelCallError> {
        let request = build_request(instruction, input);
        debug!("Calling {} in {} mode", self.model, input.mode());

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelCallError::Timeout(self.timeout)
                } else {
                    ModelCallError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Model call failed with {}", status);
            return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                ModelCallError::RateLimited(body)
            } else {
                ModelCallError::Api {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelCallError::InvalidResponse(e.to_string()))?;
        response_text(body)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn build_request(instruction: &str, input: &ExtractionInput) -> GenerateContentRequest {
    let parts = match input {
        ExtractionInput::Text(text) => vec![Part::Text(text_prompt(instruction, text))],
        ExtractionInput::Binary { bytes, mime_type } => vec![
            Part::Text(instruction.to_string()),
            Part::InlineData(InlineData {
                mime_type: mime_type.clone(),
                data: BASE64_STANDARD.encode(bytes),
            }),
        ],
    };

    GenerateContentRequest {
        contents: vec![Content { role: "user", parts }],
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(response: GenerateContentResponse) -> Result<String, ModelCallError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ModelCallError::Blocked(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ModelCallError::InvalidResponse("no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ModelCallError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::INSTRUCTION;
    use crate::test_support::{serve_once, CannedResponse};
    use serde_json::json;
    use std::sync::Arc;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_request_body() {
        let request = build_request("INSTR", &ExtractionInput::Text("faktur".to_string()));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [{"text": "INSTR\n\nIni adalah teks dari PDF:\nfaktur"}]
                }]
            })
        );
    }

    #[test]
    fn test_binary_request_body() {
        let input = ExtractionInput::Binary {
            bytes: Arc::from(&b"%PDF-1.4"[..]),
            mime_type: "application/pdf".to_string(),
        };
        let body = serde_json::to_value(build_request(INSTRUCTION, &input)).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], INSTRUCTION);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], "JVBERi0xLjQ=");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Berikut: [{\"kode_barang\":"}, {"text": "\"A\",\"kuantum\":1}]"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(
            response_text(response).unwrap(),
            "Berikut: [{\"kode_barang\":\"A\",\"kuantum\":1}]"
        );
    }

    #[test]
    fn test_blocked_prompt() {
        let response = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(matches!(response_text(response), Err(ModelCallError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn test_empty_responses() {
        let no_candidates = parse(json!({"candidates": []}));
        assert!(matches!(response_text(no_candidates), Err(ModelCallError::InvalidResponse(_))));

        let blank = parse(json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]}));
        assert!(matches!(response_text(blank), Err(ModelCallError::EmptyResponse)));

        let no_content = parse(json!({"candidates": [{"finishReason": "MAX_TOKENS"}]}));
        assert!(matches!(response_text(no_content), Err(ModelCallError::EmptyResponse)));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = GeminiClient::new(
            "https://example.test/v1beta/",
            "gemini-2.0-flash",
            "key",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    fn client(url: &str, timeout: Duration) -> GeminiClient {
        GeminiClient::new(url, "gemini-test", "secret-key", timeout).unwrap()
    }

    fn text_input() -> ExtractionInput {
        ExtractionInput::Text("FAKTUR".to_string())
    }

    #[tokio::test]
    async fn test_extract_items_success() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "[{\"kode_barang\":\"A\",\"kuantum\":1}]"}]}}]});
        let (url, request) = serve_once(CannedResponse::new(200, "OK", body.to_string())).await;

        let text = client(&url, Duration::from_secs(5))
            .extract_items("INSTR", &text_input())
            .await
            .unwrap();
        assert_eq!(text, r#"[{"kode_barang":"A","kuantum":1}]"#);

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /models/gemini-test:generateContent "));
        assert!(request.to_lowercase().contains("x-goog-api-key: secret-key"));
        assert!(request.contains("Ini adalah teks dari PDF:"));
    }

    #[tokio::test]
    async fn test_extract_items_rate_limited() {
        let (url, _request) =
            serve_once(CannedResponse::new(429, "Too Many Requests", "quota exceeded")).await;

        let err = client(&url, Duration::from_secs(5))
            .extract_items("INSTR", &text_input())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelCallError::RateLimited(body) if body == "quota exceeded"));
    }

    #[tokio::test]
    async fn test_extract_items_api_error() {
        let (url, _request) =
            serve_once(CannedResponse::new(500, "Internal Server Error", "backend down")).await;

        let err = client(&url, Duration::from_secs(5))
            .extract_items("INSTR", &text_input())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelCallError::Api { status: 500, ref body } if body == "backend down"));
    }

    #[tokio::test]
    async fn test_extract_items_invalid_envelope() {
        let (url, _request) = serve_once(CannedResponse::new(200, "OK", "not json")).await;

        let err = client(&url, Duration::from_secs(5))
            .extract_items("INSTR", &text_input())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelCallError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_extract_items_timeout() {
        let (url, _request) = serve_once(
            CannedResponse::new(200, "OK", "{}").delayed(Duration::from_secs(3)),
        )
        .await;

        let err = client(&url, Duration::from_millis(200))
            .extract_items("INSTR", &text_input())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelCallError::Timeout(d) if d == Duration::from_millis(200)));
    }
}
