// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini provider adapter for the Marci companion.
//!
//! Implements [`ProviderAdapter`] over the `generateContent` API: one-shot
//! text completions, structured-JSON completions via `responseSchema`, and
//! streaming chat completions over SSE.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;

use marci_core::{
    AdapterType, ChatStreamRequest, ChunkStream, HealthStatus, MarciError, PluginAdapter,
    PromptPart, ProviderAdapter, StructuredRequest, TextRequest,
};

pub use client::GeminiClient;

use types::{
    ApiContent, ApiPart, GenerateContentRequest, GenerationConfig, InlineData, ThinkingConfig,
};

/// Gemini-backed provider adapter.
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Result<Self, MarciError> {
        Ok(Self {
            client: GeminiClient::new(api_key, model)?,
        })
    }

    /// Builds a provider over an existing client (for base-URL overrides).
    pub fn with_client(client: GeminiClient) -> Self {
        Self { client }
    }

    fn one_shot_request(prompt: &str, fast: bool) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![ApiContent::user_text(prompt)],
            system_instruction: None,
            generation_config: fast.then(|| GenerationConfig {
                thinking_config: Some(ThinkingConfig { thinking_budget: 0 }),
                ..GenerationConfig::default()
            }),
        }
    }
}

fn to_api_parts(parts: &[PromptPart]) -> Vec<ApiPart> {
    parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => ApiPart::Text { text: text.clone() },
            PromptPart::InlineImage { media_type, data } => ApiPart::InlineData {
                inline_data: InlineData {
                    mime_type: media_type.clone(),
                    data: data.clone(),
                },
            },
        })
        .collect()
}

/// Extracts a JSON value from model output that may be wrapped in a
/// markdown code fence.
pub fn extract_json(raw: &str) -> Result<serde_json::Value, MarciError> {
    let trimmed = raw.trim();
    let candidate = if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        let after = after.trim_start();
        match after.find("```") {
            Some(end) => after[..end].trim(),
            None => after.trim(),
        }
    } else {
        trimmed
    };

    serde_json::from_str(candidate).map_err(|e| MarciError::Provider {
        message: format!("structured response is not valid JSON: {e}"),
        source: Some(Box::new(e)),
    })
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, MarciError> {
        // No cheap unauthenticated endpoint exists; construction already
        // validated the credentials header.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MarciError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn complete_text(&self, request: TextRequest) -> Result<String, MarciError> {
        let api_request = Self::one_shot_request(&request.prompt, request.fast);
        let response = self.client.generate(&api_request).await?;

        if response.finish_reason() == Some("SAFETY") {
            return Err(MarciError::Provider {
                message: "generation stopped: SAFETY".into(),
                source: None,
            });
        }
        Ok(response.text())
    }

    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<serde_json::Value, MarciError> {
        let api_request = GenerateContentRequest {
            contents: vec![ApiContent::user_text(&request.prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(request.schema),
                thinking_config: request
                    .fast
                    .then_some(ThinkingConfig { thinking_budget: 0 }),
            }),
        };
        let response = self.client.generate(&api_request).await?;
        extract_json(&response.text())
    }

    async fn stream_chat(&self, request: ChatStreamRequest) -> Result<ChunkStream, MarciError> {
        let mut contents: Vec<ApiContent> = request
            .context
            .iter()
            .map(|turn| ApiContent {
                role: Some(turn.role.clone()),
                parts: to_api_parts(&turn.parts),
            })
            .collect();
        contents.push(ApiContent {
            role: Some("user".into()),
            parts: to_api_parts(&request.parts),
        });

        let api_request = GenerateContentRequest {
            contents,
            system_instruction: Some(ApiContent::system(&request.system_instruction)),
            generation_config: None,
        };
        self.client.stream(&api_request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use marci_core::ChatTurn;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::with_client(
            GeminiClient::new("test-api-key".into(), "gemini-2.5-flash".into())
                .unwrap()
                .with_base_url(base_url.to_string()),
        )
    }

    fn text_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn extract_json_handles_bare_and_fenced_output() {
        let bare = extract_json(r#"{"title": "Rust Help"}"#).unwrap();
        assert_eq!(bare["title"], "Rust Help");

        let fenced = extract_json("```json\n{\"title\": \"Rust Help\"}\n```").unwrap();
        assert_eq!(fenced["title"], "Rust Help");

        let unlabelled = extract_json("```\n{\"mood\": \"Calm\"}\n```").unwrap();
        assert_eq!(unlabelled["mood"], "Calm");

        let prefixed = extract_json("Here you go:\n```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(prefixed["a"], 1);
    }

    #[test]
    fn extract_json_rejects_prose() {
        assert!(extract_json("I could not produce JSON, sorry.").is_err());
    }

    #[tokio::test]
    async fn complete_text_fast_disables_thinking() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"thinkingConfig": {"thinkingBudget": 0}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("quick reply")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let text = provider
            .complete_text(TextRequest {
                prompt: "be quick".into(),
                fast: true,
            })
            .await
            .unwrap();
        assert_eq!(text, "quick reply");
    }

    #[tokio::test]
    async fn complete_structured_sends_schema_and_parses_fenced_reply() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {
                    "responseMimeType": "application/json",
                    "responseSchema": {"type": "OBJECT"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body(
                "```json\n{\"title\": \"Trip Plans\", \"category\": \"Creative\"}\n```",
            )))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let value = provider
            .complete_structured(StructuredRequest {
                prompt: "summarize".into(),
                schema: serde_json::json!({"type": "OBJECT"}),
                fast: false,
            })
            .await
            .unwrap();
        assert_eq!(value["title"], "Trip Plans");
        assert_eq!(value["category"], "Creative");
    }

    #[tokio::test]
    async fn stream_chat_sends_context_and_system_instruction() {
        let server = MockServer::start().await;

        let sse = "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"hey!\"}]},\"finishReason\":\"STOP\"}]}\n\n";

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "You are Marci."}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "how are you?"}]}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let mut stream = provider
            .stream_chat(ChatStreamRequest {
                system_instruction: "You are Marci.".into(),
                context: vec![
                    ChatTurn {
                        role: "user".into(),
                        parts: vec![PromptPart::Text("hi".into())],
                    },
                    ChatTurn {
                        role: "model".into(),
                        parts: vec![PromptPart::Text("hello".into())],
                    },
                ],
                parts: vec![PromptPart::Text("how are you?".into())],
            })
            .await
            .unwrap();

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.text.as_deref(), Some("hey!"));
    }

    #[tokio::test]
    async fn complete_text_maps_safety_finish_to_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"finishReason": "SAFETY"}]
            })))
            .mount(&server)
            .await;

        let provider = test_provider(&server.uri());
        let err = provider
            .complete_text(TextRequest {
                prompt: "something".into(),
                fast: false,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
