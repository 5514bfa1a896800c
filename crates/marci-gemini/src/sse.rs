// SPDX-FileCopyrightText: 2026 Marci Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for `streamGenerateContent?alt=sse` responses.
//!
//! Gemini streams data-only SSE events; each `data:` payload is a complete
//! [`GenerateContentResponse`]. Events are mapped to [`StreamChunk`]s for the
//! provider trait.

use eventsource_stream::Eventsource;
use futures::stream::StreamExt;

use marci_core::{ChunkStream, MarciError, StreamChunk, TokenUsage};

use crate::types::GenerateContentResponse;

/// Parses a reqwest streaming response into a stream of [`StreamChunk`]s.
///
/// A candidate finishing with reason `SAFETY` is surfaced as a stream error
/// so the caller applies its failure handling instead of finalizing a
/// truncated reply.
pub fn parse_sse_stream(response: reqwest::Response) -> ChunkStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::from_str::<GenerateContentResponse>(&event.data) {
                Ok(parsed) => Some(to_chunk(parsed)),
                Err(e) => Some(Err(MarciError::Provider {
                    message: format!("failed to parse stream event: {e}"),
                    source: Some(Box::new(e)),
                })),
            },
            Err(e) => Some(Err(MarciError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

fn to_chunk(response: GenerateContentResponse) -> Result<StreamChunk, MarciError> {
    let finish_reason = response.finish_reason().map(str::to_string);

    if finish_reason.as_deref() == Some("SAFETY") {
        return Err(MarciError::Provider {
            message: "generation stopped: SAFETY".into(),
            source: None,
        });
    }

    let text = response.text();
    Ok(StreamChunk {
        text: (!text.is_empty()).then_some(text),
        finish_reason,
        usage: response.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            response_tokens: u.candidates_token_count,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    /// Helper: serve raw SSE text through wiremock to get a real
    /// reqwest::Response. The server is returned so it outlives the body read.
    async fn mock_sse_response(sse_text: &str) -> (wiremock::MockServer, reqwest::Response) {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        let response = reqwest::get(&server.uri()).await.unwrap();
        (server, response)
    }

    #[tokio::test]
    async fn parses_text_deltas_in_order() {
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"One\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Two\"}]},\"finishReason\":\"STOP\"}]}\n\n",
        );
        let (_server, response) = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        assert_eq!(
            stream.next().await.unwrap().unwrap().text.as_deref(),
            Some("One")
        );
        let last = stream.next().await.unwrap().unwrap();
        assert_eq!(last.text.as_deref(), Some("Two"));
        assert_eq!(last.finish_reason.as_deref(), Some("STOP"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn safety_finish_becomes_error() {
        let sse =
            "data: {\"candidates\":[{\"finishReason\":\"SAFETY\"}]}\n\n";
        let (_server, response) = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("SAFETY"), "got: {err}");
    }

    #[tokio::test]
    async fn malformed_event_becomes_error() {
        let sse = "data: {not json}\n\n";
        let (_server, response) = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);

        assert!(stream.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn empty_body_ends_stream() {
        let (_server, response) = mock_sse_response("").await;
        let mut stream = parse_sse_stream(response);
        assert!(stream.next().await.is_none());
    }
}
