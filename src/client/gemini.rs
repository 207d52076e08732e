//! Gemini `streamGenerateContent` over server-sent events

use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::time::Duration;

use super::sse::{SseDecoder, SseEvent};
use super::{ClientError, FragmentStream, Generator};
use crate::config::AppConfig;
use crate::prompt::GenerationRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorBody>,
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

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    #[cfg(test)]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: crate::config::DEFAULT_ENDPOINT.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        let api_key = config.resolve_api_key().ok_or(ClientError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("ytstrat/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
        })
    }

    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl Generator for GeminiClient {
    fn stream(&self, request: GenerationRequest) -> FragmentStream {
        let url = self.stream_url();
        tracing::debug!(%url, "opening generation stream");

        let call = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send();

        stream::once(async move {
            let response = call.await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&body),
                });
            }
            Ok::<_, ClientError>(decode_stream(response.bytes_stream()))
        })
        .flat_map(|opened| match opened {
            Ok(fragments) => fragments,
            Err(e) => stream::once(future::ready(Err(e))).boxed(),
        })
        .boxed()
    }
}

/// Pull a readable message out of a Google error body
fn api_error_message(body: &str) -> String {
    let trimmed = body.trim();

    // Some endpoints wrap the error in an array. Serde would happily read an
    // array into the envelope struct by position, so check the shape first.
    let parsed = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<ApiErrorEnvelope>>(trimmed)
            .ok()
            .and_then(|list| list.into_iter().next())
    } else {
        serde_json::from_str::<ApiErrorEnvelope>(trimmed).ok()
    };
    if let Some(envelope) = parsed.filter(|e| !e.error.message.is_empty()) {
        return envelope.error.message;
    }

    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Text carried by one SSE event, if any
fn fragment_from_event(event: &SseEvent) -> Result<Option<String>, ClientError> {
    let chunk: StreamChunk = serde_json::from_str(&event.data)?;

    if let Some(err) = chunk.error {
        return Err(ClientError::Api {
            status: err.code.unwrap_or(500),
            message: err.message,
        });
    }
    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ClientError::Blocked(reason));
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(None);
    };
    if let Some(reason) = &candidate.finish_reason {
        tracing::debug!(finish_reason = %reason, "candidate finished");
    }

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    Ok(if text.is_empty() { None } else { Some(text) })
}

struct DecodeState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ClientError>>,
    done: bool,
}

impl<S> DecodeState<S> {
    fn push_event(&mut self, event: SseEvent) {
        if let Some(kind) = event.event.as_deref().filter(|k| *k != "message") {
            tracing::debug!(event = kind, "unexpected event type in stream");
        }
        match fragment_from_event(&event) {
            Ok(Some(text)) => self.pending.push_back(Ok(text)),
            Ok(None) => {}
            Err(e) => {
                self.pending.push_back(Err(e));
                self.done = true;
            }
        }
    }
}

/// Turn a raw SSE body into text fragments, stopping after the first error
pub fn decode_stream<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    let state = DecodeState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    for event in st.decoder.feed(bytes.as_ref()) {
                        if st.done {
                            break;
                        }
                        st.push_event(event);
                    }
                }
                Some(Err(e)) => {
                    st.pending.push_back(Err(e.into()));
                    st.done = true;
                }
                None => {
                    if let Some(event) = st.decoder.finish() {
                        st.push_event(event);
                    }
                    st.done = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::ChannelInput;
    use crate::prompt::SYSTEM_PROMPT;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STREAM_PATH: &str = "/v1beta/models/gemini-test:streamGenerateContent";

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    fn body(chunks: &[&str]) -> impl Stream<Item = Result<Vec<u8>, ClientError>> + Send {
        let owned: Vec<Result<Vec<u8>, ClientError>> =
            chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        stream::iter(owned)
    }

    #[test]
    fn test_fragment_concatenates_parts() {
        let ev = event(r##"{"candidates":[{"content":{"parts":[{"text":"# 1 "},{"text":"CHANNEL"}],"role":"model"}}]}"##);
        assert_eq!(fragment_from_event(&ev).unwrap().as_deref(), Some("# 1 CHANNEL"));
    }

    #[test]
    fn test_thought_parts_and_empty_chunks_skipped() {
        let ev = event(r#"{"candidates":[{"content":{"parts":[{"text":"plan","thought":true}]}}]}"#);
        assert_eq!(fragment_from_event(&ev).unwrap(), None);

        let ev = event(r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":9}}"#);
        assert_eq!(fragment_from_event(&ev).unwrap(), None);

        let ev = event(r#"{"usageMetadata":{}}"#);
        assert_eq!(fragment_from_event(&ev).unwrap(), None);
    }

    #[test]
    fn test_blocked_prompt() {
        let ev = event(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        match fragment_from_event(&ev) {
            Err(ClientError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_error_event() {
        let ev = event(r#"{"error":{"code":429,"message":"Resource exhausted","status":"RESOURCE_EXHAUSTED"}}"#);
        match fragment_from_event(&ev) {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "Resource exhausted");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_api_error_message_variants() {
        assert_eq!(
            api_error_message(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#),
            "API key not valid"
        );
        assert_eq!(
            api_error_message(r#"[{"error":{"code":404,"message":"model not found"}}]"#),
            "model not found"
        );
        assert_eq!(
            api_error_message(r#"{"error":{"code":500}}"#),
            r#"{"error":{"code":500}}"#
        );
        assert_eq!(api_error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(api_error_message(""), "empty response body");
    }

    #[test]
    fn test_stream_url() {
        let client = GeminiClient::new("k", "gemini-3-flash-preview").with_endpoint("http://localhost:9/v1beta/");
        assert_eq!(client.model(), "gemini-3-flash-preview");
        assert_eq!(
            client.stream_url(),
            "http://localhost:9/v1beta/models/gemini-3-flash-preview:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn test_decode_stream_in_order() {
        let chunks = [
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"te",
            "xt\":\"lo\"}]}}]}\r\n\r\ndata: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"!\"}]}}]}",
        ];
        let fragments: Vec<String> = decode_stream(body(&chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["Hel", "lo", "!"]);
    }

    #[tokio::test]
    async fn test_decode_stream_stops_after_error() {
        let chunks = [
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}\n\n",
            "data: not json\n\ndata: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"late\"}]}}]}\n\n",
        ];
        let items: Vec<Result<String, ClientError>> = decode_stream(body(&chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "ok");
        assert!(matches!(items[1], Err(ClientError::Decode(_))));
    }

    #[tokio::test]
    async fn test_decode_stream_transport_error() {
        let items: Vec<Result<Vec<u8>, ClientError>> = vec![
            Ok(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}\n\n".to_vec()),
            Err(ClientError::Blocked("OTHER".to_string())),
            Ok(b"data: {}\n\n".to_vec()),
        ];
        let out: Vec<_> = decode_stream(stream::iter(items)).collect().await;
        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Err(ClientError::Blocked(_))));
    }

    #[tokio::test]
    async fn test_decode_stream_tolerates_named_events() {
        let chunks = [
            "event: ping\ndata: {}\n\n",
            "event: message\ndata: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"a\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"b\"}]}}]}\n\n",
        ];
        let fragments: Vec<String> = decode_stream(body(&chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_key_is_reported() {
        let config = AppConfig {
            api_key: None,
            ..Default::default()
        };
        // The env var may be set on the machine running the tests
        if std::env::var(crate::config::API_KEY_ENV).is_err() {
            assert!(matches!(
                GeminiClient::from_config(&config),
                Err(ClientError::MissingApiKey)
            ));
        }
    }

    fn request() -> GenerationRequest {
        let input = ChannelInput {
            topic: "Home espresso".to_string(),
            ..Default::default()
        };
        GenerationRequest::new(&input, 0.7)
    }

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key", "gemini-test").with_endpoint(format!("{}/v1beta", server.uri()))
    }

    #[tokio::test]
    async fn test_http_stream_sends_key_and_decodes_in_order() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"# Plan\\n\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"- **Niche**\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fragments: Vec<String> = client_for(&server)
            .stream(request())
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["# Plan\n", "- **Niche**"]);

        let received = server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        let prompt = sent["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Channel Topic: Home espresso"));
        assert_eq!(sent["systemInstruction"]["parts"][0]["text"], SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_http_error_yields_single_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"[{"error":{"code":404,"message":"models/gemini-test is not found","status":"NOT_FOUND"}}]"#,
            ))
            .mount(&server)
            .await;

        let items: Vec<_> = client_for(&server).stream(request()).collect().await;
        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(*status, 404);
                assert_eq!(message, "models/gemini-test is not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_object_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(STREAM_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let items: Vec<_> = client_for(&server).stream(request()).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(ClientError::Api { status: 400, message }) if message == "API key not valid"
        ));
    }
}
