use async_trait::async_trait;
use futures::StreamExt;
use log::{error, info};
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION}};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{BoxError, ChatClient, DeltaStream};
use crate::llm::LlmConfig;
use crate::models::ChatMessage;

const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
const DEFAULT_BASE_URL: &str = "https://api.groq.com";

/// OpenAI-compatible Groq chat-completions adapter, consumed in streaming
/// (SSE) mode only.
pub struct GroqChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
    stop: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct GroqStreamResponse {
    choices: Vec<GroqStreamChoice>,
}

#[derive(Deserialize)]
struct GroqStreamChoice {
    delta: GroqDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GroqDelta {
    content: Option<String>,
}

/// One decoded unit of the provider's SSE feed.
#[derive(Debug, PartialEq)]
enum StreamEvent {
    Delta(String),
    Done,
}

/// Splits the provider's byte stream into complete `data:` lines, carrying
/// partial lines (and partial UTF-8 sequences) across chunk boundaries.
#[derive(Default)]
struct SseLineDecoder {
    pending: Vec<u8>,
}

impl SseLineDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = decode_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }
}

fn decode_line(line: &str) -> Option<StreamEvent> {
    if line.is_empty() {
        return None;
    }
    if line == "data: [DONE]" {
        return Some(StreamEvent::Done);
    }

    let data = line.strip_prefix("data: ")?;
    match serde_json::from_str::<GroqStreamResponse>(data) {
        Ok(resp) => {
            for choice in resp.choices {
                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        return Some(StreamEvent::Delta(content));
                    }
                }
                if choice.finish_reason.as_deref() == Some("stop") {
                    return Some(StreamEvent::Done);
                }
            }
            None
        }
        Err(e) => {
            info!("Failed to parse Groq chunk: {}, error: {}", data, e);
            None
        }
    }
}

impl GroqChatClient {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, BoxError> {
        let model = config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?,
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as BoxError)?;

        Ok(Self {
            http,
            model,
            base_url,
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, BoxError> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "Groq API key is required".to_string())?;
        Self::new(api_key, config)
    }

    fn completions_url(&self) -> String {
        format!("{}/openai/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn stream_completion(&self, messages: &[ChatMessage]) -> Result<DeltaStream, BoxError> {
        let url = self.completions_url();
        let req = GroqRequest {
            messages,
            model: &self.model,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stream: true,
            stop: None,
        };

        info!("Starting Groq stream request to {}", url);

        // Setup failures surface here, before any delta has been emitted.
        let resp = self.http.post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| format!("Groq request error: {}", e))?;
        let resp = resp.error_for_status()
            .map_err(|e| format!("Groq API error: {}", e))?;

        let (tx, rx) = mpsc::channel::<Result<String, BoxError>>(32);

        tokio::spawn(async move {
            let mut bytes = resp.bytes_stream();
            let mut decoder = SseLineDecoder::default();

            while let Some(chunk_result) = bytes.next().await {
                let chunk = match chunk_result {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        error!("Groq stream transport error: {}", e);
                        let _ = tx.send(Err(Box::new(e) as BoxError)).await;
                        return;
                    }
                };

                for event in decoder.push(&chunk) {
                    match event {
                        StreamEvent::Delta(content) => {
                            if tx.send(Ok(content)).await.is_err() {
                                return;
                            }
                        }
                        StreamEvent::Done => return,
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
