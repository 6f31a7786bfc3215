//! OpenAI-compatible chat-completions adapter with SSE stream decoding.
//!
//! Speaks the `/chat/completions` dialect used by OpenAI and the many
//! compatible gateways. Tool-call deltas are forwarded as slot-indexed
//! fragments without local accumulation; reassembly is the consumer's job.

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    BoxedEventStream, Message, ModelProvider, ModelRequest, ProviderError, ProviderFuture, Role,
    StreamEvent, TerminalSignal, ToolCallFragment, ToolDefinition,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: Some(api_key.into()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("chat completion request failed with status {status}"));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::authentication(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                ProviderError::timeout(message)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ProviderError::invalid_request(message)
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                ProviderError::unavailable(message)
            }
            _ => ProviderError::transport(message),
        }
    }
}

impl ModelProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let api_request = build_api_request(&request)?;

            let mut builder = self.client.post(self.endpoint()).json(&api_request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            let response = builder.send().await.map_err(|err| {
                if err.is_timeout() {
                    ProviderError::timeout(err.to_string())
                } else {
                    ProviderError::transport(err.to_string())
                }
            })?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut sse_buffer = String::new();
                let mut terminal_seen = false;
                let mut finished = false;

                while let Some(item) = chunks.next().await {
                    let bytes = item.map_err(|err| ProviderError::transport(err.to_string()))?;
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|err| ProviderError::transport(err.to_string()))?;
                    sse_buffer.push_str(text);

                    while let Some(newline_index) = sse_buffer.find('\n') {
                        let line = sse_buffer.drain(..=newline_index).collect::<String>();
                        let line = line.trim();

                        if !line.starts_with("data:") {
                            continue;
                        }

                        let payload = line.trim_start_matches("data:").trim();
                        if payload == "[DONE]" {
                            finished = true;
                            break;
                        }

                        let chunk: ApiStreamChunk = serde_json::from_str(payload)
                            .map_err(|err| ProviderError::transport(err.to_string()))?;

                        for event in chunk_events(&chunk, &mut terminal_seen) {
                            yield event;
                        }
                    }

                    if finished {
                        break;
                    }
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

/// Maps one decoded chunk onto engine stream events, emitting the terminal
/// signal at most once per stream.
fn chunk_events(chunk: &ApiStreamChunk, terminal_seen: &mut bool) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    let Some(choice) = chunk.choices.first() else {
        return events;
    };

    if let Some(content) = &choice.delta.content
        && !content.is_empty()
    {
        events.push(StreamEvent::ContentDelta(content.clone()));
    }

    if let Some(tool_calls) = &choice.delta.tool_calls {
        for delta in tool_calls {
            let mut fragment = ToolCallFragment::new(delta.index.unwrap_or(0));
            fragment.id = delta.id.clone();
            if let Some(function) = &delta.function {
                fragment.name = function.name.clone();
                fragment.arguments = function.arguments.clone();
            }
            events.push(StreamEvent::ToolCallDelta(fragment));
        }
    }

    if let Some(finish_reason) = choice.finish_reason.as_deref()
        && !*terminal_seen
    {
        *terminal_seen = true;
        let signal = match finish_reason {
            "tool_calls" | "function_call" => TerminalSignal::ToolCalls,
            _ => TerminalSignal::Stop,
        };
        events.push(StreamEvent::Terminal(signal));
    }

    events
}

fn build_api_request(request: &ModelRequest) -> Result<ApiRequest, ProviderError> {
    let messages = request
        .messages
        .iter()
        .map(api_message)
        .collect::<Result<Vec<_>, _>>()?;

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(api_tool)
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    Ok(ApiRequest {
        model: request.model.clone(),
        messages,
        tools,
        stream: true,
        temperature: request.options.temperature,
        max_tokens: request.options.max_tokens,
    })
}

fn api_message(message: &Message) -> Result<ApiMessage, ProviderError> {
    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    if message.role == Role::Tool && message.tool_call_id.is_none() {
        return Err(ProviderError::invalid_request(
            "tool messages require a tool_call_id",
        ));
    }

    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| ApiAssistantToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: ApiFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect(),
        )
    };

    Ok(ApiMessage {
        role: role.to_string(),
        content: message.content.clone(),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    })
}

fn api_tool(definition: &ToolDefinition) -> Result<ApiTool, ProviderError> {
    let parameters: Value = serde_json::from_str(&definition.input_schema).map_err(|err| {
        ProviderError::invalid_request(format!(
            "tool '{}' has an invalid input schema: {err}",
            definition.name
        ))
    })?;

    Ok(ApiTool {
        kind: "function".to_string(),
        function: ApiToolFunction {
            name: definition.name.clone(),
            description: definition.description.clone(),
            parameters,
        },
    })
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiAssistantToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiAssistantToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize)]
struct ApiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    #[serde(default)]
    choices: Vec<ApiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    #[serde(default)]
    delta: ApiStreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiDeltaToolCall {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ApiDeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct ApiDeltaFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
