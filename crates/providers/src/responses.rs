//! Drafting backend client — a Responses-style generation API.
//!
//! Supports:
//! - Streaming generation (SSE) with retrieval, sandboxed execution,
//!   and declared function tools
//! - Follow-up retrieve of the finalized response, with an
//!   include-parameter fallback for backends that reject it
//! - File / container-file content downloads
//! - Vector store administration (provisioning, document indexing)

use async_trait::async_trait;
use briefsmith_core::backend::{DraftRequest, DraftStreamEvent, DraftingBackend, StoreAdmin, StoreFile};
use briefsmith_core::error::ProviderError;
use briefsmith_core::shape;
use briefsmith_core::turn::Role;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, trace, warn};

/// Timeout for artifact and container downloads.
const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// The drafting/retrieval backend client.
pub struct ResponsesClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    download_client: reqwest::Client,
}

impl ResponsesClient {
    /// Create a client against a custom base URL.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        let download_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            download_client,
        }
    }

    /// Create a client for the hosted OpenAI endpoint.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("https://api.openai.com/v1", api_key)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Build the wire request body for one streaming draft call.
    fn to_request_body(request: &DraftRequest, stream: bool) -> serde_json::Value {
        let mut input = vec![
            serde_json::json!({"role": "system", "content": request.instructions}),
            serde_json::json!({"role": "system", "content": request.context_block}),
        ];
        for (role, content) in &request.transcript {
            input.push(serde_json::json!({"role": role.as_str(), "content": content}));
        }

        let mut tools = vec![
            serde_json::json!({"type": "file_search", "vector_store_ids": request.store_ids}),
            serde_json::json!({"type": "code_interpreter", "container": {"type": "auto"}}),
        ];
        if let Some(func) = &request.function_tool {
            tools.push(serde_json::json!({
                "type": "function",
                "name": func.name,
                "description": func.description,
                "parameters": func.parameters,
            }));
        }

        serde_json::json!({
            "model": request.model,
            "input": input,
            "tools": tools,
            "include": ["file_search_call.results", "code_interpreter_call.outputs"],
            "stream": stream,
        })
    }

    /// Map a wire SSE payload into a stream event.
    ///
    /// Unrecognized event types map to `Unknown` — the consumer ignores
    /// them rather than erroring, so new backend event kinds are safe.
    fn map_sse_event(data: &serde_json::Value) -> DraftStreamEvent {
        match shape::type_of(data) {
            "response.created" => DraftStreamEvent::Created {
                response_id: shape::str_at(&data["response"], &["id"])
                    .unwrap_or_default()
                    .to_string(),
            },
            "response.output_text.delta" => DraftStreamEvent::TextDelta {
                delta: shape::str_or(data, "delta", "").to_string(),
            },
            "response.output_item.done" => {
                // Function-call items surface here with their complete
                // accumulated arguments.
                let item = &data["item"];
                if shape::type_of(item) == "function_call" {
                    DraftStreamEvent::FunctionCallArguments {
                        call_id: shape::str_at(item, &["call_id", "id"])
                            .unwrap_or_default()
                            .to_string(),
                        name: shape::str_or(item, "name", "").to_string(),
                        arguments: shape::str_or(item, "arguments", "").to_string(),
                    }
                } else {
                    DraftStreamEvent::Unknown
                }
            }
            "response.completed" => {
                let response = data.get("response").cloned();
                DraftStreamEvent::Completed {
                    response_id: response
                        .as_ref()
                        .and_then(|r| shape::str_at(r, &["id"]))
                        .unwrap_or_default()
                        .to_string(),
                    response,
                }
            }
            _ => DraftStreamEvent::Unknown,
        }
    }

    async fn get_bytes(
        &self,
        url: &str,
        authenticated: bool,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        let mut req = self.download_client.get(url);
        if authenticated {
            req = req.header("Authorization", self.bearer());
        }
        let response = req.send().await.map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Map HTTP status codes to provider errors; rate limits and auth
/// failures get their own variants.
fn api_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => {
            ProviderError::AuthenticationFailed("Invalid API key or insufficient permissions".into())
        }
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Does this 400-level error body reject a request parameter?
///
/// Older backends reject `include` with an unknown-parameter error;
/// that specific failure kind drives the retrieve fallback. Anything
/// else stays a plain API error.
fn is_unknown_parameter(status: u16, body: &str) -> Option<String> {
    if status != 400 {
        return None;
    }
    let parsed: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    let error = &parsed["error"];
    let code = shape::str_or(error, "code", "");
    let param = shape::str_or(error, "param", "");
    if code == "unknown_parameter" || param == "include" {
        Some(if param.is_empty() { "include".into() } else { param.into() })
    } else {
        None
    }
}

#[async_trait]
impl DraftingBackend for ResponsesClient {
    async fn stream_draft(
        &self,
        request: DraftRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<DraftStreamEvent, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/responses", self.base_url);
        let body = Self::to_request_body(&request, true);

        debug!(model = %request.model, stores = request.store_ids.len(), "Dispatching streaming draft request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Drafting backend rejected request");
            return Err(api_error(status, error_body));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream and forward mapped events in order.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Skip empty lines, SSE comments, and `event:` framing;
                    // the payload's own `type` field is authoritative.
                    if line.is_empty() || line.starts_with(':') || line.starts_with("event:") {
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        let data = data.trim();
                        if data == "[DONE]" {
                            return;
                        }

                        match serde_json::from_str::<serde_json::Value>(data) {
                            Ok(value) => {
                                let event = Self::map_sse_event(&value);
                                let done = matches!(event, DraftStreamEvent::Completed { .. });
                                if tx.send(Ok(event)).await.is_err() {
                                    return; // receiver dropped
                                }
                                if done {
                                    return;
                                }
                            }
                            Err(e) => {
                                trace!(data = %data, error = %e, "Ignoring unparseable SSE chunk");
                            }
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn retrieve_response(
        &self,
        response_id: &str,
        include: &[&str],
    ) -> std::result::Result<serde_json::Value, ProviderError> {
        let url = format!("{}/responses/{}", self.base_url, response_id);
        let query: Vec<(&str, &str)> = include.iter().map(|v| ("include[]", *v)).collect();

        debug!(response_id, include = include.len(), "Retrieving finalized response");

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .query(&query)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            if let Some(param) = is_unknown_parameter(status, &body) {
                return Err(ProviderError::UnsupportedParameter(param));
            }
            return Err(api_error(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })
    }

    async fn file_content(
        &self,
        file_id: &str,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        let url = format!("{}/files/{}/content", self.base_url, file_id);
        self.get_bytes(&url, true).await
    }

    async fn container_file_content(
        &self,
        container_id: &str,
        file_id: &str,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        let url = format!(
            "{}/containers/{}/files/{}/content",
            self.base_url, container_id, file_id
        );
        self.get_bytes(&url, true).await
    }

    async fn fetch_url(&self, url: &str) -> std::result::Result<Vec<u8>, ProviderError> {
        self.get_bytes(url, false).await
    }
}

#[async_trait]
impl StoreAdmin for ResponsesClient {
    async fn create_store(&self, name: &str) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/vector_stores", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&serde_json::json!({"name": name}))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let created: CreatedObject = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse store response: {e}"),
        })?;
        debug!(store_id = %created.id, name, "Vector store created");
        Ok(created.id)
    }

    async fn upload_document(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/files", self.base_url);
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let created: CreatedObject = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse file response: {e}"),
        })?;
        Ok(created.id)
    }

    async fn attach_document(
        &self,
        store_id: &str,
        file_id: &str,
    ) -> std::result::Result<(), ProviderError> {
        let url = format!("{}/vector_stores/{}/files", self.base_url, store_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&serde_json::json!({"file_id": file_id}))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }
        Ok(())
    }

    async fn list_store_files(
        &self,
        store_id: &str,
    ) -> std::result::Result<Vec<StoreFile>, ProviderError> {
        let url = format!("{}/vector_stores/{}/files", self.base_url, store_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .query(&[("limit", "100")])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let listing: serde_json::Value = response.json().await.map_err(|e| {
            ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse store file list: {e}"),
            }
        })?;

        let mut files = Vec::new();
        for item in shape::arr_at(&listing, "data") {
            let Some(file_id) = shape::str_at(item, &["id", "file_id"]) else {
                continue;
            };
            // Filename lives on the file object, not the store listing.
            let filename = match self.retrieve_filename(file_id).await {
                Ok(name) => name,
                Err(e) => {
                    warn!(file_id, error = %e, "Could not resolve indexed filename");
                    "(unknown)".to_string()
                }
            };
            files.push(StoreFile {
                file_id: file_id.to_string(),
                filename,
            });
        }
        Ok(files)
    }
}

impl ResponsesClient {
    async fn retrieve_filename(
        &self,
        file_id: &str,
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, body));
        }

        let file: FileObject = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse file object: {e}"),
        })?;
        Ok(file.filename.unwrap_or_else(|| "(unknown)".into()))
    }
}

// --- Wire types (internal) ---

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    #[serde(default)]
    filename: Option<String>,
}
