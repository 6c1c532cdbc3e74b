//! Shared scripted mocks for pipeline tests.

use async_trait::async_trait;
use briefsmith_core::backend::{
    ConversionResult, DocumentExtractor, DraftRequest, DraftStreamEvent, DraftingBackend,
    PdfConverter, StoreAdmin, StoreFile,
};
use briefsmith_core::error::{ConvertError, ExtractError, ProviderError};
use briefsmith_core::extraction::ExtractionOutcome;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A scripted drafting backend.
///
/// Streams a fixed event sequence, serves a fixed retrieve response,
/// and resolves downloads from in-memory maps. Unconfigured downloads
/// fail, which is how tests script per-file failures.
pub struct MockBackend {
    events: Vec<DraftStreamEvent>,
    dispatch_error: Option<ProviderError>,
    include_unsupported: bool,
    response: Option<Value>,
    files: HashMap<String, Vec<u8>>,
    container_files: HashMap<(String, String), Vec<u8>>,
    urls: HashMap<String, Vec<u8>>,
    pub last_request: Mutex<Option<DraftRequest>>,
    pub retrieve_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            dispatch_error: None,
            include_unsupported: false,
            response: None,
            files: HashMap::new(),
            container_files: HashMap::new(),
            urls: HashMap::new(),
            last_request: Mutex::new(None),
            retrieve_calls: AtomicUsize::new(0),
        }
    }

    /// Stream a completed response with the given text, one delta per
    /// word.
    pub fn streaming_text(text: &str) -> Self {
        let mut events = vec![DraftStreamEvent::Created {
            response_id: "resp_mock".into(),
        }];
        let words: Vec<&str> = text.split_inclusive(' ').collect();
        for word in words {
            events.push(DraftStreamEvent::TextDelta {
                delta: word.to_string(),
            });
        }
        events.push(DraftStreamEvent::Completed {
            response_id: "resp_mock".into(),
            response: None,
        });
        Self::new().with_events(events)
    }

    pub fn with_events(mut self, events: Vec<DraftStreamEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_dispatch_error(mut self, error: ProviderError) -> Self {
        self.dispatch_error = Some(error);
        self
    }

    /// Reject retrieve calls that pass `include` (older backend).
    pub fn with_include_unsupported(mut self) -> Self {
        self.include_unsupported = true;
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_file(mut self, file_id: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(file_id.into(), bytes);
        self
    }

    pub fn with_container_file(mut self, container_id: &str, file_id: &str, bytes: Vec<u8>) -> Self {
        self.container_files
            .insert((container_id.into(), file_id.into()), bytes);
        self
    }

    pub fn with_url(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.urls.insert(url.into(), bytes);
        self
    }
}

#[async_trait]
impl DraftingBackend for MockBackend {
    async fn stream_draft(
        &self,
        request: DraftRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<DraftStreamEvent, ProviderError>>,
        ProviderError,
    > {
        *self.last_request.lock().unwrap() = Some(request);
        if let Some(e) = &self.dispatch_error {
            return Err(e.clone());
        }
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let events = self.events.clone();
        tokio::spawn(async move {
            for event in events {
                if tx.send(Ok(event)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }

    async fn retrieve_response(
        &self,
        response_id: &str,
        include: &[&str],
    ) -> Result<Value, ProviderError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        if self.include_unsupported && !include.is_empty() {
            return Err(ProviderError::UnsupportedParameter("include".into()));
        }
        let mut response = self
            .response
            .clone()
            .unwrap_or_else(|| serde_json::json!({"id": response_id, "output": []}));
        // A plain retrieve never carries search results.
        if include.is_empty() {
            if let Some(output) = response.get_mut("output").and_then(Value::as_array_mut) {
                for item in output {
                    if item.get("type").and_then(Value::as_str) == Some("file_search_call") {
                        item.as_object_mut().unwrap().remove("results");
                    }
                }
            }
        }
        Ok(response)
    }

    async fn file_content(&self, file_id: &str) -> Result<Vec<u8>, ProviderError> {
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| ProviderError::Network(format!("no such file: {file_id}")))
    }

    async fn container_file_content(
        &self,
        container_id: &str,
        file_id: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.container_files
            .get(&(container_id.to_string(), file_id.to_string()))
            .cloned()
            .ok_or_else(|| ProviderError::Network(format!("no such container file: {file_id}")))
    }

    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.urls
            .get(url)
            .cloned()
            .ok_or_else(|| ProviderError::Network(format!("unreachable url: {url}")))
    }
}

/// A scripted extractor keyed by filename. Unscripted filenames error.
pub struct MockExtractor {
    outcomes: HashMap<String, Result<ExtractionOutcome, ExtractError>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_facts(mut self, filename: &str, text: &str) -> Self {
        self.outcomes.insert(
            filename.into(),
            Ok(ExtractionOutcome::Facts(text.to_string())),
        );
        self
    }

    pub fn with_no_relevant_info(mut self, filename: &str) -> Self {
        self.outcomes
            .insert(filename.into(), Ok(ExtractionOutcome::NoRelevantInfo));
        self
    }

    pub fn with_error(mut self, filename: &str, message: &str) -> Self {
        self.outcomes.insert(
            filename.into(),
            Err(ExtractError::Generation(message.to_string())),
        );
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentExtractor for MockExtractor {
    async fn extract(
        &self,
        filename: &str,
        _bytes: &[u8],
        _mime_type: &str,
        _prompt: &str,
    ) -> Result<ExtractionOutcome, ExtractError> {
        self.calls.lock().unwrap().push(filename.to_string());
        self.outcomes
            .get(filename)
            .cloned()
            .unwrap_or_else(|| Err(ExtractError::Generation(format!("unscripted: {filename}"))))
    }
}

/// A scripted converter returning one fixed result.
pub struct MockConverter {
    result: Result<ConversionResult, ConvertError>,
}

impl MockConverter {
    pub fn succeeding(url: &str, filename: &str) -> Self {
        Self {
            result: Ok(ConversionResult {
                success: true,
                url: Some(url.into()),
                filename: filename.into(),
                error: None,
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Ok(ConversionResult {
                success: false,
                url: None,
                filename: String::new(),
                error: Some(message.into()),
            }),
        }
    }

    pub fn erroring(message: &str) -> Self {
        Self {
            result: Err(ConvertError::Service(message.into())),
        }
    }
}

#[async_trait]
impl PdfConverter for MockConverter {
    async fn convert(
        &self,
        _html: &str,
        _filename: &str,
    ) -> Result<ConversionResult, ConvertError> {
        self.result.clone()
    }
}

/// A provisioning counter — each created store gets a sequential id.
pub struct MockAdmin {
    pub created: AtomicUsize,
    pub attached: Mutex<Vec<(String, String)>>,
    pub uploaded: Mutex<Vec<String>>,
}

impl MockAdmin {
    pub fn new() -> Self {
        Self {
            created: AtomicUsize::new(0),
            attached: Mutex::new(Vec::new()),
            uploaded: Mutex::new(Vec::new()),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreAdmin for MockAdmin {
    async fn create_store(&self, name: &str) -> Result<String, ProviderError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("vs_{name}_{n}"))
    }

    async fn upload_document(
        &self,
        filename: &str,
        _bytes: &[u8],
    ) -> Result<String, ProviderError> {
        self.uploaded.lock().unwrap().push(filename.to_string());
        Ok(format!("file_{filename}"))
    }

    async fn attach_document(
        &self,
        store_id: &str,
        file_id: &str,
    ) -> Result<(), ProviderError> {
        self.attached
            .lock()
            .unwrap()
            .push((store_id.to_string(), file_id.to_string()));
        Ok(())
    }

    async fn list_store_files(&self, _store_id: &str) -> Result<Vec<StoreFile>, ProviderError> {
        Ok(self
            .uploaded
            .lock()
            .unwrap()
            .iter()
            .map(|f| StoreFile {
                file_id: format!("file_{f}"),
                filename: f.clone(),
            })
            .collect())
    }
}
