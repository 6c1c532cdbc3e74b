//! The drafting orchestrator — one grounded, streaming generation call
//! per conversational turn.
//!
//! Per-turn state machine:
//! 1. **Compose** — system instructions + context block + replayed
//!    transcript.
//! 2. **Dispatch** — one streaming request with the retrieval tool
//!    scoped to the turn's knowledge stores, sandboxed execution, and
//!    (when a converter is configured) the declared HTML→PDF function.
//! 3. **Stream** — consume events in arrival order; surface each
//!    non-empty delta immediately; ignore unknown event kinds.
//! 4. **Finalize** — exactly one follow-up retrieve against the
//!    retained response id, probing for include support and falling
//!    back to a plain retrieve when the backend rejects it.
//! 5. **Reconcile function calls** — execute an observed conversion
//!    call locally, download its output, and append a status line.
//! 6. **Return** — text, artifacts, citations, plus any soft warnings.
//!
//! Only a dispatch failure is fatal to the turn; every later failure
//! degrades the result (fewer citations/artifacts) with a warning.

use briefsmith_core::backend::{DraftStreamEvent, DraftingBackend, DraftRequest, PdfConverter};
use briefsmith_core::error::ProviderError;
use briefsmith_core::turn::{ArtifactOrigin, Citation, GeneratedArtifact, Role};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::prompts::{conversion_function_spec, CONVERT_FUNCTION_NAME, SYSTEM_INSTRUCTIONS};
use crate::resolver;

/// Richer-payload fields requested from the follow-up retrieve.
pub const RETRIEVE_INCLUDE: &[&str] =
    &["file_search_call.results", "code_interpreter_call.outputs"];

/// Default drafting model.
pub const DEFAULT_DRAFTING_MODEL: &str = "gpt-4o";

/// Everything one turn produced.
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    /// The accumulated answer text (empty on a fatal dispatch failure).
    pub text: String,
    /// Artifacts resolved from sandbox execution or the conversion
    /// function.
    pub artifacts: Vec<GeneratedArtifact>,
    /// Retrieval citations in backend rank order.
    pub citations: Vec<Citation>,
    /// Non-fatal degradations surfaced to the caller.
    pub warnings: Vec<String>,
    /// Set when the primary dispatch itself failed.
    pub error: Option<String>,
}

impl TurnOutcome {
    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }
}

/// A function call observed during streaming, awaiting local execution.
#[derive(Debug, Clone)]
struct PendingFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ConvertArgs {
    html_content: String,
    filename: String,
}

/// Drives one grounded generation call per turn.
pub struct DraftingOrchestrator {
    backend: Arc<dyn DraftingBackend>,
    converter: Option<Arc<dyn PdfConverter>>,
    model: String,
    instructions: String,
}

impl DraftingOrchestrator {
    pub fn new(backend: Arc<dyn DraftingBackend>) -> Self {
        Self {
            backend,
            converter: None,
            model: DEFAULT_DRAFTING_MODEL.into(),
            instructions: SYSTEM_INSTRUCTIONS.into(),
        }
    }

    /// Attach the HTML→PDF converter; this also declares the function
    /// tool on every dispatch.
    pub fn with_converter(mut self, converter: Arc<dyn PdfConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Run one turn. `on_delta` is invoked for every non-empty text
    /// delta, in arrival order, before the call returns.
    pub async fn run_turn(
        &self,
        transcript: Vec<(Role, String)>,
        store_ids: Vec<String>,
        context_block: String,
        mut on_delta: impl FnMut(&str),
    ) -> TurnOutcome {
        // ── Compose ──
        let request = DraftRequest {
            model: self.model.clone(),
            instructions: self.instructions.clone(),
            context_block,
            transcript,
            store_ids,
            function_tool: self.converter.as_ref().map(|_| conversion_function_spec()),
        };

        // ── Dispatch ──
        let mut rx = match self.backend.stream_draft(request).await {
            Ok(rx) => rx,
            Err(e) => {
                error!(error = %e, "Drafting dispatch failed");
                return TurnOutcome::failed(format!("Error creating response: {e}"));
            }
        };

        // ── Stream ──
        let mut text = String::new();
        let mut warnings = Vec::new();
        let mut response_id: Option<String> = None;
        let mut inline_response = None;
        let mut pending_call: Option<PendingFunctionCall> = None;

        while let Some(event) = rx.recv().await {
            match event {
                Ok(DraftStreamEvent::Created { response_id: id }) => {
                    if !id.is_empty() {
                        response_id = Some(id);
                    }
                }
                Ok(DraftStreamEvent::TextDelta { delta }) => {
                    if !delta.is_empty() {
                        text.push_str(&delta);
                        on_delta(&delta);
                    }
                }
                Ok(DraftStreamEvent::FunctionCallArguments {
                    name, arguments, ..
                }) => {
                    debug!(name, "Function call observed during streaming");
                    pending_call = Some(PendingFunctionCall { name, arguments });
                }
                Ok(DraftStreamEvent::Completed {
                    response_id: id,
                    response,
                }) => {
                    if !id.is_empty() {
                        response_id = Some(id);
                    }
                    inline_response = response;
                }
                Ok(DraftStreamEvent::Unknown) => {}
                Err(e) => {
                    if text.is_empty() && response_id.is_none() {
                        error!(error = %e, "Stream failed before any output");
                        return TurnOutcome::failed(format!("Error creating response: {e}"));
                    }
                    warn!(error = %e, "Stream interrupted; keeping partial output");
                    warnings.push(format!("Stream interrupted: {e}"));
                    break;
                }
            }
        }

        // ── Finalize ──
        let final_response = match &response_id {
            Some(id) => self
                .retrieve_with_fallback(id, &mut warnings)
                .await
                .or(inline_response),
            None => {
                warnings.push("No response identifier; skipping citation and file retrieval".into());
                inline_response
            }
        };

        let mut citations = Vec::new();
        let mut artifacts = Vec::new();
        if let Some(response) = &final_response {
            citations = resolver::citations_from(response);
            artifacts =
                resolver::resolve_sandbox_artifacts(self.backend.as_ref(), response, &mut warnings)
                    .await;
        }

        // ── Reconcile function calls ──
        if let Some(call) = pending_call {
            self.reconcile_function_call(call, &mut text, &mut artifacts, &mut warnings)
                .await;
        }

        info!(
            chars = text.len(),
            citations = citations.len(),
            artifacts = artifacts.len(),
            warnings = warnings.len(),
            "Turn complete"
        );

        TurnOutcome {
            text: text.trim().to_string(),
            artifacts,
            citations,
            warnings,
            error: None,
        }
    }

    /// The include capability check: attempt the richer retrieve, and
    /// only on the unsupported-parameter failure kind fall back to the
    /// plain call. Any other failure degrades with a warning.
    async fn retrieve_with_fallback(
        &self,
        response_id: &str,
        warnings: &mut Vec<String>,
    ) -> Option<serde_json::Value> {
        match self
            .backend
            .retrieve_response(response_id, RETRIEVE_INCLUDE)
            .await
        {
            Ok(response) => Some(response),
            Err(ProviderError::UnsupportedParameter(param)) => {
                debug!(param, "Backend rejects include; retrieving without results");
                match self.backend.retrieve_response(response_id, &[]).await {
                    Ok(response) => Some(response),
                    Err(e) => {
                        warn!(error = %e, "Fallback retrieve failed");
                        warnings.push(format!("Could not retrieve response details: {e}"));
                        None
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Retrieve failed");
                warnings.push(format!("Could not retrieve response details: {e}"));
                None
            }
        }
    }

    /// Execute an observed conversion call locally and fold its result
    /// into the displayed answer.
    async fn reconcile_function_call(
        &self,
        call: PendingFunctionCall,
        text: &mut String,
        artifacts: &mut Vec<GeneratedArtifact>,
        warnings: &mut Vec<String>,
    ) {
        if call.name != CONVERT_FUNCTION_NAME {
            warnings.push(format!("Ignoring unknown function call: {}", call.name));
            return;
        }
        let Some(converter) = &self.converter else {
            warnings.push("Conversion function called but no converter is configured".into());
            return;
        };

        let args: ConvertArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(error = %e, "Malformed conversion arguments");
                text.push_str("\n\nPDF generation failed: malformed conversion request");
                warnings.push(format!("Malformed conversion arguments: {e}"));
                return;
            }
        };

        match converter.convert(&args.html_content, &args.filename).await {
            Ok(result) if result.success => {
                let url = match result.url.as_deref() {
                    Some(url) => url,
                    None => {
                        text.push_str("\n\nPDF generation failed: no download URL returned");
                        warnings.push("Conversion succeeded without a download URL".into());
                        return;
                    }
                };
                match self.backend.fetch_url(url).await {
                    Ok(bytes) => {
                        text.push_str(&format!("\n\nPDF Generated: {}", result.filename));
                        artifacts.push(GeneratedArtifact {
                            filename: result.filename,
                            bytes,
                            origin: ArtifactOrigin::ConversionFunction,
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, url, "Converted PDF download failed");
                        text.push_str(&format!("\n\nPDF generation failed: {e}"));
                        warnings.push(format!("Could not download converted PDF: {e}"));
                    }
                }
            }
            Ok(result) => {
                let reason = result.error.unwrap_or_else(|| "unknown error".into());
                text.push_str(&format!("\n\nPDF generation failed: {reason}"));
                warnings.push(format!("Conversion failed: {reason}"));
            }
            Err(e) => {
                warn!(error = %e, "Conversion call failed");
                text.push_str(&format!("\n\nPDF generation failed: {e}"));
                warnings.push(format!("Conversion failed: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockBackend, MockConverter};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn transcript() -> Vec<(Role, String)> {
        vec![(Role::User, "draft the motion".into())]
    }

    #[tokio::test]
    async fn streams_deltas_in_order_and_accumulates() {
        let backend = Arc::new(MockBackend::streaming_text("COMES NOW the Debtor"));
        let orchestrator = DraftingOrchestrator::new(backend);

        let mut seen = Vec::new();
        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |d| {
                seen.push(d.to_string())
            })
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.text, "COMES NOW the Debtor");
        assert_eq!(seen.concat(), "COMES NOW the Debtor");
        assert!(seen.len() > 1, "expected incremental deltas");
    }

    #[tokio::test]
    async fn dispatch_failure_is_fatal_but_structured() {
        let backend = Arc::new(
            MockBackend::new().with_dispatch_error(ProviderError::Network("connection refused".into())),
        );
        let orchestrator = DraftingOrchestrator::new(backend);

        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |_| {})
            .await;

        assert_eq!(outcome.text, "");
        assert!(outcome.artifacts.is_empty());
        assert!(outcome.citations.is_empty());
        assert!(outcome.error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn citations_come_from_the_followup_retrieve() {
        let backend = Arc::new(
            MockBackend::streaming_text("Grounded answer").with_response(json!({
                "id": "resp_mock",
                "output": [
                    {"type": "file_search_call", "results": [
                        {"file_id": "f1", "filename": "form_506.pdf", "text": "Form text", "score": 0.9},
                        {"file_id": "f2", "filename": "rules.pdf", "text": "Local rule", "score": 0.8},
                    ]},
                ]
            })),
        );
        let orchestrator = DraftingOrchestrator::new(backend.clone());

        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |_| {})
            .await;

        assert_eq!(outcome.citations.len(), 2);
        assert_eq!(outcome.citations[0].source_filename, "form_506.pdf");
        assert_eq!(outcome.citations[1].rank, Some(2));
        assert_eq!(backend.retrieve_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn include_rejection_falls_back_without_erroring() {
        let backend = Arc::new(
            MockBackend::streaming_text("Answer")
                .with_include_unsupported()
                .with_response(json!({
                    "id": "resp_mock",
                    "output": [
                        {"type": "file_search_call", "results": [
                            {"file_id": "f1", "filename": "x.pdf", "text": "y"},
                        ]},
                    ]
                })),
        );
        let orchestrator = DraftingOrchestrator::new(backend.clone());

        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |_| {})
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.text, "Answer");
        // The plain retrieve carries no results, so citations degrade
        // to empty rather than failing the turn.
        assert!(outcome.citations.is_empty());
        assert_eq!(backend.retrieve_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sandbox_artifacts_are_resolved_after_the_stream() {
        let backend = Arc::new(
            MockBackend::streaming_text("Here is your document.")
                .with_response(json!({
                    "id": "resp_mock",
                    "output": [
                        {"type": "code_interpreter_call", "container_id": "cntr_1", "outputs": [
                            {"type": "file", "file_id": "cf_1", "filename": "Motion.docx"},
                        ]},
                    ]
                }))
                .with_container_file("cntr_1", "cf_1", b"docx".to_vec()),
        );
        let orchestrator = DraftingOrchestrator::new(backend);

        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |_| {})
            .await;

        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].filename, "Motion.docx");
        assert_eq!(outcome.artifacts[0].origin, ArtifactOrigin::SandboxExecution);
    }

    #[tokio::test]
    async fn conversion_call_succeeds_and_appends_status_line() {
        let events = vec![
            DraftStreamEvent::Created {
                response_id: "resp_mock".into(),
            },
            DraftStreamEvent::TextDelta {
                delta: "Here is the PDF.".into(),
            },
            DraftStreamEvent::FunctionCallArguments {
                call_id: "call_1".into(),
                name: CONVERT_FUNCTION_NAME.into(),
                arguments: r#"{"html_content":"<html><body>Motion</body></html>","filename":"Motion.pdf"}"#.into(),
            },
            DraftStreamEvent::Completed {
                response_id: "resp_mock".into(),
                response: None,
            },
        ];
        let backend = Arc::new(
            MockBackend::new()
                .with_events(events)
                .with_url("https://converter.example/out.pdf", b"%PDF-1.7".to_vec()),
        );
        let orchestrator = DraftingOrchestrator::new(backend).with_converter(Arc::new(
            MockConverter::succeeding("https://converter.example/out.pdf", "Motion.pdf"),
        ));

        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |_| {})
            .await;

        assert!(outcome.error.is_none());
        assert!(outcome.text.ends_with("PDF Generated: Motion.pdf"));
        assert_eq!(outcome.artifacts.len(), 1);
        assert_eq!(outcome.artifacts[0].filename, "Motion.pdf");
        assert_eq!(outcome.artifacts[0].bytes, b"%PDF-1.7");
        assert_eq!(
            outcome.artifacts[0].origin,
            ArtifactOrigin::ConversionFunction
        );
    }

    #[tokio::test]
    async fn conversion_failure_degrades_with_a_status_line() {
        let events = vec![
            DraftStreamEvent::TextDelta {
                delta: "Converting.".into(),
            },
            DraftStreamEvent::FunctionCallArguments {
                call_id: "call_1".into(),
                name: CONVERT_FUNCTION_NAME.into(),
                arguments: r#"{"html_content":"<p>x</p>","filename":"Motion.pdf"}"#.into(),
            },
            DraftStreamEvent::Completed {
                response_id: "resp_mock".into(),
                response: None,
            },
        ];
        let backend = Arc::new(MockBackend::new().with_events(events));
        let orchestrator = DraftingOrchestrator::new(backend)
            .with_converter(Arc::new(MockConverter::failing("render failed")));

        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |_| {})
            .await;

        assert!(outcome.error.is_none());
        assert!(outcome.text.contains("PDF generation failed: render failed"));
        assert!(outcome.artifacts.is_empty());
        assert!(!outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn converter_transport_error_is_non_fatal() {
        let events = vec![
            DraftStreamEvent::TextDelta { delta: "Hi.".into() },
            DraftStreamEvent::FunctionCallArguments {
                call_id: "call_1".into(),
                name: CONVERT_FUNCTION_NAME.into(),
                arguments: r#"{"html_content":"<p>x</p>","filename":"Motion.pdf"}"#.into(),
            },
            DraftStreamEvent::Completed {
                response_id: "resp_mock".into(),
                response: None,
            },
        ];
        let backend = Arc::new(MockBackend::new().with_events(events));
        let orchestrator = DraftingOrchestrator::new(backend)
            .with_converter(Arc::new(MockConverter::erroring("service down")));

        let outcome = orchestrator
            .run_turn(transcript(), vec!["vs_1".into()], "ctx".into(), |_| {})
            .await;

        assert!(outcome.error.is_none());
        assert!(outcome.text.contains("PDF generation failed"));
    }

    #[tokio::test]
    async fn function_tool_is_declared_only_with_a_converter() {
        let backend = Arc::new(MockBackend::streaming_text("ok"));
        let orchestrator = DraftingOrchestrator::new(backend.clone());
        orchestrator
            .run_turn(transcript(), vec![], "ctx".into(), |_| {})
            .await;
        assert!(backend
            .last_request
            .lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .function_tool
            .is_none());

        let backend = Arc::new(MockBackend::streaming_text("ok"));
        let orchestrator = DraftingOrchestrator::new(backend.clone())
            .with_converter(Arc::new(MockConverter::failing("unused")));
        orchestrator
            .run_turn(transcript(), vec![], "ctx".into(), |_| {})
            .await;
        let request = backend.last_request.lock().unwrap();
        let func = request.as_ref().unwrap().function_tool.as_ref().unwrap();
        assert_eq!(func.name, CONVERT_FUNCTION_NAME);
    }

    #[tokio::test]
    async fn stream_interruption_after_output_keeps_partial_text() {
        // MockBackend scripts Ok events only, so a hand-rolled backend
        // emits a delta followed by a mid-stream error.
        struct FlakyBackend;
        #[async_trait::async_trait]
        impl briefsmith_core::backend::DraftingBackend for FlakyBackend {
            async fn stream_draft(
                &self,
                _request: DraftRequest,
            ) -> Result<
                tokio::sync::mpsc::Receiver<Result<DraftStreamEvent, ProviderError>>,
                ProviderError,
            > {
                let (tx, rx) = tokio::sync::mpsc::channel(4);
                tokio::spawn(async move {
                    let _ = tx
                        .send(Ok(DraftStreamEvent::TextDelta {
                            delta: "Partial ".into(),
                        }))
                        .await;
                    let _ = tx
                        .send(Err(ProviderError::StreamInterrupted("reset".into())))
                        .await;
                });
                Ok(rx)
            }
            async fn retrieve_response(
                &self,
                _id: &str,
                _include: &[&str],
            ) -> Result<serde_json::Value, ProviderError> {
                Err(ProviderError::Network("gone".into()))
            }
            async fn file_content(&self, _id: &str) -> Result<Vec<u8>, ProviderError> {
                Err(ProviderError::Network("gone".into()))
            }
            async fn container_file_content(
                &self,
                _c: &str,
                _f: &str,
            ) -> Result<Vec<u8>, ProviderError> {
                Err(ProviderError::Network("gone".into()))
            }
            async fn fetch_url(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
                Err(ProviderError::Network("gone".into()))
            }
        }

        let orchestrator = DraftingOrchestrator::new(Arc::new(FlakyBackend));
        let outcome = orchestrator
            .run_turn(transcript(), vec![], "ctx".into(), |_| {})
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.text, "Partial");
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("Stream interrupted")));
    }
}
