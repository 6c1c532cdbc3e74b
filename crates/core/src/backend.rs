//! Backend traits — the abstraction over the external services the
//! pipeline orchestrates.
//!
//! Four seams: the drafting/retrieval backend (streaming generation,
//! follow-up retrieve, binary downloads), the document-understanding
//! extraction backend, the HTML→PDF conversion collaborator, and the
//! knowledge-store administration surface. HTTP implementations live in
//! `briefsmith-providers`; tests script these traits with mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ExtractError, ProviderError};
use crate::extraction::ExtractionOutcome;
use crate::turn::Role;

/// A client-declared function tool (name + JSON schema) the drafting
/// backend may ask the orchestrator to invoke locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the function's arguments.
    pub parameters: serde_json::Value,
}

/// One grounded, streaming generation request — everything the
/// drafting backend needs for a single turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRequest {
    /// Model identifier (e.g., "gpt-4o").
    pub model: String,

    /// Static system instructions.
    pub instructions: String,

    /// Turn-scoped context block (parameters + extraction results).
    pub context_block: String,

    /// The full replayed conversation transcript, in order.
    pub transcript: Vec<(Role, String)>,

    /// Knowledge store ids the retrieval tool is scoped to.
    pub store_ids: Vec<String>,

    /// Optional declared function tool (e.g., HTML→PDF conversion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_tool: Option<FunctionToolSpec>,
}

/// Events emitted while consuming a drafting stream.
///
/// The orchestrator's stream loop is a single consuming loop with an
/// explicit ignore branch for `Unknown`, preserving forward
/// compatibility with event kinds this client does not know.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftStreamEvent {
    /// The backend accepted the request and assigned a response id.
    Created { response_id: String },

    /// Partial output text.
    TextDelta { delta: String },

    /// A declared function tool call is ready to execute locally.
    FunctionCallArguments {
        call_id: String,
        name: String,
        /// Raw JSON arguments string as accumulated by the backend.
        arguments: String,
    },

    /// The stream finished; carries the completed-response id and,
    /// when the backend inlines it, the full response object.
    Completed {
        response_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<serde_json::Value>,
    },

    /// An event kind this client does not recognize. Ignored.
    Unknown,
}

/// The drafting/retrieval backend.
///
/// One streaming generation call per turn, a bounded follow-up
/// retrieve for citations and sandbox outputs, and the binary download
/// endpoints the artifact resolver needs.
#[async_trait]
pub trait DraftingBackend: Send + Sync {
    /// Issue the streaming generation request.
    ///
    /// Events arrive in order on the returned channel; a transport
    /// failure mid-stream surfaces as an `Err` item.
    async fn stream_draft(
        &self,
        request: DraftRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<DraftStreamEvent, ProviderError>>,
        ProviderError,
    >;

    /// Fetch the finalized response object.
    ///
    /// `include` requests richer payloads (retrieval results, sandbox
    /// outputs). Backends that do not support the parameter must fail
    /// with [`ProviderError::UnsupportedParameter`] so the caller can
    /// fall back to a plain retrieve.
    async fn retrieve_response(
        &self,
        response_id: &str,
        include: &[&str],
    ) -> std::result::Result<serde_json::Value, ProviderError>;

    /// Download a generated file by file id.
    async fn file_content(&self, file_id: &str)
        -> std::result::Result<Vec<u8>, ProviderError>;

    /// Download a sandbox-container file (container-scoped endpoint).
    async fn container_file_content(
        &self,
        container_id: &str,
        file_id: &str,
    ) -> std::result::Result<Vec<u8>, ProviderError>;

    /// Plain GET of an artifact URL (conversion-function output).
    async fn fetch_url(&self, url: &str) -> std::result::Result<Vec<u8>, ProviderError>;
}

/// The document-understanding extraction backend.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Upload `bytes` and ask the backend to extract structured facts
    /// using `prompt`. The raw reply is normalized to an outcome at
    /// this boundary; the sentinel string never escapes it.
    async fn extract(
        &self,
        filename: &str,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> std::result::Result<ExtractionOutcome, ExtractError>;
}

/// Result of the out-of-band HTML→PDF conversion function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// The HTML→PDF conversion collaborator, invoked synchronously when
/// the drafting backend signals the function call is ready.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(
        &self,
        html: &str,
        filename: &str,
    ) -> std::result::Result<ConversionResult, ConvertError>;
}

/// A document indexed into a knowledge store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFile {
    pub file_id: String,
    pub filename: String,
}

/// Knowledge-store administration: provisioning and document indexing.
#[async_trait]
pub trait StoreAdmin: Send + Sync {
    /// Provision a new semantic index, returning its opaque id.
    async fn create_store(&self, name: &str) -> std::result::Result<String, ProviderError>;

    /// Upload a reference document, returning its file id.
    async fn upload_document(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> std::result::Result<String, ProviderError>;

    /// Attach an uploaded document to a store for indexing.
    async fn attach_document(
        &self,
        store_id: &str,
        file_id: &str,
    ) -> std::result::Result<(), ProviderError>;

    /// List the documents indexed in a store.
    async fn list_store_files(
        &self,
        store_id: &str,
    ) -> std::result::Result<Vec<StoreFile>, ProviderError>;
}
