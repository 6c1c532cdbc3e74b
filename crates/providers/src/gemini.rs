//! Document-understanding extraction backend client.
//!
//! Two round-trips per document: a raw upload obtaining a
//! request-scoped file reference, then a generation call pairing that
//! reference with the fixed extraction prompt. The reference is not
//! reused across turns.
//!
//! The raw reply is normalized to [`ExtractionOutcome`] here — the
//! wire sentinel never escapes this boundary.

use async_trait::async_trait;
use briefsmith_core::backend::DocumentExtractor;
use briefsmith_core::error::ExtractError;
use briefsmith_core::extraction::ExtractionOutcome;
use serde::Deserialize;
use tracing::{debug, warn};

/// Default generation model for extraction.
pub const DEFAULT_EXTRACTION_MODEL: &str = "gemini-2.0-flash-exp";

/// Client for a Gemini-style document-understanding API.
pub struct GeminiExtractor {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiExtractor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url("https://generativelanguage.googleapis.com", api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_EXTRACTION_MODEL.into(),
            client,
        }
    }

    /// Override the extraction model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Upload raw document bytes, returning the backend file URI.
    async fn upload(
        &self,
        filename: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<UploadedFile, ExtractError> {
        let url = format!("{}/upload/v1beta/files", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-File-Name", filename)
            .header("Content-Type", mime_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ExtractError::Upload(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, filename, "Extraction backend rejected upload");
            return Err(ExtractError::Backend {
                status_code: status,
                message: body,
            });
        }

        let wrapper: UploadResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Upload(format!("Failed to parse upload response: {e}")))?;
        Ok(wrapper.file)
    }
}

#[async_trait]
impl DocumentExtractor for GeminiExtractor {
    async fn extract(
        &self,
        filename: &str,
        bytes: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<ExtractionOutcome, ExtractError> {
        let uploaded = self.upload(filename, bytes, mime_type).await?;
        debug!(filename, uri = %uploaded.uri, "Document uploaded for extraction");

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"text": prompt},
                    {"file_data": {
                        "file_uri": uploaded.uri,
                        "mime_type": uploaded.mime_type.as_deref().unwrap_or(mime_type),
                    }},
                ],
            }],
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractError::Generation(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, filename, "Extraction generation failed");
            return Err(ExtractError::Backend {
                status_code: status,
                message: body,
            });
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            ExtractError::Generation(format!("Failed to parse generation response: {e}"))
        })?;

        Ok(ExtractionOutcome::from_raw(&generated.text()))
    }
}

// --- Wire types (internal) ---

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    uri: String,
    #[serde(rename = "mimeType", default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_upload_response() {
        let json = r#"{"file":{"name":"files/abc","uri":"https://example/files/abc","mimeType":"application/pdf"}}"#;
        let parsed: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.file.uri, "https://example/files/abc");
        assert_eq!(parsed.file.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn generate_response_joins_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"EXTRACTED_FROM_UPLOAD:"},{"text":"\nDebtor: Jane Doe"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text(), "EXTRACTED_FROM_UPLOAD:\nDebtor: Jane Doe");
    }

    #[test]
    fn empty_candidates_yield_empty_text() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.text(), "");
        // Which normalizes to the no-info outcome downstream.
        assert!(ExtractionOutcome::from_raw(&parsed.text()).is_no_relevant_info());
    }
}
