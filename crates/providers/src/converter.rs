//! HTML→PDF conversion collaborator client.
//!
//! Invoked synchronously when the drafting backend signals the
//! declared `convert_html_to_pdf` function call is ready. Document
//! rendering is slow, so this client carries a longer timeout than the
//! artifact downloads.

use async_trait::async_trait;
use briefsmith_core::backend::{ConversionResult, PdfConverter};
use briefsmith_core::error::ConvertError;
use tracing::{debug, warn};

/// Timeout for the conversion round-trip.
const CONVERT_TIMEOUT_SECS: u64 = 180;

/// Client for an HTTP HTML→PDF rendering service.
pub struct HttpPdfConverter {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpPdfConverter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(CONVERT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl PdfConverter for HttpPdfConverter {
    async fn convert(
        &self,
        html: &str,
        filename: &str,
    ) -> Result<ConversionResult, ConvertError> {
        debug!(filename, html_len = html.len(), "Requesting PDF conversion");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "html_content": html,
                "filename": filename,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConvertError::Timeout {
                        timeout_secs: CONVERT_TIMEOUT_SECS,
                    }
                } else {
                    ConvertError::Service(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, filename, "Conversion service error");
            return Err(ConvertError::Service(format!(
                "status {status}: {body}"
            )));
        }

        let result: ConversionResult = response
            .json()
            .await
            .map_err(|e| ConvertError::Service(format!("Failed to parse conversion result: {e}")))?;

        if result.success && result.url.is_none() {
            return Err(ConvertError::MissingUrl);
        }
        Ok(result)
    }
}
