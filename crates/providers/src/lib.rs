//! HTTP backend clients for Briefsmith.
//!
//! - [`responses::ResponsesClient`] — the drafting/retrieval backend
//!   (streaming generation with tool use, follow-up retrieve, vector
//!   store administration, file/container downloads)
//! - [`gemini::GeminiExtractor`] — the document-understanding
//!   extraction backend
//! - [`converter::HttpPdfConverter`] — the HTML→PDF conversion
//!   collaborator
//!
//! All clients implement the corresponding `briefsmith-core` traits so
//! the orchestration pipeline never depends on them directly.

pub mod converter;
pub mod gemini;
pub mod responses;

pub use converter::HttpPdfConverter;
pub use gemini::GeminiExtractor;
pub use responses::ResponsesClient;
