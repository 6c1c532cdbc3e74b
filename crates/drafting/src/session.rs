//! The per-turn driver: the piece that ties uploads, extraction,
//! context assembly, the registry, and the orchestrator into one
//! conversational step against a session.
//!
//! Ordering within a turn is fixed: the motion category is validated
//! and its store resolved before anything is recorded, uploads are
//! extracted sequentially in attachment order, the user turn is
//! recorded with its uploads, and the assistant turn is recorded even
//! when drafting fails, so the session never holds a user turn without
//! its reply.

use briefsmith_core::backend::DocumentExtractor;
use briefsmith_core::extraction::{ExtractionOutcome, ExtractionResult, TurnParams};
use briefsmith_core::turn::{AttachedFile, ConversationTurn, SessionState};
use std::sync::Arc;
use tracing::{info, warn};

use crate::context;
use crate::orchestrator::{DraftingOrchestrator, TurnOutcome};
use crate::prompts::EXTRACTION_PROMPT;
use crate::registry::KnowledgeStoreRegistry;

/// Drives complete conversational turns against a session.
pub struct TurnDriver {
    orchestrator: DraftingOrchestrator,
    extractor: Option<Arc<dyn DocumentExtractor>>,
}

impl TurnDriver {
    pub fn new(orchestrator: DraftingOrchestrator) -> Self {
        Self {
            orchestrator,
            extractor: None,
        }
    }

    /// Attach the upload extractor. Without one, uploads still ride on
    /// the user turn but contribute nothing to the context block.
    pub fn with_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Run one full turn: extract uploads, assemble context, draft,
    /// and record both sides in the session.
    pub async fn process(
        &self,
        session: &mut SessionState,
        registry: &mut KnowledgeStoreRegistry,
        params: &TurnParams,
        uploads: Vec<AttachedFile>,
        user_text: &str,
        on_delta: impl FnMut(&str),
    ) -> TurnOutcome {
        let Some(category) = params.category else {
            return TurnOutcome {
                error: Some("Select a motion type before drafting".into()),
                ..TurnOutcome::default()
            };
        };

        let store_id = match registry.get_or_create(category).await {
            Ok(id) => id,
            Err(e) => {
                return TurnOutcome {
                    error: Some(e.to_string()),
                    ..TurnOutcome::default()
                };
            }
        };

        let mut extraction_warnings = Vec::new();
        let extractions = self
            .extract_uploads(&uploads, &mut extraction_warnings)
            .await;

        session.push(ConversationTurn::user(user_text, uploads));

        let context_block = context::assemble(params, &extractions);
        let mut outcome = self
            .orchestrator
            .run_turn(session.transcript(), vec![store_id], context_block, on_delta)
            .await;

        extraction_warnings.append(&mut outcome.warnings);
        outcome.warnings = extraction_warnings;

        let files: Vec<AttachedFile> = outcome
            .artifacts
            .iter()
            .map(|a| AttachedFile::new(a.filename.clone(), a.bytes.clone()))
            .collect();
        session.push(ConversationTurn::assistant(
            outcome.text.clone(),
            files,
            outcome.citations.clone(),
        ));
        info!(turns = session.len(), "Turn recorded");

        outcome
    }

    /// Extract each upload in attachment order. A failed extraction
    /// degrades to a warning; the upload simply contributes no facts.
    async fn extract_uploads(
        &self,
        uploads: &[AttachedFile],
        warnings: &mut Vec<String>,
    ) -> Vec<ExtractionResult> {
        let Some(extractor) = &self.extractor else {
            if !uploads.is_empty() {
                warnings.push(
                    "No extraction backend configured; uploads were not analyzed".into(),
                );
            }
            return Vec::new();
        };

        let mut results = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let mime = mime_guess::from_path(&upload.name)
                .first_or_octet_stream()
                .to_string();
            match extractor
                .extract(&upload.name, &upload.bytes, &mime, EXTRACTION_PROMPT)
                .await
            {
                Ok(outcome) => {
                    if matches!(outcome, ExtractionOutcome::NoRelevantInfo) {
                        info!(filename = %upload.name, "No relevant facts in upload");
                    }
                    results.push(ExtractionResult {
                        source_filename: upload.name.clone(),
                        outcome,
                    });
                }
                Err(e) => {
                    warn!(filename = %upload.name, error = %e, "Extraction failed");
                    warnings.push(format!("Could not analyze {}: {e}", upload.name));
                }
            }
        }
        results
    }
}
