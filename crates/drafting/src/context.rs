//! Context assembly — pure, deterministic, no I/O.
//!
//! Merges user-declared parameters and extraction results into the
//! per-turn context block the drafting call consumes. Identical inputs
//! always produce identical output.

use briefsmith_core::extraction::{ExtractionOutcome, ExtractionResult, TurnParams};

/// Placeholder for an absent parameter. The drafting instructions
/// detect missing fields by this marker, so parameters are never
/// silently omitted.
const UNSPECIFIED: &str = "(unspecified)";

/// Assemble the context block for one turn.
///
/// Layout: three labeled parameter lines, then — only when at least
/// one non-sentinel extraction result exists — one labeled block per
/// result, in upload order. Sentinel results contribute nothing;
/// "no extraction content present" is meaningfully different from
/// "empty content present", so no empty section is ever emitted.
pub fn assemble(params: &TurnParams, extractions: &[ExtractionResult]) -> String {
    let mut parts = vec![
        format!(
            "Motion type: {}",
            params
                .category
                .map(|c| c.label())
                .unwrap_or(UNSPECIFIED)
        ),
        format!(
            "Jurisdiction: {}",
            params.jurisdiction.as_deref().filter(|s| !s.is_empty()).unwrap_or(UNSPECIFIED)
        ),
        format!(
            "Chapter: {}",
            params.chapter.as_deref().filter(|s| !s.is_empty()).unwrap_or(UNSPECIFIED)
        ),
    ];

    let blocks: Vec<String> = extractions
        .iter()
        .filter_map(|r| match &r.outcome {
            ExtractionOutcome::Facts(text) => Some(format!(
                "EXTRACTED_FROM_UPLOAD File name ({}):\n{}",
                r.source_filename, text
            )),
            ExtractionOutcome::NoRelevantInfo => None,
        })
        .collect();

    if !blocks.is_empty() {
        parts.push(blocks.join("\n"));
    }

    parts.join("\n")
}
