//! Document-extraction domain types and per-turn parameters.
//!
//! The extraction backend returns free text that is either a labeled
//! fact report or a "nothing usable" sentinel. The sentinel string is a
//! wire-protocol detail: it is normalized into
//! [`ExtractionOutcome::NoRelevantInfo`] at the extractor boundary and
//! never travels further into the pipeline.

use serde::{Deserialize, Serialize};

/// Canonical wire sentinel emitted by the extraction prompt when a
/// document contains nothing usable.
pub const NO_RELEVANT_INFO_SENTINEL: &str = "NO_RELEVANT_INFO_FOUND_IN_UPLOAD";

/// Legacy sentinel emitted by earlier prompt revisions. Recognized on
/// parse, never emitted.
pub const NO_RELEVANT_INFO_LEGACY: &str = "NO_RELEVANT_INFO";

/// The normalized result of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionOutcome {
    /// A human-readable labeled-fact report.
    Facts(String),
    /// The document contained no usable information.
    NoRelevantInfo,
}

impl ExtractionOutcome {
    /// Normalize raw extraction-backend text into an outcome.
    ///
    /// Both the canonical sentinel and the legacy alias map to
    /// `NoRelevantInfo`; anything else (after trimming) is facts.
    /// Blank output is treated as no relevant info rather than an
    /// empty fact report.
    pub fn from_raw(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty()
            || trimmed == NO_RELEVANT_INFO_SENTINEL
            || trimmed == NO_RELEVANT_INFO_LEGACY
        {
            ExtractionOutcome::NoRelevantInfo
        } else {
            ExtractionOutcome::Facts(trimmed.to_string())
        }
    }

    pub fn is_no_relevant_info(&self) -> bool {
        matches!(self, ExtractionOutcome::NoRelevantInfo)
    }
}

/// The extraction result for one uploaded file.
///
/// Consumed immediately when assembling the current turn's context;
/// not persisted beyond the turn except as text embedded in the stored
/// conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub source_filename: String,
    pub outcome: ExtractionOutcome,
}

impl ExtractionResult {
    pub fn new(source_filename: impl Into<String>, outcome: ExtractionOutcome) -> Self {
        Self {
            source_filename: source_filename.into(),
            outcome,
        }
    }
}

/// The motion types the assistant can draft.
///
/// The slug is the stable registry key; the label is what the user
/// sees and what the context block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionCategory {
    /// Motion to Value Secured Claim (§506)
    ValueClaim,
    /// Motion to Avoid Judicial Lien (§522(f))
    AvoidLien,
}

impl MotionCategory {
    pub const ALL: [MotionCategory; 2] = [MotionCategory::ValueClaim, MotionCategory::AvoidLien];

    /// Stable registry key.
    pub fn slug(&self) -> &'static str {
        match self {
            MotionCategory::ValueClaim => "value_claim",
            MotionCategory::AvoidLien => "avoid_lien",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            MotionCategory::ValueClaim => "Motion to Value Secured Claim",
            MotionCategory::AvoidLien => "Motion to Avoid Judicial Lien",
        }
    }

    /// Parse a slug or label back into a category.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.slug() == s || c.label() == s)
    }
}

impl std::fmt::Display for MotionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// User-declared parameters for one turn.
///
/// Absent values are rendered as an explicit "(unspecified)"
/// placeholder by the context assembler — never silently omitted,
/// since the drafting instructions depend on detecting missing fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnParams {
    pub category: Option<MotionCategory>,
    pub jurisdiction: Option<String>,
    /// Bankruptcy chapter (7, 11, or 13) — the sub-classification.
    pub chapter: Option<String>,
}
