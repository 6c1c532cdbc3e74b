//! # Briefsmith Core
//!
//! Domain types, traits, and error definitions for the Briefsmith
//! motion-drafting assistant. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external backend (drafting, extraction, conversion, store
//! administration) is defined as a trait here. HTTP implementations live
//! in `briefsmith-providers`. This enables:
//! - Swapping backends via configuration
//! - Testing the orchestration pipeline with scripted mock backends
//! - Clean dependency graph (all crates depend inward on core)

pub mod backend;
pub mod error;
pub mod extraction;
pub mod shape;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use backend::{
    DocumentExtractor, DraftRequest, DraftStreamEvent, DraftingBackend, ConversionResult,
    PdfConverter, StoreAdmin, StoreFile,
};
pub use error::{Error, Result};
pub use extraction::{ExtractionOutcome, ExtractionResult, MotionCategory, TurnParams};
pub use turn::{
    ArtifactOrigin, AttachedFile, Citation, ConversationTurn, GeneratedArtifact, Role,
    SessionState,
};
