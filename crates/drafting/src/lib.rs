//! # Briefsmith Drafting
//!
//! The multi-stage retrieval-and-drafting pipeline:
//!
//! 1. Uploaded documents are extracted into structured fact reports
//!    (strictly sequentially, in upload order).
//! 2. The context assembler merges user-declared parameters with the
//!    non-sentinel extraction results into one context block.
//! 3. The orchestrator issues a single grounded, streaming generation
//!    call per turn, with retrieval scoped to the category's knowledge
//!    store, sandboxed execution enabled, and the HTML→PDF function
//!    declared when a converter is configured.
//! 4. After the stream completes, one bounded follow-up retrieve
//!    recovers citations and generated artifacts, both degrading
//!    gracefully when the backend cannot supply them.

pub mod context;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use context::assemble;
pub use orchestrator::{DraftingOrchestrator, TurnOutcome};
pub use registry::KnowledgeStoreRegistry;
pub use session::TurnDriver;
