//! Artifact and citation resolution from a finalized response.
//!
//! The finalized response object carries two independent artifact
//! sources — sandbox-execution outputs (container files) and message
//! annotations referencing them — plus retrieval results for
//! citations. Every individual download is fault-isolated: one failed
//! fetch degrades the returned set, never the turn.

use briefsmith_core::backend::DraftingBackend;
use briefsmith_core::shape;
use briefsmith_core::turn::{ArtifactOrigin, Citation, GeneratedArtifact};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// A sandbox file reference discovered in the response output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SandboxFileRef {
    /// Container id, when the reference is container-scoped.
    container_id: Option<String>,
    file_id: String,
    filename: String,
    mime_type: Option<String>,
}

/// Extract retrieval citations from the finalized response, in the
/// order the backend ranked them.
///
/// Tolerates the results field being absent (retrieve without include)
/// and individual fields being missing: a result without a score or
/// filename still yields a citation.
pub fn citations_from(response: &Value) -> Vec<Citation> {
    let mut citations = Vec::new();

    for item in shape::arr_at(response, "output") {
        if shape::type_of(item) != "file_search_call" {
            continue;
        }
        for (index, result) in shape::arr_at(item, "results").iter().enumerate() {
            citations.push(Citation {
                source_file_id: shape::str_at(result, &["file_id", "id"])
                    .unwrap_or_default()
                    .to_string(),
                source_filename: shape::str_or(result, "filename", "(unknown)").to_string(),
                excerpt: shape::str_at(result, &["text", "content"])
                    .unwrap_or_default()
                    .to_string(),
                score: shape::f64_at(result, "score"),
                rank: shape::u64_at(result, "rank")
                    .map(|r| r as u32)
                    .or(Some(index as u32 + 1)),
            });
        }
    }

    citations
}

/// Download every sandbox-execution artifact referenced by the
/// finalized response.
///
/// Both sources are checked independently: `code_interpreter_call`
/// output files, and `container_file_citation` annotations on message
/// content. Duplicated references resolve once. A failed download is
/// recorded as a warning and omitted.
pub async fn resolve_sandbox_artifacts(
    backend: &dyn DraftingBackend,
    response: &Value,
    warnings: &mut Vec<String>,
) -> Vec<GeneratedArtifact> {
    let refs = collect_sandbox_refs(response);
    debug!(count = refs.len(), "Resolving sandbox artifacts");

    let mut artifacts = Vec::new();
    for file_ref in refs {
        let fetched = match &file_ref.container_id {
            Some(container_id) => {
                backend
                    .container_file_content(container_id, &file_ref.file_id)
                    .await
            }
            None => backend.file_content(&file_ref.file_id).await,
        };

        match fetched {
            Ok(bytes) => artifacts.push(GeneratedArtifact {
                filename: normalize_filename(&file_ref.filename, file_ref.mime_type.as_deref()),
                bytes,
                origin: ArtifactOrigin::SandboxExecution,
            }),
            Err(e) => {
                warn!(file_id = %file_ref.file_id, error = %e, "Artifact download failed");
                warnings.push(format!(
                    "Could not download generated file {}: {e}",
                    file_ref.file_id
                ));
            }
        }
    }
    artifacts
}

/// Scan the output items for sandbox file references, deduplicated by
/// file id.
fn collect_sandbox_refs(response: &Value) -> Vec<SandboxFileRef> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut refs = Vec::new();

    for item in shape::arr_at(response, "output") {
        match shape::type_of(item) {
            "code_interpreter_call" => {
                let container_id = shape::str_at(item, &["container_id"]).map(String::from);
                for output in shape::arr_at(item, "outputs") {
                    if !matches!(shape::type_of(output), "file" | "output_file") {
                        continue;
                    }
                    let Some(file_id) = shape::str_at(output, &["file_id", "id"]) else {
                        continue;
                    };
                    if !seen.insert(file_id.to_string()) {
                        continue;
                    }
                    let filename = shape::str_at(output, &["filename", "name"])
                        .map(String::from)
                        .unwrap_or_else(|| format!("download_{file_id}"));
                    refs.push(SandboxFileRef {
                        container_id: container_id.clone(),
                        file_id: file_id.to_string(),
                        filename,
                        mime_type: shape::str_at(output, &["mime_type"]).map(String::from),
                    });
                }
            }
            "message" => {
                for part in shape::arr_at(item, "content") {
                    for annotation in shape::arr_at(part, "annotations") {
                        if shape::type_of(annotation) != "container_file_citation" {
                            continue;
                        }
                        let Some(file_id) = shape::str_at(annotation, &["file_id", "id"]) else {
                            continue;
                        };
                        if !seen.insert(file_id.to_string()) {
                            continue;
                        }
                        let filename = shape::str_at(annotation, &["filename", "name"])
                            .map(String::from)
                            .unwrap_or_else(|| format!("download_{file_id}"));
                        refs.push(SandboxFileRef {
                            container_id: shape::str_at(annotation, &["container_id"])
                                .map(String::from),
                            file_id: file_id.to_string(),
                            filename,
                            mime_type: shape::str_at(annotation, &["mime_type"]).map(String::from),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    refs
}

/// Append an inferred extension when the filename lacks one and the
/// declared MIME type maps to a known extension. Otherwise the name is
/// left unchanged — never guessed.
pub fn normalize_filename(filename: &str, mime_type: Option<&str>) -> String {
    if filename.rsplit('/').next().is_some_and(|base| base.contains('.')) {
        return filename.to_string();
    }
    let Some(mime) = mime_type else {
        return filename.to_string();
    };
    match mime_guess::get_mime_extensions_str(mime).and_then(|exts| exts.first()) {
        Some(ext) => format!("{filename}.{ext}"),
        None => filename.to_string(),
    }
}
