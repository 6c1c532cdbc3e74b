//! `briefsmith stores` — Knowledge store administration.

use std::path::PathBuf;
use std::sync::Arc;

use briefsmith_config::Secrets;
use briefsmith_core::extraction::MotionCategory;
use briefsmith_drafting::KnowledgeStoreRegistry;
use briefsmith_providers::ResponsesClient;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum StoresAction {
    /// Provision a knowledge store for a motion type
    Init {
        /// Motion type slug (value_claim or avoid_lien)
        motion: String,
    },

    /// List configured knowledge stores
    List,

    /// Upload a reference document into a motion type's store
    Index {
        /// Motion type slug
        motion: String,

        /// Path to the document to index
        file: PathBuf,
    },

    /// List documents indexed in a motion type's store
    Files {
        /// Motion type slug
        motion: String,
    },
}

pub async fn run(
    registry_path: PathBuf,
    action: StoresAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = Secrets::from_env();
    let key = secrets
        .drafting_api_key
        .clone()
        .ok_or("No drafting API key configured (set BRIEFSMITH_OPENAI_API_KEY)")?;
    let client = Arc::new(ResponsesClient::openai(key));
    let mut registry = KnowledgeStoreRegistry::open(registry_path, client)?;

    match action {
        StoresAction::Init { motion } => {
            let category = parse_motion(&motion)?;
            let store_id = registry.get_or_create(category).await?;
            println!("  {} -> {}", category.slug(), store_id);
        }
        StoresAction::List => {
            let stores = registry.list();
            if stores.is_empty() {
                println!("  No knowledge stores configured.");
                println!("  Provision one with: briefsmith stores init <motion>");
            } else {
                for (slug, store_id) in stores {
                    println!("  {slug:<14} {store_id}");
                }
            }
        }
        StoresAction::Index { motion, file } => {
            let category = parse_motion(&motion)?;
            let bytes = std::fs::read(&file)
                .map_err(|e| format!("Could not read {}: {e}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| format!("Not a file path: {}", file.display()))?;
            let file_id = registry.index_document(category, &filename, &bytes).await?;
            println!("  Indexed {filename} as {file_id}");
        }
        StoresAction::Files { motion } => {
            let category = parse_motion(&motion)?;
            let files = registry.indexed_files(category).await?;
            if files.is_empty() {
                println!("  No documents indexed for {}.", category.slug());
            } else {
                for file in files {
                    println!("  {:<32} {}", file.filename, file.file_id);
                }
            }
        }
    }

    Ok(())
}

pub fn reset(registry_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match std::fs::remove_file(&registry_path) {
        Ok(_) => {
            println!("  Removed {}", registry_path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("  Nothing to remove at {}", registry_path.display());
            Ok(())
        }
        Err(e) => Err(format!("Could not remove {}: {e}", registry_path.display()).into()),
    }
}

fn parse_motion(slug: &str) -> Result<MotionCategory, String> {
    MotionCategory::parse(slug).ok_or_else(|| {
        format!(
            "Unknown motion type '{slug}'. Expected one of: {}",
            MotionCategory::ALL
                .iter()
                .map(|c| c.slug())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}
