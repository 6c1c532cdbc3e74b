//! `briefsmith chat` — Interactive drafting session.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use briefsmith_config::Secrets;
use briefsmith_core::extraction::{MotionCategory, TurnParams};
use briefsmith_core::turn::{AttachedFile, SessionState};
use briefsmith_drafting::{DraftingOrchestrator, KnowledgeStoreRegistry, TurnDriver, TurnOutcome};
use briefsmith_providers::{GeminiExtractor, HttpPdfConverter, ResponsesClient};
use briefsmith_security::PasswordGate;
use tracing::{debug, info, warn};

pub async fn run(
    registry_path: PathBuf,
    motion: Option<String>,
    jurisdiction: Option<String>,
    chapter: Option<String>,
    converter_url: Option<String>,
    output_dir: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let secrets = Secrets::from_env();

    let Some(drafting_key) = secrets.drafting_api_key.clone() else {
        eprintln!();
        eprintln!("  ERROR: No drafting API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    BRIEFSMITH_OPENAI_API_KEY = 'sk-...'");
        eprintln!("    OPENAI_API_KEY            = 'sk-...'");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    };

    // Password gate, only when a password is configured.
    if let Some(password) = &secrets.app_password {
        let gate = PasswordGate::new(password);
        if !prompt_password(&gate)? {
            return Err("Too many failed password attempts.".into());
        }
    }

    let client = Arc::new(ResponsesClient::openai(drafting_key));
    let mut orchestrator = DraftingOrchestrator::new(client.clone());
    if let Some(url) = &converter_url {
        orchestrator = orchestrator.with_converter(Arc::new(HttpPdfConverter::new(url.clone())));
    }

    let mut driver = TurnDriver::new(orchestrator);
    let extraction_enabled = secrets.extraction_api_key.is_some();
    if let Some(key) = secrets.extraction_api_key.clone() {
        driver = driver.with_extractor(Arc::new(GeminiExtractor::new(key)));
    }

    info!(
        registry = %registry_path.display(),
        extraction = extraction_enabled,
        conversion = converter_url.is_some(),
        "Starting drafting session"
    );
    let mut registry = KnowledgeStoreRegistry::open(registry_path, client)?;

    let mut params = TurnParams {
        category: match &motion {
            Some(slug) => Some(parse_motion(slug)?),
            None => None,
        },
        jurisdiction,
        chapter,
    };

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║       Briefsmith — Drafting Session          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Motion:       {}", motion_label(&params));
    println!(
        "  Extraction:   {}",
        if extraction_enabled { "enabled" } else { "disabled (no key)" }
    );
    println!(
        "  Conversion:   {}",
        if converter_url.is_some() { "enabled" } else { "disabled" }
    );
    println!();
    println!("  Type your request and press Enter. Commands:");
    println!("    /motion <value_claim|avoid_lien>   select motion type");
    println!("    /jurisdiction <text>               set jurisdiction");
    println!("    /chapter <7|11|13>                 set chapter");
    println!("    /upload <path>                     attach a document to the next turn");
    println!("    /reset                             clear the conversation");
    println!("    /exit                              quit");
    println!();

    let mut session = SessionState::new();
    let mut pending_uploads: Vec<AttachedFile> = Vec::new();
    let stdin = std::io::stdin();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let (cmd, arg) = match rest.split_once(' ') {
                Some((c, a)) => (c, a.trim()),
                None => (rest, ""),
            };
            match cmd {
                "exit" | "quit" => break,
                "reset" => {
                    session.clear();
                    pending_uploads.clear();
                    println!("  Conversation cleared.");
                }
                "motion" => match parse_motion(arg) {
                    Ok(category) => {
                        params.category = Some(category);
                        println!("  Motion type: {}", category.label());
                    }
                    Err(e) => eprintln!("  [Error] {e}"),
                },
                "jurisdiction" => {
                    params.jurisdiction = Some(arg.to_string());
                    println!("  Jurisdiction: {arg}");
                }
                "chapter" => {
                    params.chapter = Some(arg.to_string());
                    println!("  Chapter: {arg}");
                }
                "upload" => match std::fs::read(arg) {
                    Ok(bytes) => {
                        let name = PathBuf::from(arg)
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| arg.to_string());
                        debug!(file = %name, bytes = bytes.len(), "Queued upload");
                        println!("  Attached {name} ({} bytes)", bytes.len());
                        pending_uploads.push(AttachedFile::new(name, bytes));
                    }
                    Err(e) => eprintln!("  [Error] Could not read {arg}: {e}"),
                },
                other => eprintln!("  [Error] Unknown command: /{other}"),
            }
            continue;
        }

        let uploads = std::mem::take(&mut pending_uploads);
        println!();
        print!("  Assistant > ");
        std::io::stdout().flush()?;

        let outcome = driver
            .process(&mut session, &mut registry, &params, uploads, line, |delta| {
                print!("{delta}");
                let _ = std::io::stdout().flush();
            })
            .await;

        println!();
        report_outcome(&outcome, &output_dir);
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn report_outcome(outcome: &TurnOutcome, output_dir: &std::path::Path) {
    if let Some(error) = &outcome.error {
        warn!(error = %error, "Turn failed");
        eprintln!("  [Error] {error}");
        return;
    }
    debug!(
        artifacts = outcome.artifacts.len(),
        citations = outcome.citations.len(),
        warnings = outcome.warnings.len(),
        "Turn completed"
    );

    if !outcome.citations.is_empty() {
        println!();
        println!("  Sources:");
        for citation in &outcome.citations {
            let rank = citation.rank.map(|r| r.to_string()).unwrap_or_default();
            println!("    [{rank}] {}", citation.source_filename);
        }
    }

    for artifact in &outcome.artifacts {
        let path = output_dir.join(&artifact.filename);
        match std::fs::create_dir_all(output_dir)
            .and_then(|_| std::fs::write(&path, &artifact.bytes))
        {
            Ok(_) => println!("  Saved {}", path.display()),
            Err(e) => eprintln!("  [Error] Could not save {}: {e}", artifact.filename),
        }
    }

    for warning in &outcome.warnings {
        eprintln!("  [Warning] {warning}");
    }
}

fn prompt_password(gate: &PasswordGate) -> Result<bool, Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    for _ in 0..3 {
        print!("  Password: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(false);
        }
        if gate.verify(line.trim_end_matches(['\r', '\n'])) {
            return Ok(true);
        }
        eprintln!("  Incorrect password.");
    }
    Ok(false)
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

fn motion_label(params: &TurnParams) -> String {
    params
        .category
        .map(|c| c.label().to_string())
        .unwrap_or_else(|| "(not selected)".to_string())
}
