use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use voxaudit::analyzer::{self, GeminiClient};
use voxaudit::format;
use voxaudit::report;
use voxaudit::state::AuditLog;
use voxaudit::store::{self, AuditStore};
use voxaudit::tui;

#[derive(Parser)]
#[command(
    name = "voxaudit",
    about = "AI behavioral call audits for call-center recordings"
)]
struct Cli {
    /// Call recording file, or a directory of recordings
    path: Option<String>,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Launch the interactive dashboard
    #[arg(long)]
    tui: bool,

    /// Export the stored audit log (.pdf, .txt, or .json by extension)
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Erase all stored audit records
    #[arg(long)]
    purge: bool,

    /// Skip the purge confirmation prompt
    #[arg(long)]
    yes: bool,

    /// Provider model override
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,

    /// Audit log directory (default: platform data dir)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

/// Logs go to stderr, except in TUI mode where stderr would scribble over the
/// alternate screen; there they append to a file in the data dir.
fn init_tracing(tui_mode: bool, data_dir: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if tui_mode {
        let _ = std::fs::create_dir_all(data_dir);
        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(data_dir.join("voxaudit.log"))
        {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .try_init();
        }
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

fn run_file(path: &Path, store: &AuditStore, client: &GeminiClient, json: bool) -> Result<()> {
    if !analyzer::is_audio_file(path) {
        anyhow::bail!(
            "'{}' is not a recognized audio recording",
            path.display()
        );
    }

    let mut log = AuditLog::hydrate(store.load());
    if !log.begin_analysis() {
        anyhow::bail!("An analysis is already in progress");
    }

    match analyzer::analyze_path(client, path) {
        Ok(record) => {
            log.complete_analysis(record);
            if let Err(e) = store.save(log.audits()) {
                eprintln!("Warning: failed to save audit log: {}", e);
            }
            let newest = &log.audits()[0];
            if json {
                println!("{}", format::format_json_single(newest));
            } else {
                print!("{}", format::format_audit_block(newest, log.len()));
            }
            Ok(())
        }
        Err(e) => {
            log.fail_analysis(&e);
            Err(e.into())
        }
    }
}

fn run_dir(dir: &Path, store: &AuditStore, client: &GeminiClient, json: bool) -> Result<()> {
    let files = analyzer::scan_recordings(dir);
    if files.is_empty() {
        anyhow::bail!("No call recordings found in {}", dir.display());
    }

    let mut log = AuditLog::hydrate(store.load());
    let total = files.len();
    let mut audited = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for (i, file) in files.iter().enumerate() {
        let name = file
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("unknown")
            .to_string();

        if log.audits().iter().any(|a| a.file_name == name) {
            eprintln!("[{}/{}] Skipping (already audited): {}", i + 1, total, name);
            skipped += 1;
            continue;
        }

        eprintln!("[{}/{}] Auditing: {}", i + 1, total, name);

        if !log.begin_analysis() {
            continue;
        }
        match analyzer::analyze_path(client, file) {
            Ok(record) => {
                log.complete_analysis(record);
                if let Err(e) = store.save(log.audits()) {
                    eprintln!("  Warning: failed to save audit log: {}", e);
                }
                audited += 1;
            }
            Err(e) => {
                eprintln!("  Warning: audit failed: {}", e);
                log.fail_analysis(&e);
                failed += 1;
            }
        }
    }

    eprintln!(
        "Done: {} audited, {} skipped, {} failed (out of {} total)",
        audited, skipped, failed, total
    );

    if json {
        println!("{}", format::format_json(log.audits()));
    } else {
        println!("{}", format::format_table(log.audits()));
    }

    Ok(())
}

fn run_export(store: &AuditStore, path: &Path) -> Result<()> {
    let audits = store.load();
    if audits.is_empty() {
        anyhow::bail!(report::NO_RECORDS);
    }

    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("pdf") => report::export_pdf(&audits, path)?,
        Some("txt") => std::fs::write(path, format::format_report(&audits))
            .with_context(|| format!("Failed to write {}", path.display()))?,
        Some("json") => std::fs::write(path, format::format_json(&audits))
            .with_context(|| format!("Failed to write {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported export format for '{}': use .pdf, .txt, or .json",
            path.display()
        ),
    }

    println!("Exported {} records to {}", audits.len(), path.display());
    Ok(())
}

fn run_purge(store: &AuditStore, yes: bool) -> Result<()> {
    if !yes {
        let count = store.load().len();
        eprint!(
            "Purge {} stored audit record(s)? This cannot be undone. [y/N] ",
            count
        );
        std::io::stderr().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        if !matches!(line.trim(), "y" | "Y" | "yes") {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    store.clear().context("Failed to execute purge")?;
    println!("Purge complete. All audit records erased.");
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.purge && (cli.tui || cli.export.is_some() || cli.path.is_some()) {
        anyhow::bail!("--purge cannot be combined with other actions");
    }
    if cli.export.is_some() && cli.tui {
        anyhow::bail!("--export and --tui cannot be used together");
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(store::default_data_dir);
    init_tracing(cli.tui, &data_dir);
    let store = AuditStore::new(&data_dir);

    let mut client = GeminiClient::from_env();
    if let Some(ref model) = cli.model {
        client = client.with_model(model);
    }

    if cli.purge {
        return run_purge(&store, cli.yes);
    }
    if let Some(ref export_path) = cli.export {
        return run_export(&store, export_path);
    }

    if cli.tui {
        let dir = PathBuf::from(cli.path.as_deref().unwrap_or("."));
        if !dir.is_dir() {
            anyhow::bail!("--tui requires a directory of recordings");
        }
        return tui::run(&dir, client, store);
    }

    match cli.path.as_deref() {
        None => {
            let audits = store.load();
            if audits.is_empty() {
                println!("No audit records. Run 'voxaudit <recording>' to create one.");
            } else if cli.json {
                println!("{}", format::format_json(&audits));
            } else {
                println!("{}", format::format_table(&audits));
            }
            Ok(())
        }
        Some(p) => {
            let path = Path::new(p);
            if path.is_file() {
                run_file(path, &store, &client, cli.json)
            } else if path.is_dir() {
                run_dir(path, &store, &client, cli.json)
            } else {
                anyhow::bail!("Path '{}' is not a file or directory", p)
            }
        }
    }
}
