pub mod app;
pub mod ui;

use std::io;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::analyzer::{self, GeminiClient};
use crate::format;
use crate::models::AnalysisEvent;
use crate::report;
use crate::state::AuditLog;
use crate::store::AuditStore;

use app::{App, ExportFormat, Focus, Recording, RecordingStatus, View};

pub fn run(dir: &Path, client: GeminiClient, store: AuditStore) -> Result<()> {
    let recordings: Vec<Recording> = analyzer::scan_recordings(dir)
        .iter()
        .filter_map(|p| {
            let name = p.file_name().and_then(|f| f.to_str())?.to_string();
            Some(Recording {
                duration_secs: analyzer::probe_duration(p).ok().flatten(),
                name,
                status: RecordingStatus::Idle,
            })
        })
        .collect();

    let log = AuditLog::hydrate(store.load());
    let mut app = App::new(log, store, client, recordings, dir.to_path_buf());
    if !app.client.has_api_key() {
        app.status =
            Some("GEMINI_API_KEY not set. Audits will fail until a key is initialized.".to_string());
    }

    let (tx, rx) = mpsc::channel::<AnalysisEvent>();

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, tx, rx);

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: mpsc::Sender<AnalysisEvent>,
    rx: mpsc::Receiver<AnalysisEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        // Drain analysis events
        while let Ok(event) = rx.try_recv() {
            match event {
                AnalysisEvent::Completed { index, record } => {
                    if let Some(recording) = app.recordings.get_mut(index) {
                        recording.status = RecordingStatus::Audited;
                    }
                    app.log.complete_analysis(record);
                    app.clamp_selection();
                    if let Err(e) = app.store.save(app.log.audits()) {
                        app.status = Some(format!("Warning: failed to save audit log: {}", e));
                    } else {
                        app.status = Some("Audit completed.".to_string());
                    }
                }
                AnalysisEvent::Failed { index, message } => {
                    if let Some(recording) = app.recordings.get_mut(index) {
                        recording.status = RecordingStatus::Error(message.clone());
                    }
                    app.log.fail_with_message(message);
                }
            }
        }

        // Poll for key events
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.view {
                    View::Main => handle_main_key(app, key.code, &tx),
                    View::Detail | View::About => {
                        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                            app.view = View::Main;
                        }
                    }
                    View::Export => handle_export_key(app, key.code),
                    View::PurgeConfirm => handle_purge_key(app, key.code),
                    View::KeyEntry => handle_key_entry(app, key.code),
                    View::Notice => {
                        app.view = View::Main;
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_main_key(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AnalysisEvent>) {
    match code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Enter => match app.focus {
            Focus::Recordings => start_analysis(app, tx),
            Focus::Audits => {
                if !app.log.is_empty() {
                    app.view = View::Detail;
                }
            }
        },
        KeyCode::Char('e') => {
            if app.log.is_empty() {
                app.status = Some(report::NO_RECORDS.to_string());
            } else {
                app.view = View::Export;
                app.export_message = None;
            }
        }
        KeyCode::Char('p') => {
            app.view = View::PurgeConfirm;
        }
        KeyCode::Char('i') => {
            if app.key_setup_available() {
                app.key_input.clear();
                app.view = View::KeyEntry;
            }
        }
        KeyCode::Char('a') => {
            app.view = View::About;
        }
        _ => {}
    }
}

/// Kick off the single in-flight analysis for the selected recording.
/// A second attempt while one is pending is rejected here, before the
/// provider client is ever touched.
fn start_analysis(app: &mut App, tx: &mpsc::Sender<AnalysisEvent>) {
    let index = app.selected_recording;
    if index >= app.recordings.len() {
        return;
    }

    if !app.log.begin_analysis() {
        app.status = Some("An analysis is already in progress.".to_string());
        return;
    }

    app.status = None;
    app.recordings[index].status = RecordingStatus::Analyzing;

    let path = app.dir.join(&app.recordings[index].name);
    let client = app.client.clone();
    let tx = tx.clone();
    std::thread::spawn(move || match analyzer::analyze_path(&client, &path) {
        Ok(record) => {
            let _ = tx.send(AnalysisEvent::Completed { index, record });
        }
        Err(e) => {
            let _ = tx.send(AnalysisEvent::Failed {
                index,
                message: e.to_string(),
            });
        }
    });
}

fn handle_export_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.view = View::Main;
        }
        KeyCode::Tab => {
            app.cycle_export_format();
            app.export_message = None;
        }
        KeyCode::Enter => {
            let path = app
                .dir
                .join(format!("call_audit_report.{}", app.export_format.extension()));
            let audits = app.log.audits();
            let result = match app.export_format {
                ExportFormat::Pdf => report::export_pdf(audits, &path),
                ExportFormat::Text => std::fs::write(&path, format::format_report(audits))
                    .map_err(anyhow::Error::from),
                ExportFormat::Json => std::fs::write(&path, format::format_json(audits))
                    .map_err(anyhow::Error::from),
            };
            app.export_message = Some(match result {
                Ok(()) => format!("Saved to {}", path.display()),
                Err(e) => format!("Error: {}", e),
            });
        }
        _ => {}
    }
}

fn handle_purge_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.view = View::Main;
        }
        KeyCode::Enter | KeyCode::Char('e') => {
            // Erase the store first; state is only reset once the data is
            // actually gone. A failed erase is a blocking notification, not
            // a silent no-op.
            match app.store.clear() {
                Ok(()) => {
                    app.log.purge();
                    app.reset_recording_statuses();
                    app.clamp_selection();
                    app.status = Some("All audit records purged.".to_string());
                    app.view = View::Main;
                }
                Err(e) => {
                    app.notice = format!("Failed to execute purge: {}", e);
                    app.view = View::Notice;
                }
            }
        }
        _ => {}
    }
}

fn handle_key_entry(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => {
            app.view = View::Main;
        }
        KeyCode::Enter => {
            let key = app.key_input.trim().to_string();
            if !key.is_empty() {
                app.client.set_api_key(key);
                app.log.clear_error();
                app.status = Some("API key initialized.".to_string());
            }
            app.view = View::Main;
        }
        KeyCode::Backspace => {
            app.key_input.pop();
        }
        KeyCode::Char(c) => {
            app.key_input.push(c);
        }
        _ => {}
    }
}
