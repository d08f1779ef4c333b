use std::path::PathBuf;

use crate::analyzer::GeminiClient;
use crate::state::AuditLog;
use crate::store::AuditStore;

/// Per-recording status in the intake list.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingStatus {
    Idle,
    Analyzing,
    Audited,
    Error(String),
}

/// One entry in the intake list: a recording in the watched directory.
pub struct Recording {
    pub name: String,
    pub duration_secs: Option<f64>,
    pub status: RecordingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Main,
    Detail,
    Export,
    PurgeConfirm,
    KeyEntry,
    About,
    /// Blocking notification (purge failure); any key dismisses it.
    Notice,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Recordings,
    Audits,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportFormat {
    Pdf,
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "PDF (master log)",
            ExportFormat::Text => "Text",
            ExportFormat::Json => "JSON",
        }
    }
}

pub struct App {
    pub log: AuditLog,
    pub store: AuditStore,
    pub client: GeminiClient,
    pub recordings: Vec<Recording>,
    pub dir: PathBuf,
    pub view: View,
    pub focus: Focus,
    pub selected_recording: usize,
    pub selected_audit: usize,
    pub recordings_scroll: usize,
    pub audits_scroll: usize,
    /// Visible heights of the two tables (updated each frame by the renderer)
    pub recordings_rows: usize,
    pub audits_rows: usize,
    pub export_format: ExportFormat,
    pub export_message: Option<String>,
    pub key_input: String,
    pub notice: String,
    /// Transient status line (busy rejections, save warnings)
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        log: AuditLog,
        store: AuditStore,
        client: GeminiClient,
        recordings: Vec<Recording>,
        dir: PathBuf,
    ) -> Self {
        let mut app = Self {
            log,
            store,
            client,
            recordings,
            dir,
            view: View::Main,
            focus: Focus::Recordings,
            selected_recording: 0,
            selected_audit: 0,
            recordings_scroll: 0,
            audits_scroll: 0,
            recordings_rows: 20,
            audits_rows: 20,
            export_format: ExportFormat::Pdf,
            export_message: None,
            key_input: String::new(),
            notice: String::new(),
            status: None,
            should_quit: false,
        };
        app.mark_audited_recordings();
        app
    }

    /// Flag recordings that already have an audit under the same filename.
    pub fn mark_audited_recordings(&mut self) {
        for recording in &mut self.recordings {
            if self
                .log
                .audits()
                .iter()
                .any(|a| a.file_name == recording.name)
            {
                recording.status = RecordingStatus::Audited;
            }
        }
    }

    /// Reset every recording to Idle (after a purge).
    pub fn reset_recording_statuses(&mut self) {
        for recording in &mut self.recordings {
            recording.status = RecordingStatus::Idle;
        }
    }

    pub fn select_next(&mut self) {
        match self.focus {
            Focus::Recordings => {
                if !self.recordings.is_empty() {
                    self.selected_recording =
                        (self.selected_recording + 1).min(self.recordings.len() - 1);
                }
            }
            Focus::Audits => {
                if !self.log.is_empty() {
                    self.selected_audit = (self.selected_audit + 1).min(self.log.len() - 1);
                }
            }
        }
        self.ensure_visible();
    }

    pub fn select_prev(&mut self) {
        match self.focus {
            Focus::Recordings => {
                self.selected_recording = self.selected_recording.saturating_sub(1)
            }
            Focus::Audits => self.selected_audit = self.selected_audit.saturating_sub(1),
        }
        self.ensure_visible();
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Recordings => Focus::Audits,
            Focus::Audits => Focus::Recordings,
        };
    }

    /// Keep the selection inside its table's visible window.
    fn ensure_visible(&mut self) {
        fn adjust(selected: usize, scroll: &mut usize, rows: usize) {
            if rows == 0 {
                return;
            }
            if selected < *scroll {
                *scroll = selected;
            } else if selected >= *scroll + rows {
                *scroll = selected - rows + 1;
            }
        }
        adjust(
            self.selected_recording,
            &mut self.recordings_scroll,
            self.recordings_rows,
        );
        adjust(self.selected_audit, &mut self.audits_scroll, self.audits_rows);
    }

    /// Clamp selections after the audit list changed length.
    pub fn clamp_selection(&mut self) {
        if self.log.is_empty() {
            self.selected_audit = 0;
            self.audits_scroll = 0;
        } else if self.selected_audit >= self.log.len() {
            self.selected_audit = self.log.len() - 1;
        }
        self.ensure_visible();
    }

    pub fn cycle_export_format(&mut self) {
        self.export_format = match self.export_format {
            ExportFormat::Pdf => ExportFormat::Text,
            ExportFormat::Text => ExportFormat::Json,
            ExportFormat::Json => ExportFormat::Pdf,
        };
    }

    /// The key-setup remedy is offered only while a credential error is the
    /// active error.
    pub fn key_setup_available(&self) -> bool {
        self.log
            .error()
            .map(|e| e.to_lowercase().contains("api key"))
            .unwrap_or(false)
    }
}
