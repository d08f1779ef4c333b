use crate::analyzer::AuditError;
use crate::models::AuditRecord;

/// Application state: the audit sequence (newest first) plus the single
/// in-flight flag and the current error banner. Owned by the shell; the
/// store and the exporters only ever see read-only snapshots of `audits`.
#[derive(Debug, Default)]
pub struct AuditLog {
    audits: Vec<AuditRecord>,
    in_progress: bool,
    error: Option<String>,
}

impl AuditLog {
    /// Start from a persisted snapshot (or empty when nothing was stored).
    pub fn hydrate(audits: Vec<AuditRecord>) -> Self {
        Self {
            audits,
            in_progress: false,
            error: None,
        }
    }

    pub fn audits(&self) -> &[AuditRecord] {
        &self.audits
    }

    pub fn len(&self) -> usize {
        self.audits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audits.is_empty()
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Try to claim the single analysis slot. Returns false (and changes
    /// nothing) while another analysis is in flight; otherwise sets the flag
    /// and clears the error banner.
    pub fn begin_analysis(&mut self) -> bool {
        if self.in_progress {
            return false;
        }
        self.in_progress = true;
        self.error = None;
        true
    }

    /// Record a finished analysis: prepend and release the slot.
    pub fn complete_analysis(&mut self, record: AuditRecord) {
        self.audits.insert(0, record);
        self.in_progress = false;
        self.error = None;
    }

    /// Record a failed analysis: release the slot, surface the message.
    pub fn fail_analysis(&mut self, error: &AuditError) {
        self.in_progress = false;
        self.error = Some(error.to_string());
    }

    pub fn fail_with_message(&mut self, message: impl Into<String>) {
        self.in_progress = false;
        self.error = Some(message.into());
    }

    /// Dismiss the error banner (after the user re-initializes credentials).
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Destructive reset. The caller erases the persisted copy.
    pub fn purge(&mut self) {
        self.audits.clear();
        self.in_progress = false;
        self.error = None;
    }
}
