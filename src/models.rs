use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed disposition taxonomy for a call outcome.
///
/// The wire strings are fixed: they are what the provider is constrained to
/// return and what persisted audit logs contain. Anything outside this set is
/// rejected during response validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    #[serde(rename = "SALE")]
    Sale,
    #[serde(rename = "CALLBACK")]
    Callback,
    #[serde(rename = "CallCut")]
    CallCut,
    #[serde(rename = "CNP")]
    Cnp,
    #[serde(rename = "Not Interested")]
    NotInterested,
    #[serde(rename = "Do Not Call")]
    DoNotCall,
    #[serde(rename = "Do Not Qualify")]
    DoNotQualify,
    #[serde(rename = "TroubleShooter")]
    TroubleShooter,
    #[serde(rename = "LanguageBarrier")]
    LanguageBarrier,
    #[serde(rename = "OTHER")]
    Other,
}

impl Disposition {
    /// Short code used in table columns and report headers.
    pub fn code(&self) -> &'static str {
        match self {
            Disposition::Sale => "SALE",
            Disposition::Callback => "CALLBK",
            Disposition::CallCut => "CC",
            Disposition::Cnp => "CNP",
            Disposition::NotInterested => "NI",
            Disposition::DoNotCall => "DNC",
            Disposition::DoNotQualify => "DNQ",
            Disposition::TroubleShooter => "TS",
            Disposition::LanguageBarrier => "LB",
            Disposition::Other => "OTHER",
        }
    }

    /// Full wire string, as stored and as shown in detail views.
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Sale => "SALE",
            Disposition::Callback => "CALLBACK",
            Disposition::CallCut => "CallCut",
            Disposition::Cnp => "CNP",
            Disposition::NotInterested => "Not Interested",
            Disposition::DoNotCall => "Do Not Call",
            Disposition::DoNotQualify => "Do Not Qualify",
            Disposition::TroubleShooter => "TroubleShooter",
            Disposition::LanguageBarrier => "LanguageBarrier",
            Disposition::Other => "OTHER",
        }
    }
}

/// Customer sentiment as judged by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

/// Fixed three-field qualitative evaluation of call handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub discovery_phase: String,
    pub objection_handling: String,
    pub strict_adherence: String,
}

/// One completed audit. Immutable once created; provider-sourced text fields
/// are untrusted display content and are never parsed further.
///
/// Serialized camelCase so persisted logs stay wire-compatible with the
/// provider response fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    pub agent_code: String,
    pub recorded_disposition: String,
    pub suggested_disposition: Disposition,
    #[serde(default)]
    pub confidence: f64,
    pub summary: String,
    pub detailed_narrative: String,
    pub failure_points: Vec<String>,
    pub customer_sentiment: Sentiment,
    pub next_steps: String,
    pub duration: String,
    pub scorecard: Scorecard,
}

/// Sent from the analysis worker thread to the TUI.
pub enum AnalysisEvent {
    Completed { index: usize, record: AuditRecord },
    Failed { index: usize, message: String },
}
