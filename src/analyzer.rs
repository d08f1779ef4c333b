use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuditRecord, Disposition, Scorecard, Sentiment};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Fallback message when the provider fails without saying why.
pub const DEFAULT_FAILURE: &str = "Analysis failed. Audio stream may be unreadable.";

/// Placeholder agent code when the filename carries no IN-number.
pub const AGENT_UNIDENTIFIED: &str = "AGENT_UNIDENTIFIED";

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "ogg", "opus", "flac", "aac", "aif", "aiff",
];

/// Everything that can go wrong between picking a recording and holding a
/// validated audit. One upload attempt yields at most one of these; nothing
/// is retried automatically.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("API key missing or invalid. Initialize a key and retry.")]
    NotAuthenticated,
    #[error("Quota Exceeded. System limits reached. Please try again later.")]
    QuotaExceeded,
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("Audio decoding failed: {0}")]
    DecodeFailure(String),
    #[error("Analysis cancelled before completion.")]
    Cancelled,
    #[error("{0}")]
    AnalysisFailed(String),
}

/// Check if a path has a recognized audio file extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scan a directory for call recordings, sorted by filename.
pub fn scan_recordings(path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_audio_file(p))
        .collect();
    files.sort();
    files
}

/// Media type for the inline upload, from the file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("aac") => "audio/aac",
        Some("aif") | Some("aiff") => "audio/aiff",
        _ => "application/octet-stream",
    }
}

fn agent_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)IN\d+").expect("agent code pattern"))
}

/// Extract the agent code (uppercased "IN" + digits) from a recording
/// filename, or the fixed sentinel when the filename carries none.
pub fn extract_agent_code(file_name: &str) -> String {
    agent_code_re()
        .find(file_name)
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_else(|| AGENT_UNIDENTIFIED.to_string())
}

/// Verify the file parses as audio and return its duration in seconds when
/// the container declares one. Fails with `DecodeFailure` before any network
/// traffic happens.
pub fn probe_duration(path: &Path) -> Result<Option<f64>, AuditError> {
    let file = File::open(path)
        .map_err(|e| AuditError::DecodeFailure(format!("{}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AuditError::DecodeFailure(format!("{}: {}", path.display(), e)))?;

    let duration = probed.format.tracks().iter().find_map(|t| {
        let frames = t.codec_params.n_frames?;
        let rate = t.codec_params.sample_rate?;
        Some(frames as f64 / rate as f64)
    });

    Ok(duration)
}

/// Read a recording into memory, verifying it decodes as audio first.
pub fn read_recording(path: &Path) -> Result<(Vec<u8>, &'static str), AuditError> {
    probe_duration(path)?;
    let bytes = std::fs::read(path)
        .map_err(|e| AuditError::DecodeFailure(format!("{}: {}", path.display(), e)))?;
    Ok((bytes, mime_for_path(path)))
}

// Gemini generateContent wire format.

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// The audit payload as the provider returns it: everything required except
/// `confidence`. Deserialization doubles as schema validation; a missing
/// field or an out-of-set enum string fails the parse.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderAudit {
    recorded_disposition: String,
    suggested_disposition: Disposition,
    #[serde(default)]
    confidence: f64,
    summary: String,
    detailed_narrative: String,
    failure_points: Vec<String>,
    customer_sentiment: Sentiment,
    next_steps: String,
    duration: String,
    scorecard: Scorecard,
}

/// Structured-output schema sent with every request. Mirrors `ProviderAudit`;
/// `confidence` is deliberately absent from `required`.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "recordedDisposition": { "type": "STRING" },
            "suggestedDisposition": {
                "type": "STRING",
                "enum": [
                    "SALE", "CALLBACK", "CallCut", "CNP", "Not Interested",
                    "Do Not Call", "Do Not Qualify", "TroubleShooter",
                    "LanguageBarrier", "OTHER"
                ]
            },
            "confidence": { "type": "NUMBER" },
            "summary": { "type": "STRING" },
            "detailedNarrative": { "type": "STRING" },
            "failurePoints": { "type": "ARRAY", "items": { "type": "STRING" } },
            "customerSentiment": {
                "type": "STRING",
                "enum": ["Positive", "Neutral", "Negative"]
            },
            "nextSteps": { "type": "STRING" },
            "duration": { "type": "STRING" },
            "scorecard": {
                "type": "OBJECT",
                "properties": {
                    "discoveryPhase": { "type": "STRING" },
                    "objectionHandling": { "type": "STRING" },
                    "strictAdherence": { "type": "STRING" }
                },
                "required": ["discoveryPhase", "objectionHandling", "strictAdherence"]
            }
        },
        "required": [
            "recordedDisposition", "suggestedDisposition", "summary",
            "detailedNarrative", "failurePoints", "customerSentiment",
            "nextSteps", "scorecard", "duration"
        ]
    })
}

/// Instruction text sent alongside the audio. The disposition rules are the
/// audit contract and must not be reworded.
fn audit_prompt(agent_code: &str) -> String {
    format!(
        "AUDIT PROTOCOL: Agent Code: {agent_code}. \n\
You are an Elite Behavioral QA Director. Your analysis must be surgical, critical, and granular. \n\
\n\
TERMINOLOGY RULE: \n\
- NEVER use the term \"Lead Generated\" or \"Lead\". \n\
- Any positive outcome where a follow-up is required or interest is shown MUST be categorized as \"CALLBACK\".\n\
- \"SALE\" is only for definitive closes.\n\
\n\
Focus on:\n\
1. MANDATORY DISPOSITION CATEGORIZATION:\n\
   - SALE: Only if definitive closing happens.\n\
   - CALLBACK: MANDATORY for any positive interest, appointment set, or follow-up requested. (Replaces 'Lead').\n\
   - CNP (Customer Not Present): Answering machine, disconnect before greeting, or silence.\n\
   - NI (Not Interested): Direct rejection.\n\
   - CC (Call Cut): Hangup during pitch.\n\
\n\
2. SURGICAL BEHAVIORAL ANALYSIS:\n\
   - Empathy Index: Listening vs waiting to speak.\n\
   - Dead Air: Timestamps of silences > 2 seconds.\n\
   - Rebuttal Quality: Usage of Empathize-Pivot-Ask framework.\n\
   - Pitch Energy: Professionalism level.\n\
\n\
3. FEEDBACK:\n\
   - 'detailedNarrative': Turn-by-Turn breakdown [MM:SS].\n\
   - 'failurePoints': Specific skill critiques.\n\
\n\
Output strictly valid JSON."
    )
}

/// Parse and validate the provider's JSON text, then merge in the locally
/// generated identity fields. Any shape violation is a `MalformedResponse`.
fn parse_audit(text: &str, file_name: &str, agent_code: &str) -> Result<AuditRecord, AuditError> {
    let audit: ProviderAudit = serde_json::from_str(text)
        .map_err(|e| AuditError::MalformedResponse(e.to_string()))?;

    Ok(AuditRecord {
        id: Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        file_name: file_name.to_string(),
        agent_code: agent_code.to_string(),
        recorded_disposition: audit.recorded_disposition,
        suggested_disposition: audit.suggested_disposition,
        confidence: audit.confidence,
        summary: audit.summary,
        detailed_narrative: audit.detailed_narrative,
        failure_points: audit.failure_points,
        customer_sentiment: audit.customer_sentiment,
        next_steps: audit.next_steps,
        duration: audit.duration,
        scorecard: audit.scorecard,
    })
}

/// Map an HTTP failure to the audit error taxonomy. Quota exhaustion and
/// credential problems get their own variants; everything else keeps the
/// provider's message when it has one.
fn classify_http_failure(status: u16, body: &str) -> AuditError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let lower = message.to_lowercase();

    if status == 429 || lower.contains("quota") {
        AuditError::QuotaExceeded
    } else if lower.contains("api key") {
        AuditError::NotAuthenticated
    } else if message.is_empty() {
        AuditError::AnalysisFailed(DEFAULT_FAILURE.to_string())
    } else {
        AuditError::AnalysisFailed(format!("Provider error {}: {}", status, message))
    }
}

/// Client for the generative-AI audit provider. Pure request/response: it
/// never touches application state.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            client,
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Build a client from `GEMINI_API_KEY`, honoring the `VOXAUDIT_API_BASE`
    /// endpoint override.
    pub fn from_env() -> Self {
        let mut client = Self::new(std::env::var("GEMINI_API_KEY").unwrap_or_default());
        if let Ok(base) = std::env::var("VOXAUDIT_API_BASE") {
            client.base_url = base.trim_end_matches('/').to_string();
        }
        client
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Replace the credential after the user re-initializes it.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = api_key.trim().to_string();
    }

    /// Run one behavioral audit over a recording. One request, one validated
    /// record; every failure is terminal for the attempt.
    pub fn analyze(
        &self,
        audio: &[u8],
        mime_type: &str,
        file_name: &str,
    ) -> Result<AuditRecord, AuditError> {
        if self.api_key.is_empty() {
            return Err(AuditError::NotAuthenticated);
        }

        let agent_code = extract_agent_code(file_name);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: BASE64.encode(audio),
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(audit_prompt(&agent_code)),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        tracing::debug!(model = %self.model, file = %file_name, bytes = audio.len(), "Uploading recording for audit");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| AuditError::AnalysisFailed(format!("request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let err = classify_http_failure(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), error = %err, "Audit request failed");
            return Err(err);
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| AuditError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                AuditError::MalformedResponse("response contained no audit text".to_string())
            })?;

        let record = parse_audit(text, file_name, &agent_code)?;

        tracing::info!(
            agent = %record.agent_code,
            disposition = record.suggested_disposition.code(),
            "Audit completed"
        );

        Ok(record)
    }
}

/// Read, encode, and audit one recording. Convenience for the CLI path and
/// the TUI worker thread.
pub fn analyze_path(client: &GeminiClient, path: &Path) -> Result<AuditRecord, AuditError> {
    let (audio, mime) = read_recording(path)?;
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unknown")
        .to_string();
    client.analyze(&audio, mime, &file_name)
}
