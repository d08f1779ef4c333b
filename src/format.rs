use chrono::{DateTime, Local, Utc};

use crate::models::AuditRecord;

/// Format a stored timestamp for display, in local time.
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

pub fn format_confidence(confidence: f64) -> String {
    format!("{:.0}%", (confidence.clamp(0.0, 1.0)) * 100.0)
}

/// Format a probed duration in seconds as "M:SS".
pub fn format_duration(secs: f64) -> String {
    let total_secs = secs.round() as u64;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Format the audit log as a summary table, newest first.
pub fn format_table(audits: &[AuditRecord]) -> String {
    let separator = "\u{2500}".repeat(96);
    let mut output = String::new();

    output.push_str(&format!(
        "{:<5} {:<18} {:>7} {:<16} {:<9} {:>5} {:>9}  {:<16}  {}\n",
        "#", "Agent", "Verdict", "Logged", "Sent.", "Conf", "Duration", "Date", "File"
    ));
    output.push_str(&separator);
    output.push('\n');

    let total = audits.len();
    for (i, audit) in audits.iter().enumerate() {
        let mut logged = audit.recorded_disposition.clone();
        if logged.len() > 16 {
            logged.truncate(15);
            logged.push('\u{2026}');
        }
        output.push_str(&format!(
            "{:<5} {:<18} {:>7} {:<16} {:<9} {:>5} {:>9}  {:<16}  {}\n",
            total - i,
            audit.agent_code,
            audit.suggested_disposition.code(),
            logged,
            audit.customer_sentiment.label(),
            format_confidence(audit.confidence),
            audit.duration,
            format_date(&audit.timestamp),
            audit.file_name,
        ));
    }

    output.push_str(&separator);
    output.push('\n');
    output.push_str(&format!("Total records: {}", total));

    output
}

/// Format one audit as a report block: header, metadata, disposition
/// contrast, summary, and critiques. `sequence` is the descending audit
/// number within the log.
pub fn format_audit_block(audit: &AuditRecord, sequence: usize) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "AUDIT #{}: AGENT {}\n",
        sequence, audit.agent_code
    ));
    output.push_str(&format!(
        "File: {} | Duration: {} | Date: {}\n",
        audit.file_name,
        audit.duration,
        format_date(&audit.timestamp),
    ));
    output.push_str(&format!(
        "Agent Log: {} | Verdict: {} (confidence {})\n",
        audit.recorded_disposition,
        audit.suggested_disposition.label(),
        format_confidence(audit.confidence),
    ));
    output.push_str(&format!("Summary: {}\n", audit.summary));

    if !audit.failure_points.is_empty() {
        output.push_str("Behavioral Critiques:\n");
        for point in &audit.failure_points {
            output.push_str(&format!("  \u{2022} {}\n", point));
        }
    }

    output
}

/// Format the whole log as the master-log text report.
pub fn format_report(audits: &[AuditRecord]) -> String {
    let separator = "\u{2500}".repeat(72);
    let mut output = String::new();

    output.push_str("CALL AUDIT REPORT: MASTER LOG\n");
    output.push_str(&format!(
        "Generated on: {}\n",
        Local::now().format("%Y-%m-%d %H:%M")
    ));
    output.push_str(&format!("Total Records: {}\n\n", audits.len()));

    let total = audits.len();
    for (i, audit) in audits.iter().enumerate() {
        output.push_str(&format_audit_block(audit, total - i));
        output.push_str(&separator);
        output.push('\n');
    }

    output
}

/// Format the audit log as pretty-printed JSON.
pub fn format_json(audits: &[AuditRecord]) -> String {
    serde_json::to_string_pretty(audits).unwrap_or_else(|_| "[]".to_string())
}

/// Format a single audit as pretty-printed JSON.
pub fn format_json_single(audit: &AuditRecord) -> String {
    serde_json::to_string_pretty(audit).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Disposition, Scorecard, Sentiment};

    fn record(agent: &str, disposition: Disposition) -> AuditRecord {
        AuditRecord {
            id: format!("id-{}", agent),
            timestamp: Utc::now(),
            file_name: format!("call_{}.wav", agent),
            agent_code: agent.to_string(),
            recorded_disposition: "Not Interested".to_string(),
            suggested_disposition: disposition,
            confidence: 0.87,
            summary: "Customer asked for a callback on Tuesday.".to_string(),
            detailed_narrative: "[00:05] Greeting.".to_string(),
            failure_points: vec!["Dead air at 01:12".to_string()],
            customer_sentiment: Sentiment::Positive,
            next_steps: "Schedule follow-up.".to_string(),
            duration: "04:31".to_string(),
            scorecard: Scorecard {
                discovery_phase: "Strong".to_string(),
                objection_handling: "Adequate".to_string(),
                strict_adherence: "Excellent".to_string(),
            },
        }
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.87), "87%");
        assert_eq!(format_confidence(0.0), "0%");
        assert_eq!(format_confidence(1.5), "100%");
        assert_eq!(format_confidence(-0.2), "0%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(61.0), "1:01");
        assert_eq!(format_duration(271.4), "4:31");
    }

    #[test]
    fn test_format_table_contents() {
        let audits = vec![
            record("IN200", Disposition::Sale),
            record("IN100", Disposition::Callback),
        ];
        let table = format_table(&audits);

        assert!(table.contains("IN200"));
        assert!(table.contains("IN100"));
        assert!(table.contains("SALE"));
        assert!(table.contains("CALLBK"));
        assert!(table.contains("87%"));
        assert!(table.contains("Total records: 2"));

        // Newest first, numbered descending
        let in200_pos = table.find("IN200").unwrap();
        let in100_pos = table.find("IN100").unwrap();
        assert!(in200_pos < in100_pos);
    }

    #[test]
    fn test_format_audit_block() {
        let audit = record("IN7", Disposition::NotInterested);
        let block = format_audit_block(&audit, 3);

        assert!(block.contains("AUDIT #3: AGENT IN7"));
        assert!(block.contains("File: call_IN7.wav | Duration: 04:31"));
        assert!(block.contains("Agent Log: Not Interested | Verdict: Not Interested"));
        assert!(block.contains("Summary: Customer asked for a callback"));
        assert!(block.contains("Behavioral Critiques:"));
        assert!(block.contains("\u{2022} Dead air at 01:12"));
    }

    #[test]
    fn test_format_audit_block_no_critiques() {
        let mut audit = record("IN7", Disposition::Sale);
        audit.failure_points.clear();
        let block = format_audit_block(&audit, 1);
        assert!(!block.contains("Behavioral Critiques:"));
    }

    #[test]
    fn test_format_report_mentions_every_record_in_order() {
        let audits = vec![
            record("IN3", Disposition::Sale),
            record("IN2", Disposition::Cnp),
            record("IN1", Disposition::Other),
        ];
        let report = format_report(&audits);

        assert!(report.contains("CALL AUDIT REPORT: MASTER LOG"));
        assert!(report.contains("Total Records: 3"));
        assert!(report.contains("AUDIT #3: AGENT IN3"));
        assert!(report.contains("AUDIT #2: AGENT IN2"));
        assert!(report.contains("AUDIT #1: AGENT IN1"));

        let p3 = report.find("AUDIT #3").unwrap();
        let p2 = report.find("AUDIT #2").unwrap();
        let p1 = report.find("AUDIT #1").unwrap();
        assert!(p3 < p2 && p2 < p1);
    }

    #[test]
    fn test_format_json_roundtrip() {
        let audits = vec![record("IN1", Disposition::Callback)];
        let json = format_json(&audits);
        let parsed: Vec<AuditRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, audits);
    }
}
