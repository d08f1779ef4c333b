use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use chrono::Utc;
use voxaudit::models::{AuditRecord, Disposition, Scorecard, Sentiment};
use voxaudit::store::AuditStore;

/// Generate a WAV file with a pure sine wave, so the pre-upload probe sees a
/// real audio container. Returns the path to the WAV file.
fn generate_sine_wav(dir: &std::path::Path, filename: &str) -> PathBuf {
    let sample_rate: u32 = 8000;
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let num_samples = sample_rate as usize; // one second
    let byte_rate = sample_rate * num_channels as u32 * bits_per_sample as u32 / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_size = (num_samples * num_channels as usize * (bits_per_sample as usize / 8)) as u32;

    let path = dir.join(filename);
    let mut file = std::fs::File::create(&path).unwrap();

    // RIFF header
    file.write_all(b"RIFF").unwrap();
    file.write_all(&(36 + data_size).to_le_bytes()).unwrap();
    file.write_all(b"WAVE").unwrap();

    // fmt chunk
    file.write_all(b"fmt ").unwrap();
    file.write_all(&16u32.to_le_bytes()).unwrap(); // chunk size
    file.write_all(&1u16.to_le_bytes()).unwrap(); // PCM
    file.write_all(&num_channels.to_le_bytes()).unwrap();
    file.write_all(&sample_rate.to_le_bytes()).unwrap();
    file.write_all(&byte_rate.to_le_bytes()).unwrap();
    file.write_all(&block_align.to_le_bytes()).unwrap();
    file.write_all(&bits_per_sample.to_le_bytes()).unwrap();

    // data chunk
    file.write_all(b"data").unwrap();
    file.write_all(&data_size.to_le_bytes()).unwrap();

    for i in 0..num_samples {
        let t = i as f64 / sample_rate as f64;
        let sample = 0.5 * (2.0 * std::f64::consts::PI * 440.0 * t).sin();
        let sample_i16 = (sample * i16::MAX as f64) as i16;
        file.write_all(&sample_i16.to_le_bytes()).unwrap();
    }

    path
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Serve a canned HTTP response for every request on a fresh local port, so
/// provider flows can run end-to-end without the network. Returns the base
/// URL for `VOXAUDIT_API_BASE`.
fn spawn_provider(status: u16, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = Vec::new();
            let mut tmp = [0u8; 4096];

            // Read headers, then the declared body length.
            let (header_end, content_length) = loop {
                let n = stream.read(&mut tmp).unwrap_or(0);
                if n == 0 {
                    break (buf.len(), 0);
                }
                buf.extend_from_slice(&tmp[..n]);
                if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..pos]).to_string();
                    let len = headers
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    break (pos + 4, len);
                }
            };
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut tmp).unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&tmp[..n]);
            }

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    format!("http://{}", addr)
}

/// A provider success envelope wrapping the given audit payload.
fn provider_success(audit_json: serde_json::Value) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [{ "text": audit_json.to_string() }]
            }
        }]
    })
    .to_string()
}

fn sale_payload() -> serde_json::Value {
    serde_json::json!({
        "recordedDisposition": "NI",
        "suggestedDisposition": "SALE",
        "confidence": 0.91,
        "summary": "Definitive close after a single objection.",
        "detailedNarrative": "[00:04] Greeting. [00:40] Pitch.",
        "failurePoints": ["Spoke over the customer at 01:02"],
        "customerSentiment": "Positive",
        "nextSteps": "Send the contract.",
        "duration": "03:58",
        "scorecard": {
            "discoveryPhase": "Strong",
            "objectionHandling": "Strong",
            "strictAdherence": "Good"
        }
    })
}

fn stored_record(agent: &str, file_name: &str) -> AuditRecord {
    AuditRecord {
        id: format!("id-{}", agent),
        timestamp: Utc::now(),
        file_name: file_name.to_string(),
        agent_code: agent.to_string(),
        recorded_disposition: "CALLBACK".to_string(),
        suggested_disposition: Disposition::Callback,
        confidence: 0.7,
        summary: "Customer asked to be called back.".to_string(),
        detailed_narrative: "[00:10] Interest shown.".to_string(),
        failure_points: vec![],
        customer_sentiment: Sentiment::Neutral,
        next_steps: "Call Tuesday.".to_string(),
        duration: "02:20".to_string(),
        scorecard: Scorecard {
            discovery_phase: "Adequate".to_string(),
            objection_handling: "Adequate".to_string(),
            strict_adherence: "Good".to_string(),
        },
    }
}

// --- CLI validation ---

#[test]
fn test_purge_conflicts_with_other_actions() {
    cargo_bin_cmd!("voxaudit")
        .args(["call.wav", "--purge"])
        .assert()
        .failure()
        .stderr(predicates::str::contains(
            "--purge cannot be combined with other actions",
        ));
}

#[test]
fn test_export_conflicts_with_tui() {
    cargo_bin_cmd!("voxaudit")
        .args(["--export", "out.pdf", "--tui"])
        .assert()
        .failure()
        .stderr(predicates::str::contains(
            "--export and --tui cannot be used together",
        ));
}

#[test]
fn test_unknown_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("voxaudit")
        .args(["does-not-exist.wav"])
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("is not a file or directory"));
}

// --- Listing ---

#[test]
fn test_listing_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("voxaudit")
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicates::str::contains("No audit records."));
}

#[test]
fn test_listing_table() {
    let dir = tempfile::tempdir().unwrap();
    let store = AuditStore::new(dir.path());
    store
        .save(&[
            stored_record("IN200", "call_IN200.wav"),
            stored_record("IN100", "call_IN100.wav"),
        ])
        .unwrap();

    cargo_bin_cmd!("voxaudit")
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicates::str::contains("IN200"))
        .stdout(predicates::str::contains("IN100"))
        .stdout(predicates::str::contains("Total records: 2"));
}

#[test]
fn test_loads_original_storage_blob() {
    // A record exactly as the original web client persisted it.
    let blob = r#"[{
        "id": "5f0e8ed2-54a1-4f0c-9f5e-0a0f6d9f3b11",
        "timestamp": "2025-11-03T17:24:08.000Z",
        "fileName": "call_IN4521.mp3",
        "agentCode": "IN4521",
        "recordedDisposition": "Not Interested",
        "suggestedDisposition": "CALLBACK",
        "confidence": 0.84,
        "summary": "Customer requested a follow-up next week.",
        "detailedNarrative": "[00:06] Greeting delivered flat.",
        "failurePoints": ["No discovery questions before pitching."],
        "customerSentiment": "Neutral",
        "nextSteps": "Schedule the follow-up call.",
        "duration": "04:12",
        "scorecard": {
            "discoveryPhase": "Weak",
            "objectionHandling": "Adequate",
            "strictAdherence": "Good"
        }
    }]"#;

    let dir = tempfile::tempdir().unwrap();
    let store = AuditStore::new(dir.path());
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.path(), blob).unwrap();

    let audits = store.load();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].agent_code, "IN4521");
    assert_eq!(audits[0].suggested_disposition, Disposition::Callback);
    assert_eq!(audits[0].customer_sentiment, Sentiment::Neutral);
}

// --- Export ---

#[test]
fn test_export_empty_store_short_circuits() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.pdf");
    cargo_bin_cmd!("voxaudit")
        .args(["--export", out.to_str().unwrap()])
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No audit records found to export."));
    assert!(!out.exists());
}

#[test]
fn test_export_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let store = AuditStore::new(dir.path());
    store
        .save(&[
            stored_record("IN2", "call_IN2.wav"),
            stored_record("IN1", "call_IN1.wav"),
        ])
        .unwrap();

    let out = dir.path().join("report.pdf");
    cargo_bin_cmd!("voxaudit")
        .args(["--export", out.to_str().unwrap()])
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicates::str::contains("Exported 2 records"));

    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn test_export_txt_lists_every_record_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = AuditStore::new(dir.path());
    store
        .save(&[
            stored_record("IN3", "c3.wav"),
            stored_record("IN2", "c2.wav"),
            stored_record("IN1", "c1.wav"),
        ])
        .unwrap();

    let out = dir.path().join("report.txt");
    cargo_bin_cmd!("voxaudit")
        .args(["--export", out.to_str().unwrap()])
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .success();

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("CALL AUDIT REPORT: MASTER LOG"));
    let p3 = text.find("AUDIT #3: AGENT IN3").unwrap();
    let p2 = text.find("AUDIT #2: AGENT IN2").unwrap();
    let p1 = text.find("AUDIT #1: AGENT IN1").unwrap();
    assert!(p3 < p2 && p2 < p1);
}

#[test]
fn test_export_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let store = AuditStore::new(dir.path());
    store.save(&[stored_record("IN1", "c1.wav")]).unwrap();

    cargo_bin_cmd!("voxaudit")
        .args(["--export", dir.path().join("report.docx").to_str().unwrap()])
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Unsupported export format"));
}

// --- Purge ---

#[test]
fn test_purge_yes_erases_store() {
    let dir = tempfile::tempdir().unwrap();
    let ns = dir.path().join("ns");
    let store = AuditStore::new(&ns);
    store.save(&[stored_record("IN1", "c1.wav")]).unwrap();
    assert!(store.path().exists());

    cargo_bin_cmd!("voxaudit")
        .args(["--purge", "--yes"])
        .args(["--data-dir", ns.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicates::str::contains("Purge complete."));

    assert!(!store.path().exists());
    assert!(store.load().is_empty());

    // Purging again over the empty store is still a success.
    cargo_bin_cmd!("voxaudit")
        .args(["--purge", "--yes"])
        .args(["--data-dir", ns.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_purge_prompt_abort_keeps_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = AuditStore::new(dir.path());
    store.save(&[stored_record("IN1", "c1.wav")]).unwrap();

    cargo_bin_cmd!("voxaudit")
        .arg("--purge")
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .write_stdin("n\n")
        .assert()
        .success()
        .stderr(predicates::str::contains("Aborted."));

    assert_eq!(store.load().len(), 1);
}

// --- Analysis error paths (offline) ---

#[test]
fn test_missing_key_fails_fast_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let wav = generate_sine_wav(dir.path(), "call_IN9.wav");

    cargo_bin_cmd!("voxaudit")
        .arg(wav.to_str().unwrap())
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .env_remove("GEMINI_API_KEY")
        // Unroutable on purpose: the key check must fire before any request.
        .env("VOXAUDIT_API_BASE", "http://127.0.0.1:1")
        .assert()
        .failure()
        .stderr(predicates::str::contains("API key"));

    assert!(AuditStore::new(dir.path()).load().is_empty());
}

#[test]
fn test_unreadable_audio_is_a_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    let fake = dir.path().join("call_IN5.mp3");
    std::fs::write(&fake, "this is not audio").unwrap();

    cargo_bin_cmd!("voxaudit")
        .arg(fake.to_str().unwrap())
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .env("GEMINI_API_KEY", "test-key")
        .env("VOXAUDIT_API_BASE", "http://127.0.0.1:1")
        .assert()
        .failure()
        .stderr(predicates::str::contains("Audio decoding failed"));
}

// --- Full pipeline against a canned provider ---

#[test]
fn test_scenario_sale_audit_is_prepended_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let wav = generate_sine_wav(dir.path(), "call_IN100.wav");
    let base = spawn_provider(200, provider_success(sale_payload()));

    let store = AuditStore::new(dir.path());
    store.save(&[stored_record("IN900", "old.wav")]).unwrap();

    cargo_bin_cmd!("voxaudit")
        .arg(wav.to_str().unwrap())
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .arg("--json")
        .env("GEMINI_API_KEY", "test-key")
        .env("VOXAUDIT_API_BASE", &base)
        .assert()
        .success()
        .stdout(predicates::str::contains("\"agentCode\": \"IN100\""))
        .stdout(predicates::str::contains("\"suggestedDisposition\": \"SALE\""));

    let audits = store.load();
    assert_eq!(audits.len(), 2, "exactly one new record must be prepended");
    assert_eq!(audits[0].agent_code, "IN100");
    assert_eq!(audits[0].file_name, "call_IN100.wav");
    assert_eq!(audits[0].suggested_disposition, Disposition::Sale);
    assert_eq!(audits[0].customer_sentiment, Sentiment::Positive);
    assert_eq!(audits[1].agent_code, "IN900");
}

#[test]
fn test_scenario_quota_failure_leaves_log_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let wav = generate_sine_wav(dir.path(), "call_IN7.wav");
    let base = spawn_provider(
        429,
        r#"{"error":{"message":"Resource has been exhausted (e.g. check quota)."}}"#.to_string(),
    );

    let store = AuditStore::new(dir.path());
    store.save(&[stored_record("IN900", "old.wav")]).unwrap();

    cargo_bin_cmd!("voxaudit")
        .arg(wav.to_str().unwrap())
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .env("GEMINI_API_KEY", "test-key")
        .env("VOXAUDIT_API_BASE", &base)
        .assert()
        .failure()
        .stderr(predicates::str::contains("Quota Exceeded"));

    let audits = store.load();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].agent_code, "IN900");
}

#[test]
fn test_scenario_out_of_set_disposition_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let wav = generate_sine_wav(dir.path(), "call_IN8.wav");

    let mut payload = sale_payload();
    payload["suggestedDisposition"] = serde_json::json!("LEAD");
    let base = spawn_provider(200, provider_success(payload));

    cargo_bin_cmd!("voxaudit")
        .arg(wav.to_str().unwrap())
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .env("GEMINI_API_KEY", "test-key")
        .env("VOXAUDIT_API_BASE", &base)
        .assert()
        .failure()
        .stderr(predicates::str::contains("Malformed provider response"));

    assert!(AuditStore::new(dir.path()).load().is_empty());
}

#[test]
fn test_directory_mode_skips_audited_recordings() {
    let dir = tempfile::tempdir().unwrap();
    let calls = dir.path().join("calls");
    std::fs::create_dir(&calls).unwrap();
    generate_sine_wav(&calls, "call_IN1.wav");
    generate_sine_wav(&calls, "call_IN2.wav");

    let ns = dir.path().join("ns");
    let store = AuditStore::new(&ns);
    store.save(&[stored_record("IN1", "call_IN1.wav")]).unwrap();

    let base = spawn_provider(200, provider_success(sale_payload()));

    cargo_bin_cmd!("voxaudit")
        .arg(calls.to_str().unwrap())
        .args(["--data-dir", ns.to_str().unwrap()])
        .env("GEMINI_API_KEY", "test-key")
        .env("VOXAUDIT_API_BASE", &base)
        .assert()
        .success()
        .stderr(predicates::str::contains(
            "Skipping (already audited): call_IN1.wav",
        ))
        .stderr(predicates::str::contains(
            "Done: 1 audited, 1 skipped, 0 failed (out of 2 total)",
        ));

    let audits = store.load();
    assert_eq!(audits.len(), 2);
    assert_eq!(audits[0].file_name, "call_IN2.wav");
}
