use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use super::app::{App, Focus, RecordingStatus, View};
use crate::format::{format_confidence, format_date, format_duration};
use crate::models::{AuditRecord, Disposition, Sentiment};

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const OK_COLOR: Color = Color::Green;
const ERROR_COLOR: Color = Color::Red;
const PROGRESS_COLOR: Color = Color::Yellow;

pub fn render(frame: &mut Frame, app: &mut App) {
    let banner_height = if app.log.error().is_some() || app.status.is_some() {
        3
    } else {
        0
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Min(8),               // Tables
            Constraint::Length(banner_height), // Error / status banner
            Constraint::Length(1),            // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
        .split(chunks[1]);
    render_recordings(frame, app, panes[0]);
    render_audits(frame, app, panes[1]);

    if banner_height > 0 {
        render_banner(frame, app, chunks[2]);
    }
    render_footer(frame, app, chunks[3]);

    // Overlays
    match app.view {
        View::Main => {}
        View::Detail => render_detail_overlay(frame, app),
        View::Export => render_export_overlay(frame, app),
        View::PurgeConfirm => render_purge_overlay(frame),
        View::KeyEntry => render_key_overlay(frame, app),
        View::About => render_about_overlay(frame),
        View::Notice => render_notice_overlay(frame, app),
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled("Dir: ", Style::default().fg(DIM)),
        Span::styled(
            app.dir.display().to_string(),
            Style::default().fg(Color::White),
        ),
        Span::raw("  "),
        Span::styled("Model: ", Style::default().fg(DIM)),
        Span::styled(app.client.model().to_string(), Style::default().fg(DIM)),
        Span::raw("  "),
        Span::styled(
            format!("{} records", app.log.len()),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
    ];
    if app.log.in_progress() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            "AUDITING\u{2026}",
            Style::default().fg(PROGRESS_COLOR).add_modifier(Modifier::BOLD),
        ));
    }

    let block = Block::default()
        .title(Span::styled(
            " VoxAudit ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(Paragraph::new(vec![Line::from(spans)]).block(block), area);
}

fn pane_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(ACCENT)
    } else {
        Style::default().fg(DIM)
    }
}

fn render_recordings(frame: &mut Frame, app: &mut App, area: Rect) {
    // 2 for borders, 1 for header
    let inner_height = area.height.saturating_sub(3) as usize;
    app.recordings_rows = inner_height;

    let header = Row::new(vec![
        Cell::from("#").style(Style::default().fg(DIM)),
        Cell::from("Recording").style(Style::default().fg(DIM)),
        Cell::from("Length").style(Style::default().fg(DIM)),
        Cell::from("Status").style(Style::default().fg(DIM)),
    ])
    .height(1);

    let end = (app.recordings_scroll + inner_height).min(app.recordings.len());
    let visible = &app.recordings[app.recordings_scroll..end];

    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(vi, recording)| {
            let actual_index = app.recordings_scroll + vi;
            let style = if actual_index == app.selected_recording
                && app.focus == Focus::Recordings
            {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let duration = recording
                .duration_secs
                .map(format_duration)
                .unwrap_or_else(|| "--".to_string());

            let status_cell = match &recording.status {
                RecordingStatus::Idle => Cell::from("\u{00b7}").style(Style::default().fg(DIM)),
                RecordingStatus::Analyzing => Cell::from("\u{27f3} auditing")
                    .style(Style::default().fg(PROGRESS_COLOR)),
                RecordingStatus::Audited => {
                    Cell::from("\u{2713} audited").style(Style::default().fg(OK_COLOR))
                }
                RecordingStatus::Error(_) => {
                    Cell::from("\u{2717} failed").style(Style::default().fg(ERROR_COLOR))
                }
            };

            Row::new(vec![
                Cell::from(format!("{}", actual_index + 1)),
                Cell::from(recording.name.as_str()),
                Cell::from(duration),
                status_cell,
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(16),
        Constraint::Length(7),
        Constraint::Length(11),
    ];

    let block = Block::default()
        .title(" Analysis Intake ")
        .borders(Borders::ALL)
        .border_style(pane_border(app.focus == Focus::Recordings));

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_audits(frame: &mut Frame, app: &mut App, area: Rect) {
    let inner_height = area.height.saturating_sub(3) as usize;
    app.audits_rows = inner_height;

    let header = Row::new(vec![
        Cell::from("#").style(Style::default().fg(DIM)),
        Cell::from("Agent").style(Style::default().fg(DIM)),
        Cell::from("Verdict").style(Style::default().fg(DIM)),
        Cell::from("Sent.").style(Style::default().fg(DIM)),
        Cell::from("Conf").style(Style::default().fg(DIM)),
        Cell::from("Date").style(Style::default().fg(DIM)),
    ])
    .height(1);

    let audits = app.log.audits();
    let total = audits.len();
    let end = (app.audits_scroll + inner_height).min(total);
    let visible = &audits[app.audits_scroll..end];

    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(vi, audit)| {
            let actual_index = app.audits_scroll + vi;
            let style = if actual_index == app.selected_audit && app.focus == Focus::Audits {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(format!("{}", total - actual_index)),
                Cell::from(audit.agent_code.as_str()),
                Cell::from(audit.suggested_disposition.code())
                    .style(Style::default().fg(disposition_color(audit.suggested_disposition))),
                Cell::from(audit.customer_sentiment.label())
                    .style(Style::default().fg(sentiment_color(audit.customer_sentiment))),
                Cell::from(format_confidence(audit.confidence)),
                Cell::from(format_date(&audit.timestamp)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(10),
        Constraint::Length(7),
        Constraint::Length(9),
        Constraint::Length(5),
        Constraint::Min(16),
    ];

    let title = if total == 0 {
        " Audit Log (awaiting audio ingestion) ".to_string()
    } else {
        format!(" Audit Log ({} records) ", total)
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(pane_border(app.focus == Focus::Audits));

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_banner(frame: &mut Frame, app: &App, area: Rect) {
    let (text, color) = if let Some(error) = app.log.error() {
        let mut text = error.to_string();
        if app.key_setup_available() {
            text.push_str("  (press [i] to initialize a secure key)");
        }
        (text, ERROR_COLOR)
    } else {
        (app.status.clone().unwrap_or_default(), DIM)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .block(block),
        area,
    );
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keys = match app.view {
        View::Main => {
            if app.key_setup_available() {
                "[Enter] audit/open  [Tab] pane  [e]xport  [p]urge  [i]nit key  [a]bout  [q]uit"
            } else {
                "[Enter] audit/open  [Tab] pane  [e]xport  [p]urge  [a]bout  [q]uit"
            }
        }
        View::Export => "[Tab] cycle format  [Enter] save  [Esc] cancel",
        View::PurgeConfirm => "[Enter] execute  [Esc] abort",
        View::KeyEntry => "[Enter] save key  [Esc] cancel",
        View::Notice => "press any key",
        View::Detail | View::About => "[Esc] close",
    };
    frame.render_widget(
        Paragraph::new(keys)
            .style(Style::default().fg(DIM))
            .alignment(Alignment::Center),
        area,
    );
}

fn render_detail_overlay(frame: &mut Frame, app: &App) {
    let Some(audit) = app.log.audits().get(app.selected_audit) else {
        return;
    };

    let area = centered_rect(96, 30, frame.area());
    frame.render_widget(Clear, area);

    let text = detail_lines(audit);
    let block = Block::default()
        .title(format!(" Audit: {} ", audit.file_name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: true }).block(block),
        area,
    );
}

fn detail_lines(audit: &AuditRecord) -> Vec<Line<'_>> {
    let label = Style::default().fg(DIM);
    let mut text = vec![
        Line::from(vec![
            Span::styled(
                format!("AGENT {}", audit.agent_code),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(format_date(&audit.timestamp), label),
            Span::raw("  "),
            Span::styled("Duration: ", label),
            Span::raw(audit.duration.as_str()),
        ]),
        Line::from(vec![
            Span::styled("Agent Log: ", label),
            Span::raw(audit.recorded_disposition.as_str()),
            Span::raw("   "),
            Span::styled("Verdict: ", label),
            Span::styled(
                audit.suggested_disposition.label(),
                Style::default()
                    .fg(disposition_color(audit.suggested_disposition))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled("Sentiment: ", label),
            Span::styled(
                audit.customer_sentiment.label(),
                Style::default().fg(sentiment_color(audit.customer_sentiment)),
            ),
        ]),
        Line::from(vec![
            Span::styled("Confidence: ", label),
            Span::styled(
                confidence_bar(audit.confidence, 20),
                Style::default().fg(ACCENT),
            ),
            Span::raw(format!(" {}", format_confidence(audit.confidence))),
        ]),
        Line::from(""),
        Line::from(Span::styled("Summary", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(audit.summary.as_str()),
        Line::from(""),
        Line::from(Span::styled("Scorecard", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  Discovery Phase:    ", label),
            Span::raw(audit.scorecard.discovery_phase.as_str()),
        ]),
        Line::from(vec![
            Span::styled("  Objection Handling: ", label),
            Span::raw(audit.scorecard.objection_handling.as_str()),
        ]),
        Line::from(vec![
            Span::styled("  Strict Adherence:   ", label),
            Span::raw(audit.scorecard.strict_adherence.as_str()),
        ]),
        Line::from(""),
    ];

    if !audit.failure_points.is_empty() {
        text.push(Line::from(Span::styled(
            "Behavioral Critiques",
            Style::default().fg(ERROR_COLOR).add_modifier(Modifier::BOLD),
        )));
        for point in &audit.failure_points {
            text.push(Line::from(format!("  \u{2022} {}", point)));
        }
        text.push(Line::from(""));
    }

    text.push(Line::from(Span::styled(
        "Narrative",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    text.push(Line::from(audit.detailed_narrative.as_str()));
    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "Next Steps",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    text.push(Line::from(audit.next_steps.as_str()));

    text
}

fn render_export_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(56, 12, frame.area());
    frame.render_widget(Clear, area);

    let output_path = app
        .dir
        .join(format!("call_audit_report.{}", app.export_format.extension()));

    let mut text = vec![
        Line::from(Span::styled(
            "Export Master Log",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Format: ", Style::default().fg(DIM)),
            Span::styled(app.export_format.label(), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Output: ", Style::default().fg(DIM)),
            Span::styled(
                output_path.display().to_string(),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "[Tab] cycle format  [Enter] save  [Esc] cancel",
            Style::default().fg(DIM),
        )),
    ];

    if let Some(ref msg) = app.export_message {
        let color = if msg.starts_with("Error") {
            ERROR_COLOR
        } else {
            OK_COLOR
        };
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            msg.as_str(),
            Style::default().fg(color),
        )));
    }

    let block = Block::default()
        .title(" Export ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        area,
    );
}

fn render_purge_overlay(frame: &mut Frame) {
    let area = centered_rect(48, 10, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "PURGE PROTOCOL",
            Style::default().fg(ERROR_COLOR).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Eradicate all vaulted audit intelligence?"),
        Line::from("This erases every stored record."),
        Line::from(""),
        Line::from(Span::styled(
            "[Enter] Execute   [Esc] Abort",
            Style::default().fg(DIM),
        )),
    ];

    let block = Block::default()
        .title(" Purge ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ERROR_COLOR));

    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        area,
    );
}

fn render_key_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 9, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "Initialize Secure Key",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Key: ", Style::default().fg(DIM)),
            Span::styled(
                format!("{}\u{2588}", app.key_input),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Applies to this session; set GEMINI_API_KEY to persist.",
            Style::default().fg(DIM),
        )),
    ];

    let block = Block::default()
        .title(" Credentials ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        area,
    );
}

fn render_about_overlay(frame: &mut Frame) {
    let area = centered_rect(52, 11, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "VoxAudit",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Version {}", env!("CARGO_PKG_VERSION"))),
        Line::from(""),
        Line::from("AI behavioral call audits for call-center"),
        Line::from("recordings. Agent codes (e.g. IN123) are read"),
        Line::from("from filenames."),
        Line::from(""),
        Line::from(Span::styled("[Esc] close", Style::default().fg(DIM))),
    ];

    let block = Block::default()
        .title(" About ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        area,
    );
}

fn render_notice_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 8, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "Purge Failure",
            Style::default().fg(ERROR_COLOR).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(app.notice.as_str()),
        Line::from(""),
        Line::from(Span::styled("press any key", Style::default().fg(DIM))),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ERROR_COLOR));

    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        area,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

fn confidence_bar(confidence: f64, width: usize) -> String {
    let clamped = confidence.clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    format!(
        "{}{}",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(width.saturating_sub(filled))
    )
}

fn disposition_color(disposition: Disposition) -> Color {
    match disposition {
        Disposition::Sale => Color::Green,
        Disposition::Callback => Color::Cyan,
        Disposition::CallCut => Color::Yellow,
        Disposition::Cnp => Color::DarkGray,
        Disposition::NotInterested | Disposition::DoNotCall => Color::Red,
        Disposition::DoNotQualify => Color::Magenta,
        Disposition::TroubleShooter => Color::Blue,
        Disposition::LanguageBarrier => Color::Magenta,
        Disposition::Other => Color::Gray,
    }
}

fn sentiment_color(sentiment: Sentiment) -> Color {
    match sentiment {
        Sentiment::Positive => Color::Green,
        Sentiment::Neutral => Color::Yellow,
        Sentiment::Negative => Color::Red,
    }
}
