use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocumentReference, PdfLayerReference,
    PdfDocument, Point, Rgb,
};

use crate::format::format_confidence;
use crate::format::format_date;
use crate::models::AuditRecord;

/// Message shown when there is nothing to export.
pub const NO_RECORDS: &str = "No audit records found to export.";

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const MARGIN: f64 = 15.0;
// Start a fresh page for a record past this cursor position, and hard-break
// any line past the bottom margin so nothing is ever clipped.
const RECORD_BREAK: f64 = 250.0;
const LINE_BREAK: f64 = 282.0;

/// Greedy word wrap by character count. Long unbreakable words get a line of
/// their own rather than being split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

struct PdfCursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f64,
}

impl PdfCursor<'_> {
    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH as f32), Mm(PAGE_HEIGHT as f32), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = 20.0;
    }

    fn break_line_if_needed(&mut self) {
        if self.y > LINE_BREAK {
            self.new_page();
        }
    }

    fn text(&mut self, text: &str, size: f32, x: f64, font: &IndirectFontRef, rgb: (u8, u8, u8)) {
        self.break_line_if_needed();
        self.layer.set_fill_color(color(rgb));
        self.layer
            .use_text(text, size, Mm(x as f32), Mm((PAGE_HEIGHT - self.y) as f32), font);
    }

    fn rule(&mut self) {
        self.break_line_if_needed();
        self.layer.set_outline_color(color((226, 232, 240)));
        self.layer.set_outline_thickness(0.4);
        let y = PAGE_HEIGHT - self.y;
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN as f32), Mm(y as f32)), false),
                (Point::new(Mm((PAGE_WIDTH - MARGIN) as f32), Mm(y as f32)), false),
            ],
            is_closed: false,
        });
    }
}

fn color((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        None,
    ))
}

/// Render the audit log to a paginated PDF: every record appears exactly
/// once, in sequence order, numbered descending like the dashboard.
pub fn export_pdf(audits: &[AuditRecord], path: &Path) -> Result<()> {
    if audits.is_empty() {
        anyhow::bail!(NO_RECORDS);
    }

    let (doc, page, layer) = PdfDocument::new(
        "Call Audit Report",
        Mm(PAGE_WIDTH as f32),
        Mm(PAGE_HEIGHT as f32),
        "Layer 1",
    );
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let italic = doc.add_builtin_font(BuiltinFont::HelveticaOblique)?;

    let mut cursor = PdfCursor {
        doc: &doc,
        layer: doc.get_page(page).get_layer(layer),
        y: 20.0,
    };

    cursor.text(
        "CALL AUDIT REPORT: MASTER LOG",
        18.0,
        MARGIN,
        &bold,
        (15, 23, 42),
    );
    cursor.y += 10.0;
    cursor.text(
        &format!("Generated on: {}", Local::now().format("%Y-%m-%d %H:%M")),
        10.0,
        MARGIN,
        &regular,
        (100, 116, 139),
    );
    cursor.y += 5.0;
    cursor.text(
        &format!("Total Records: {}", audits.len()),
        10.0,
        MARGIN,
        &regular,
        (100, 116, 139),
    );
    cursor.y += 15.0;

    let total = audits.len();
    for (index, audit) in audits.iter().enumerate() {
        if cursor.y > RECORD_BREAK {
            cursor.new_page();
        }

        cursor.text(
            &format!("AUDIT #{}: AGENT {}", total - index, audit.agent_code),
            12.0,
            MARGIN,
            &bold,
            (79, 70, 229),
        );
        cursor.y += 7.0;

        cursor.text(
            &format!(
                "File: {} | Duration: {} | Date: {}",
                audit.file_name,
                audit.duration,
                format_date(&audit.timestamp)
            ),
            9.0,
            MARGIN,
            &regular,
            (51, 65, 85),
        );
        cursor.y += 5.0;

        cursor.text(
            &format!(
                "Agent Log: {} | Verdict: {} (confidence {})",
                audit.recorded_disposition,
                audit.suggested_disposition.label(),
                format_confidence(audit.confidence)
            ),
            9.0,
            MARGIN,
            &bold,
            (51, 65, 85),
        );
        cursor.y += 8.0;

        for line in wrap_text(&format!("Summary: {}", audit.summary), 100) {
            cursor.text(&line, 9.0, MARGIN, &italic, (51, 65, 85));
            cursor.y += 5.0;
        }

        if !audit.failure_points.is_empty() {
            cursor.y += 2.0;
            cursor.text(
                "Behavioral Critiques:",
                9.0,
                MARGIN,
                &bold,
                (225, 29, 72),
            );
            cursor.y += 5.0;
            for point in &audit.failure_points {
                for line in wrap_text(&format!("\u{2022} {}", point), 95) {
                    cursor.text(&line, 9.0, MARGIN + 5.0, &regular, (51, 65, 85));
                    cursor.y += 5.0;
                }
            }
        }

        cursor.y += 10.0;
        cursor.rule();
        cursor.y += 15.0;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    doc.save(&mut BufWriter::new(file))
        .context("Failed to write PDF report")?;

    Ok(())
}
