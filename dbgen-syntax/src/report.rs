//! Diagnostics rendering
//!
//! Turns positioned errors into human readable text, either as a compact
//! source snippet with a caret underline or as a full `ariadne` report.

use dbgen_core::Position;
use std::ops::Range;

const TAB: &str = "    ";

/// Render the offending line, the line before it, and a caret underline
///
/// Lines are prefixed with their number; tabs are expanded to four spaces
/// and the underline is `max(span_len, 1)` carets long.
pub fn context_snippet(source: &str, position: Position, span_len: usize) -> String {
    let offset = position.offset.min(source.len());
    let (start, end) = line_around(source, offset);
    let line = trim_cr(&source[start..end]);

    let mut out = String::new();
    if start > 0 {
        let (before_start, before_end) = line_around(source, start - 1);
        let before = trim_cr(&source[before_start..before_end]);
        out.push_str(&format!("{:>4}: {}\n", position.line.saturating_sub(1), before.replace('\t', TAB)));
    }
    out.push_str(&format!("{:>4}: {}\n", position.line, line.replace('\t', TAB)));

    let column = position.column.saturating_sub(1);
    let prefix = line.get(..column).unwrap_or(line);
    let indent: usize = prefix.chars().map(|c| if c == '\t' { TAB.len() } else { 1 }).sum();
    out.push_str(&" ".repeat(indent + 6));
    out.push_str(&"^".repeat(span_len.max(1)));
    out
}

/// Byte range of the line containing `offset`, without the newline
fn line_around(source: &str, offset: usize) -> (usize, usize) {
    let start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = source[offset..].find('\n').map_or(source.len(), |i| offset + i);
    (start, end)
}

fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// A secondary location attached to a diagnostic
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub position: Position,
    pub span_len: usize,
    pub message: String,
}

/// One reportable problem
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub position: Option<Position>,
    pub span_len: usize,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, position: Option<Position>, span_len: usize) -> Self {
        Self {
            message: message.into(),
            position,
            span_len,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, position: Position, span_len: usize, message: impl Into<String>) -> Self {
        self.notes.push(Note {
            position,
            span_len,
            message: message.into(),
        });
        self
    }

    fn span(&self, position: Position, len: usize, source: &str) -> Range<usize> {
        let start = position.offset.min(source.len());
        start..(start + len.max(1)).min(source.len()).max(start)
    }

    /// `message` followed by a context snippet for every location
    pub fn render_plain(&self, source: &str) -> String {
        let mut out = self.message.clone();
        if let Some(position) = self.position {
            out.push('\n');
            out.push_str(&context_snippet(source, position, self.span_len));
        }
        for note in &self.notes {
            out.push_str(&format!("\nnote: {} at {}\n", note.message, note.position));
            out.push_str(&context_snippet(source, note.position, note.span_len));
        }
        out
    }

    /// Full `ariadne` report, without colors
    pub fn render_report(&self, name: &str, source: &str) -> String {
        use ariadne::{Config, Label, Report, ReportKind, Source};

        let Some(position) = self.position else {
            return format!("error: {}", self.message);
        };

        let span = self.span(position, self.span_len, source);
        let mut report = Report::build(ReportKind::Error, (name, span.clone()))
            .with_config(Config::default().with_color(false))
            .with_message(&self.message)
            .with_label(Label::new((name, span)).with_message("here"));
        for note in &self.notes {
            let span = self.span(note.position, note.span_len, source);
            report = report.with_label(Label::new((name, span)).with_message(&note.message));
        }

        let mut buffer = Vec::new();
        match report.finish().write((name, Source::from(source)), &mut buffer) {
            Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(_) => self.render_plain(source),
        }
    }
}
