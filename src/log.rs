//! Marked-up log documents: segment parsing, display lines, and filtered export.
//!
//! The backend wraps every classified log line in `<span class="log-error">`,
//! `log-warning` or `log-critical`. Spans are top-level and never nested; any
//! text outside a span is untagged and only matters for display.

use crate::app::safe_file_name;
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<span\b([^>]*)>(.*?)</span\s*>").expect("span pattern is valid")
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("class pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Picks the severity out of a `class` attribute value (`"log-error"`, `"x log-warning"`).
    pub fn from_class_attr(attr: &str) -> Option<Self> {
        attr.split_whitespace().find_map(|class| match class {
            "log-error" => Some(Severity::Error),
            "log-warning" => Some(Severity::Warning),
            "log-critical" => Some(Severity::Critical),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Tagged { severity: Severity, text: String },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain(text) | Segment::Tagged { text, .. } => text,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        match self {
            Segment::Plain(_) => None,
            Segment::Tagged { severity, .. } => Some(*severity),
        }
    }
}

/// One display line of the log viewer, coloured by the most severe span it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub text: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDocument {
    pub bulletin_id: String,
    pub name: String,
    pub full_log: String,
    segments: Vec<Segment>,
}

impl LogDocument {
    pub fn new(bulletin_id: String, name: String, full_log: String) -> Self {
        let segments = parse_segments(&full_log);
        Self {
            bulletin_id,
            name,
            full_log,
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn lines(&self) -> Vec<LogLine> {
        let mut lines = Vec::new();
        let mut current = LogLine {
            text: String::new(),
            severity: None,
        };
        for segment in &self.segments {
            let severity = segment.severity();
            for (i, part) in segment.text().split('\n').enumerate() {
                if i > 0 {
                    lines.push(std::mem::replace(
                        &mut current,
                        LogLine {
                            text: String::new(),
                            severity: None,
                        },
                    ));
                }
                current.text.push_str(part);
                if !part.is_empty() {
                    current.severity = current.severity.max(severity);
                }
            }
        }
        if !current.text.is_empty() {
            lines.push(current);
        }
        lines
    }
}

/// Splits marked-up log text into top-level plain and tagged segments, in order.
pub fn parse_segments(markup: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in SPAN_RE.captures_iter(markup) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            segments.push(Segment::Plain(decode_entities(&markup[last..whole.start()])));
        }
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let text = decode_entities(caps.get(2).map_or("", |m| m.as_str()));
        let severity = CLASS_RE
            .captures(attrs)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .and_then(|m| Severity::from_class_attr(m.as_str()));
        segments.push(match severity {
            Some(severity) => Segment::Tagged { severity, text },
            None => Segment::Plain(text),
        });
        last = whole.end();
    }
    if last < markup.len() {
        segments.push(Segment::Plain(decode_entities(&markup[last..])));
    }
    segments
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Severity class requested by one of the viewer's export keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFilter {
    Errors,
    Warnings,
    Critical,
}

impl LogFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            LogFilter::Errors => "errors",
            LogFilter::Warnings => "warnings",
            LogFilter::Critical => "critical",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            LogFilter::Errors => Severity::Error,
            LogFilter::Warnings => Severity::Warning,
            LogFilter::Critical => Severity::Critical,
        }
    }
}

impl std::fmt::Display for LogFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Log is not loaded yet")]
    NotReady,
    #[error("No {0} found in this log")]
    EmptyResult(LogFilter),
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogExport {
    pub file_name: String,
    pub contents: String,
}

pub fn filter_segments(doc: &LogDocument, filter: LogFilter) -> Vec<&str> {
    let wanted = filter.severity();
    doc.segments
        .iter()
        .filter(|s| s.severity() == Some(wanted))
        .map(Segment::text)
        .collect()
}

/// Builds the export file for `filter`. `None` means the viewer is still loading.
pub fn export(
    doc: Option<&LogDocument>,
    filter: LogFilter,
    date: NaiveDate,
) -> Result<LogExport, ExportError> {
    let doc = doc.ok_or(ExportError::NotReady)?;
    let matched = filter_segments(doc, filter);
    if matched.is_empty() {
        return Err(ExportError::EmptyResult(filter));
    }
    Ok(LogExport {
        file_name: format!(
            "{}_{}_log_{}.log",
            safe_file_name(&doc.name),
            filter.as_str(),
            date.format("%Y-%m-%d")
        ),
        contents: matched.join("\n"),
    })
}

pub fn save_export(dir: &Path, export: &LogExport) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&export.file_name);
    std::fs::write(&path, export.contents.as_bytes())?;
    Ok(path)
}
