//! Terminal output utilities: ANSI formatting, table rendering, and the
//! transcript renderer that turns panel notifications into plain text.

use std::io::Write;

use once_cell::sync::Lazy;
use qchat_core::Notification;
use regex::Regex;

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until 'm'
            for next in chars.by_ref() {
                if next == 'm' { break; }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

/// Print a formatted INFO note to stdout.
pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Print a formatted SUCCESS note.
pub fn note_success(msg: &str) {
    if supports_color() {
        println!("{GREEN}{BOLD}✓{RESET} {msg}");
    } else {
        println!("OK: {msg}");
    }
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

/// Column alignment.
pub enum Align { Left, Right }

/// A table column definition.
pub struct Column {
    pub header: String,
    pub align: Align,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn left(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Left, max_width: None }
    }

    pub fn right(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Right, max_width: None }
    }

    pub fn with_max_width(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }
}

/// Render a table with given columns and rows.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    let num_cols = columns.len();
    let mut widths: Vec<usize> = columns.iter().map(|c| visible_width(&c.header)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            let w = visible_width(cell);
            if w > widths[i] {
                widths[i] = columns[i].max_width.map_or(w, |max| w.min(max));
            }
        }
    }

    let mut out = String::new();

    let header_cells: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| pad_cell(&col.header, widths[i], &col.align))
        .collect();
    out.push_str(&format!("{BOLD}  {}  {RESET}\n", header_cells.join("  ")));

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}  \n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = (0..num_cols)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                pad_cell(&truncate(cell, widths[i]), widths[i], &columns[i].align)
            })
            .collect();
        out.push_str(&format!("  {}  \n", cells.join("  ")));
    }

    out
}

fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

fn truncate(s: &str, width: usize) -> String {
    if visible_width(s) <= width {
        return s.to_string();
    }
    let kept: String = strip_ansi(s).chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

fn pad_cell(s: &str, width: usize, align: &Align) -> String {
    let pad = width.saturating_sub(visible_width(s));
    match align {
        Align::Left => format!("{s}{}", " ".repeat(pad)),
        Align::Right => format!("{}{s}", " ".repeat(pad)),
    }
}

// ---------------------------------------------------------------------------
// Streaming writer
// ---------------------------------------------------------------------------

/// Write chunks to a buffered writer, flushing after each.
pub fn stream_write(writer: &mut impl Write, chunk: &str) -> std::io::Result<()> {
    writer.write_all(chunk.as_bytes())?;
    writer.flush()
}

// ---------------------------------------------------------------------------
// Markup to plain text
// ---------------------------------------------------------------------------

static BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|h[1-6]|li|div|pre|ul|ol)>").unwrap()
});
static ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<li>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Convert rendered markup to terminal text.
///
/// Line breaks and block ends become newlines, list items get a bullet, every
/// other tag is dropped and entities are unescaped. Trailing whitespace is
/// trimmed so successive renderings of a growing response share a prefix.
pub fn markup_to_plain(markup: &str) -> String {
    let text = BREAK_RE.replace_all(markup, "\n");
    let text = ITEM_RE.replace_all(&text, "- ");
    let text = TAG_RE.replace_all(&text, "");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");
    unescape_entities(&text).trim_end().to_string()
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
}

/// Turns the notification stream of one chat surface into terminal writes.
///
/// The panel replaces the whole response on every notification; a terminal
/// cannot, so only the newly appended suffix is printed when the new
/// rendering extends what is already on screen.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    shown: String,
    color: bool,
}

impl TranscriptRenderer {
    pub fn new(color: bool) -> Self {
        Self {
            shown: String::new(),
            color,
        }
    }

    /// A new session started. A response cut off by it gets closed here,
    /// since superseded sessions never post `end`.
    pub fn begin_response(&mut self) -> Option<String> {
        if self.shown.is_empty() {
            return None;
        }
        self.shown.clear();
        Some("\n\n".to_string())
    }

    /// Text to write for `notification`, if any.
    pub fn render(&mut self, notification: &Notification) -> Option<String> {
        match notification {
            Notification::Response(markup) if is_status(markup) => {
                let status = markup_to_plain(markup);
                let lead = if self.shown.is_empty() { "" } else { "\n" };
                self.shown.clear();
                Some(if self.color {
                    format!("{lead}{RED}{status}{RESET}")
                } else {
                    format!("{lead}{status}")
                })
            }
            Notification::Response(markup) => {
                let plain = markup_to_plain(markup);
                let out = match plain.strip_prefix(self.shown.as_str()) {
                    Some(suffix) => suffix.to_string(),
                    None if self.color => format!("\n{DIM}[re-rendered]{RESET}\n{plain}"),
                    None => format!("\n[re-rendered]\n{plain}"),
                };
                self.shown = plain;
                (!out.is_empty()).then_some(out)
            }
            Notification::End => {
                self.shown.clear();
                Some("\n\n".to_string())
            }
            Notification::ClearChat => {
                self.shown.clear();
                Some(if self.color {
                    "\x1b[2J\x1b[H".to_string()
                } else {
                    "\n--- chat cleared ---\n".to_string()
                })
            }
        }
    }
}

fn is_status(markup: &str) -> bool {
    markup.starts_with(r#"<div class="status-message"#)
}
