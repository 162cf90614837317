//! Lightweight Markdown-to-markup passes.
//!
//! Each rule is a pattern substitution over the output of the previous one;
//! the order below is load-bearing (bold before italic, unordered lists before
//! ordered lists, paragraphs last).

use once_cell::sync::Lazy;
use regex::Regex;

static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.*)$").unwrap());
static H2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.*)$").unwrap());
static H3_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### (.*)$").unwrap());
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static UNORDERED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-+*]\s+(.+)$").unwrap());
static ORDERED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(\d+)\.\s+(.+)$").unwrap());
static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());

/// Apply heading, inline and list rules.
pub fn apply_rules(text: &str) -> String {
    let text = H1_RE.replace_all(text, "<h1>${1}</h1>");
    let text = H2_RE.replace_all(&text, "<h2>${1}</h2>");
    let text = H3_RE.replace_all(&text, "<h3>${1}</h3>");
    let text = INLINE_CODE_RE.replace_all(&text, "<code>${1}</code>");
    let text = BOLD_RE.replace_all(&text, "<strong>${1}</strong>");
    let text = ITALIC_RE.replace_all(&text, "<em>${1}</em>");

    let text = UNORDERED_ITEM_RE.replace_all(&text, "<li>${1}</li>");
    let text = wrap_item_runs(&text, "<ul>", "</ul>");
    let text = ORDERED_ITEM_RE.replace_all(&text, "<li>${2}</li>");
    let text = wrap_item_runs(&text, "<ol>", "</ol>");

    text.replace("</ul><ul>", "").replace("</ol><ol>", "")
}

/// Wrap each run of consecutive bare `<li>` lines into one container line.
fn wrap_item_runs(text: &str, open: &str, close: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        if line.starts_with("<li>") && line.ends_with("</li>") {
            run.push(line);
            continue;
        }
        if !run.is_empty() {
            lines.push(format!("{open}{}{close}", run.concat()));
            run.clear();
        }
        lines.push(line.to_string());
    }
    if !run.is_empty() {
        lines.push(format!("{open}{}{close}", run.concat()));
    }

    lines.join("\n")
}

/// Split into paragraphs, wrap untagged blocks, and turn the remaining single
/// newlines into explicit breaks.
pub fn paragraphs(text: &str) -> String {
    let joined = BLANK_RUN_RE
        .split(text)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(|block| {
            if block.starts_with('<') {
                block.to_string()
            } else {
                format!("<p>{block}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = String::with_capacity(joined.len());
    let mut chars = joined.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' && chars.peek() != Some(&'<') {
            out.push_str("<br>");
        } else {
            out.push(c);
        }
    }
    out
}
