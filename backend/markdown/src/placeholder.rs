//! Positional placeholders for spans lifted out of the text during formatting.
//!
//! Extracted spans are stored in occurrence order and replaced by
//! `___<TAG>_<n>___` markers that no Markdown rule touches. Restoration swaps
//! each marker back for a rendered version of the stored span.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"___(CODE_BLOCK|LATEX_BLOCK|LATEX_INLINE)_(\d+)___").unwrap());

/// Kind of span held by a [`Stash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    CodeBlock,
    LatexBlock,
    LatexInline,
}

impl SpanKind {
    fn tag(self) -> &'static str {
        match self {
            SpanKind::CodeBlock => "CODE_BLOCK",
            SpanKind::LatexBlock => "LATEX_BLOCK",
            SpanKind::LatexInline => "LATEX_INLINE",
        }
    }
}

/// Ordered storage for one kind of extracted span.
#[derive(Debug)]
pub struct Stash {
    kind: SpanKind,
    spans: Vec<String>,
}

impl Stash {
    pub fn new(kind: SpanKind) -> Self {
        Self {
            kind,
            spans: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Replace every match of `pattern` with a placeholder, storing capture
    /// group `group` (0 for the whole match).
    pub fn extract(&mut self, text: &str, pattern: &Regex, group: usize) -> String {
        pattern
            .replace_all(text, |caps: &Captures| {
                let raw = caps.get(group).map_or("", |m| m.as_str());
                self.spans.push(raw.to_string());
                format!("___{}_{}___", self.kind.tag(), self.spans.len() - 1)
            })
            .into_owned()
    }

    /// Swap this stash's placeholders for `render(span)`.
    ///
    /// Markers of other kinds, and indices with no stored span, are left as-is.
    pub fn restore<F>(&self, text: &str, render: F) -> String
    where
        F: Fn(&str) -> String,
    {
        PLACEHOLDER_RE
            .replace_all(text, |caps: &Captures| {
                let span = (&caps[1] == self.kind.tag())
                    .then(|| caps[2].parse::<usize>().ok())
                    .flatten()
                    .and_then(|index| self.spans.get(index));
                match span {
                    Some(raw) => render(raw),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
