//! Streamed-response formatter.
//!
//! Converts the accumulated text of a model response into display markup.
//! The whole text is reprocessed on every call, so the function can be fed
//! growing prefixes of a stream and always returns the rendering of exactly
//! what has arrived so far.

pub mod code_block;
pub mod placeholder;
pub mod renderer;

use once_cell::sync::Lazy;
use regex::Regex;

pub use code_block::escape_html;
use placeholder::{SpanKind, Stash};

static MATH_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$\$(.+?)\$\$").unwrap());
static MATH_INLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\$(.+?)\$").unwrap());

/// Format accumulated response text as markup.
///
/// Pure and total: the same input always yields the same output, and empty
/// input yields empty output.
pub fn format(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let (text, code_blocks) = code_block::extract_fences(text);

    let mut math_blocks = Stash::new(SpanKind::LatexBlock);
    let text = math_blocks.extract(&text, &MATH_BLOCK_RE, 1);
    let mut math_inline = Stash::new(SpanKind::LatexInline);
    let text = math_inline.extract(&text, &MATH_INLINE_RE, 1);

    let text = renderer::apply_rules(&text);
    let text = renderer::paragraphs(&text);

    let text = math_blocks.restore(&text, |expr| {
        format!(r#"<div class="latex-block">\[{expr}\]</div>"#)
    });
    let text = math_inline.restore(&text, |expr| format!(r"\({expr}\)"));

    code_blocks.restore(&text, code_block::render_code_block)
}
