//! Fenced code blocks.
//!
//! Fences are lifted out before any other pass so that `$`, `*` or `#` inside
//! code are never interpreted. A fence only matches once its closing marker
//! has arrived; a partial fence stays literal text until then.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::placeholder::{SpanKind, Stash};

/// ```` ```lang\n body ``` ```` with an optional language tag and a lazy body.
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([A-Za-z0-9_]+)?\n(.+?)```").unwrap());

/// Replace complete fences with placeholders, keeping the raw fenced text.
pub fn extract_fences(text: &str) -> (String, Stash) {
    let mut stash = Stash::new(SpanKind::CodeBlock);
    let out = stash.extract(text, &FENCE_RE, 0);
    (out, stash)
}

/// Render one raw fenced block as a code container.
pub fn render_code_block(fenced: &str) -> String {
    let Some(caps) = FENCE_RE.captures(fenced) else {
        return escape_html(fenced);
    };
    let lang = caps.get(1).map(|m| m.as_str());
    let code = caps.get(2).map_or("", |m| m.as_str());

    // Empty for untagged fences, otherwise with a leading space.
    let language_class = lang.map(|l| format!(" language-{l}")).unwrap_or_default();
    let language_label = lang.map_or_else(|| "text".to_string(), str::to_lowercase);

    format!(
        concat!(
            r#"<div class="code-block">"#,
            r#"<div class="code-block-header">"#,
            r#"<span class="language-label">{label}</span>"#,
            r#"<button class="copy-button" onclick="copyCode(this)"></button>"#,
            r#"</div>"#,
            r#"<pre><code class="{class}">{code}</code></pre>"#,
            r#"</div>"#,
        ),
        label = language_label,
        class = language_class,
        code = escape_html(code.trim()),
    )
}

/// Escape `&`, `<`, `>`, `"` and `'`, ampersand first.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unescape_html(text: &str) -> String {
        text.replace("&#039;", "'")
            .replace("&quot;", "\"")
            .replace("&gt;", ">")
            .replace("&lt;", "<")
            .replace("&amp;", "&")
    }

    fn code_body(rendered: &str) -> &str {
        let start = rendered.find("<code").unwrap();
        let open_end = start + rendered[start..].find('>').unwrap() + 1;
        let close = rendered.find("</code>").unwrap();
        &rendered[open_end..close]
    }

    #[test]
    fn test_escape_does_not_double_escape() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(escape_html(r#"<'">"#), "&lt;&#039;&quot;&gt;");
    }

    #[test]
    fn test_escaped_body_round_trips() {
        let bodies = [
            r#"if a < b && c > d { println!("{}", 'x'); }"#,
            "&amp; already looks escaped",
            "<script>alert('x')</script>",
            "plain",
        ];
        for body in bodies {
            let rendered = render_code_block(&format!("```rust\n{body}\n```"));
            let escaped = code_body(&rendered);
            for raw in ['<', '>', '"', '\''] {
                assert!(!escaped.contains(raw), "raw {raw:?} in {escaped}");
            }
            for (i, _) in escaped.match_indices('&') {
                let rest = &escaped[i..];
                assert!(
                    ["&amp;", "&lt;", "&gt;", "&quot;", "&#039;"]
                        .iter()
                        .any(|e| rest.starts_with(e)),
                    "bare ampersand in {escaped}"
                );
            }
            assert_eq!(unescape_html(escaped), body);
        }
    }

    #[test]
    fn test_language_label_and_default() {
        let tagged = render_code_block("```Python\nprint(1)\n```");
        assert!(tagged.contains(r#"<span class="language-label">python</span>"#));
        assert!(tagged.contains(r#"<code class=" language-Python">print(1)</code>"#));

        let untagged = render_code_block("```\nls -la\n```");
        assert!(untagged.contains(r#"<span class="language-label">text</span>"#));
        assert!(untagged.contains(r#"<code class="">ls -la</code>"#));
        assert!(untagged.contains("copy-button"));
    }

    #[test]
    fn test_unterminated_fence_is_not_extracted() {
        let (out, stash) = extract_fences("before\n```python\nprint(1)");
        assert!(stash.is_empty());
        assert_eq!(out, "before\n```python\nprint(1)");
    }

    #[test]
    fn test_extract_multiple_fences() {
        let (out, stash) = extract_fences("```a\n1\n``` mid ```\n2\n```");
        assert_eq!(out, "___CODE_BLOCK_0___ mid ___CODE_BLOCK_1___");
        assert_eq!(stash.len(), 2);
    }
}
