//! Markdown rendering.

use pulldown_cmark::{html, Options, Parser};

/// Render Markdown to generic HTML.
///
/// CommonMark plus the strikethrough extension. Embedded raw HTML passes
/// through unmodified; escaping happens later, when sanitized tokens are
/// rendered back to a string.
pub fn render_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(text, options);

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markup() {
        let html = render_html("Hello *world* and __strong__");
        assert_eq!(html, "<p>Hello <em>world</em> and <strong>strong</strong></p>\n");
    }

    #[test]
    fn test_strikethrough_enabled() {
        let html = render_html("~~gone~~");
        assert_eq!(html, "<p><del>gone</del></p>\n");
    }

    #[test]
    fn test_fenced_code_with_language() {
        let html = render_html("```python\nprint(1)\n```");
        assert_eq!(
            html,
            "<pre><code class=\"language-python\">print(1)\n</code></pre>\n"
        );
    }

    #[test]
    fn test_raw_html_passes_through() {
        let html = render_html("a <span class=\"tg-spoiler\">x</span> b");
        assert_eq!(html, "<p>a <span class=\"tg-spoiler\">x</span> b</p>\n");
    }

    #[test]
    fn test_text_is_entity_escaped() {
        let html = render_html("fish & chips");
        assert_eq!(html, "<p>fish &amp; chips</p>\n");
    }
}
