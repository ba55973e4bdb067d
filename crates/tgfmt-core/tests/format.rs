//! End-to-end tests for the full formatting pipeline.

use tgfmt_core::format_message;

/// Visible text of a rendered chunk: tags stripped, entities decoded.
fn visible_text(chunk: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for ch in chunk.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

// ── Basic formatting ────────────────────────────────────────────────

#[test]
fn test_basic_markup_preserved() {
    let result = format_message("Hello *world* and __strong__", 4096);
    assert_eq!(result, vec!["Hello <i>world</i> and <b>strong</b>"]);
}

#[test]
fn test_strikethrough() {
    let result = format_message("~~old~~ new", 4096);
    assert_eq!(result, vec!["<s>old</s> new"]);
}

#[test]
fn test_inline_code() {
    let result = format_message("run `cargo build` now", 4096);
    assert_eq!(result, vec!["run <code>cargo build</code> now"]);
}

#[test]
fn test_heading_becomes_bold() {
    let result = format_message("# Title\n\nbody", 4096);
    assert_eq!(result, vec!["<b>Title</b>\nbody"]);
}

#[test]
fn test_lists_flattened() {
    let result = format_message("- one\n- two", 4096);
    assert_eq!(result, vec!["• one\n• two"]);

    let result = format_message("1. one\n2. two", 4096);
    assert_eq!(result, vec!["1. one\n2. two"]);
}

#[test]
fn test_blockquote() {
    let result = format_message("> quoted", 4096);
    assert_eq!(result, vec!["<blockquote>quoted\n</blockquote>"]);
}

#[test]
fn test_allowed_link_kept() {
    let result = format_message("[Rust](https://www.rust-lang.org)", 4096);
    assert_eq!(
        result,
        vec!["<a href=\"https://www.rust-lang.org\">Rust</a>"]
    );
}

#[test]
fn test_disallowed_link_keeps_text() {
    let result = format_message("[file](ftp://host/file)", 4096);
    assert_eq!(result, vec!["file"]);
}

// ── Preprocessing and escaping ──────────────────────────────────────

#[test]
fn test_control_chars_removed_and_escaped() {
    let result = format_message("hi\u{00} & <tag>", 4096);
    assert_eq!(result, vec!["hi &amp; &lt;tag&gt;"]);
}

#[test]
fn test_empty_input_yields_no_chunks() {
    assert!(format_message("", 4096).is_empty());
    assert!(format_message("   \n\t  ", 4096).is_empty());
    assert!(format_message("\u{00}\u{01}\u{02}", 4096).is_empty());
}

// ── Spoilers and custom emoji ───────────────────────────────────────

#[test]
fn test_spoiler_formatting() {
    let result = format_message("Hello ||secret||", 4096);
    assert_eq!(
        result,
        vec!["Hello <span class=\"tg-spoiler\">secret</span>"]
    );
}

#[test]
fn test_spoiler_inside_code_untouched() {
    let result = format_message("`||not hidden||`", 4096);
    assert_eq!(result, vec!["<code>||not hidden||</code>"]);
}

#[test]
fn test_custom_emoji_from_markdown_image() {
    let result = format_message("![🙂](tg://emoji?id=123)", 4096);
    assert_eq!(result, vec!["<tg-emoji emoji-id=\"123\">🙂</tg-emoji>"]);
}

#[test]
fn test_ordinary_image_falls_back_to_alt_text() {
    let result = format_message("![a cat](https://example.com/cat.png)", 4096);
    assert_eq!(result, vec!["a cat"]);
}

// ── Splitting ───────────────────────────────────────────────────────

#[test]
fn test_split_long_message() {
    let text = "a".repeat(5000);
    let parts = format_message(&text, 4096);
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|part| part.len() <= 4096));
    assert_eq!(parts.concat(), text);
}

#[test]
fn test_split_preserves_tags() {
    let result = format_message("**hello world**", 6);
    assert_eq!(result, vec!["<b>hello </b>", "<b>world</b>"]);
}

#[test]
fn test_code_block_kept_intact_when_fits() {
    let result = format_message("Intro\n\n```python\nprint(1)\n```", 10);
    assert_eq!(
        result,
        vec![
            "Intro\n",
            "<pre><code class=\"language-python\">print(1)\n</code></pre>",
        ]
    );
}

#[test]
fn test_code_block_split_prefers_newline() {
    let result = format_message("```\nline1\nline2\nline3\n```", 7);
    assert_eq!(
        result,
        vec![
            "<pre><code>line1\n</code></pre>",
            "<pre><code>line2\n</code></pre>",
            "<pre><code>line3\n</code></pre>",
        ]
    );
}

#[test]
fn test_unbounded_when_max_len_is_zero() {
    let text = "word ".repeat(2000);
    let parts = format_message(&text, 0);
    assert_eq!(parts.len(), 1);
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn test_visible_length_bound() {
    let text = "Some *styled* text with `code`, [a link](https://example.com), \
                and a much longer tail that keeps going. "
        .repeat(40);
    for max_len in [10, 50, 4096] {
        for chunk in format_message(&text, max_len) {
            assert!(
                visible_text(&chunk).chars().count() <= max_len,
                "chunk visible text exceeds {max_len}: {chunk:?}"
            );
        }
    }
}

#[test]
fn test_concatenation_fidelity() {
    let text = "# Head\n\npara one with **bold span that runs long**\n\n\
                - item\n- item\n\n```\ncode line\n```\n\ntail ||secret||";
    let whole = format_message(text, 0);
    let joined: String = format_message(text, 20).iter().map(|c| visible_text(c)).collect();
    assert_eq!(joined, visible_text(&whole[0]));
}

#[test]
fn test_chunks_are_well_formed() {
    let text = "**bold with _nested italic_ spanning a fair amount of text** \
                and `inline code` plus more words "
        .repeat(30);
    for chunk in format_message(&text, 64) {
        let mut stack: Vec<String> = Vec::new();
        let mut rest = chunk.as_str();
        while let Some(open) = rest.find('<') {
            rest = &rest[open + 1..];
            let close = rest.find('>').expect("unterminated tag in chunk");
            let inner = &rest[..close];
            rest = &rest[close + 1..];
            if let Some(name) = inner.strip_prefix('/') {
                assert_eq!(stack.pop().as_deref(), Some(name), "tags close out of order");
            } else {
                let name = inner.split_whitespace().next().unwrap_or(inner);
                stack.push(name.to_string());
            }
        }
        assert!(stack.is_empty(), "unclosed tags in chunk: {chunk:?}");
    }
}

#[test]
fn test_malformed_html_never_breaks_output() {
    let inputs = [
        "<b>unclosed",
        "</i>stray close",
        "<b><i>cross</b></i>",
        "<a href='javascript:x'>bad</a>",
        "<<>><<<b>>>",
        "||unclosed spoiler",
        "``` never closed",
    ];
    for input in inputs {
        let chunks = format_message(input, 4096);
        assert!(!chunks.is_empty(), "no output for {input:?}");
    }
}

#[test]
fn test_multibyte_input_splits_on_character_boundaries() {
    let text = "Привет мир! ".repeat(600);
    let chunks = format_message(&text, 100);
    for chunk in &chunks {
        assert!(visible_text(chunk).chars().count() <= 100);
    }
    let joined: String = chunks.iter().map(|c| visible_text(c)).collect();
    assert!(joined.starts_with("Привет мир!"));
}
