//! Input normalization and spoiler/code-span protection.
//!
//! Telegram's `||spoiler||` syntax is not Markdown, so it is rewritten to
//! the platform's spoiler span before rendering. Code spans are stashed
//! behind placeholders first so spoiler markers inside code survive
//! untouched.

use regex::{Captures, Regex};
use uuid::Uuid;

/// Normalize line endings and strip ASCII control characters.
///
/// `\r\n` and bare `\r` become `\n`; control characters other than newline
/// and tab (0x00–0x08, 0x0B–0x0C, 0x0E–0x1F, 0x7F) are removed.
pub fn preprocess(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|&c| {
            !matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
        })
        .collect()
}

/// Rewrite `||content||` spoiler syntax to `<span class="tg-spoiler">` so
/// the Markdown renderer passes it through as raw inline HTML.
///
/// Fenced code blocks and inline code spans are replaced with unique
/// placeholders for the duration of the rewrite and restored afterwards.
/// Unbalanced `||` markers simply never match and stay literal text.
pub fn protect_spoilers(text: &str) -> String {
    let code_block = Regex::new(r"(?s)```(.*?)```").unwrap();
    let inline_code = Regex::new(r"`([^`\n]+)`").unwrap();
    let spoiler = Regex::new(r"(?s)\|\|(.+?)\|\|").unwrap();

    let mut stashed: Vec<(String, String)> = Vec::new();

    let protected = code_block.replace_all(text, |caps: &Captures| {
        let placeholder = unique_placeholder(text);
        stashed.push((placeholder.clone(), caps[0].to_string()));
        placeholder
    });
    let protected = inline_code.replace_all(&protected, |caps: &Captures| {
        let placeholder = unique_placeholder(text);
        stashed.push((placeholder.clone(), caps[0].to_string()));
        placeholder
    });

    let mut rewritten = spoiler
        .replace_all(&protected, "<span class=\"tg-spoiler\">${1}</span>")
        .into_owned();

    for (placeholder, original) in &stashed {
        rewritten = rewritten.replace(placeholder.as_str(), original);
    }

    rewritten
}

/// Generate a placeholder token that provably does not occur in `source`.
fn unique_placeholder(source: &str) -> String {
    loop {
        let placeholder = format!("TGPHTOKEN{}X", Uuid::new_v4().simple());
        if !source.contains(&placeholder) {
            return placeholder;
        }
    }
}
