//! Length-aware splitting of the sanitized token stream.
//!
//! Telegram bounds message length by visible text; markup entities do not
//! count. The splitter therefore measures characters of [`Token::Text`]
//! content only, closes every open tag when a chunk fills up, and reopens
//! the same tags at the start of the next chunk so each chunk is valid
//! markup on its own.

use tracing::debug;

use crate::token::{render_tokens, StartTag, Token};

/// Split a token stream into rendered chunks whose visible text does not
/// exceed `max_len` characters.
///
/// `max_len == 0` disables splitting: the whole stream becomes a single
/// chunk with any dangling open tags closed at the end.
pub fn split(tokens: &[Token], max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return vec![render_tokens(tokens, &collect_open_tags(tokens))];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut open_tags: Vec<StartTag> = Vec::new();
    let mut current_len = 0usize;

    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::Start(tag) => {
                // A code block that fits in an empty chunk but not in the
                // remainder of this one moves to a fresh chunk whole
                // instead of being split mid-listing.
                if tag.name == "pre" && current_len > 0 {
                    if let Some(block_len) = measure_pre_block(tokens, index) {
                        let remaining = max_len - current_len;
                        if block_len <= max_len && block_len > remaining {
                            chunks.push(render_tokens(&current, &open_tags));
                            current = reopen_tags(&open_tags);
                            current_len = 0;
                        }
                    }
                }
                current.push(token.clone());
                open_tags.push(tag.clone());
            }
            Token::End(name) => {
                if open_tags.last().map(|tag| tag.name.as_str()) == Some(name.as_str()) {
                    open_tags.pop();
                    current.push(token.clone());
                }
            }
            Token::Text(text) => {
                let mut rest = text.as_str();
                while !rest.is_empty() {
                    let remaining = max_len - current_len;
                    if remaining == 0 {
                        chunks.push(render_tokens(&current, &open_tags));
                        current = reopen_tags(&open_tags);
                        current_len = 0;
                        continue;
                    }

                    let rest_chars = rest.chars().count();
                    if rest_chars <= remaining {
                        current.push(Token::Text(rest.to_string()));
                        current_len += rest_chars;
                        break;
                    }

                    let in_code_block = open_tags.iter().any(|tag| tag.name == "pre");
                    let split_at = find_split_position(rest, remaining, in_code_block);
                    let (head, tail) = rest.split_at(split_at);
                    current.push(Token::Text(head.to_string()));
                    chunks.push(render_tokens(&current, &open_tags));
                    current = reopen_tags(&open_tags);
                    current_len = 0;
                    rest = tail;
                }
            }
        }
    }

    if !current.is_empty() {
        chunks.push(render_tokens(&current, &open_tags));
    }

    debug!(chunks = chunks.len(), max_len, "split token stream");
    chunks
}

/// Choose a byte offset to split `text` at, within its first `limit`
/// characters.
///
/// Inside a code block only newlines make acceptable break points;
/// elsewhere the later of the last newline or space wins. When no break
/// point exists past the first character, cut hard at the limit.
fn find_split_position(text: &str, limit: usize, prefer_newline: bool) -> usize {
    let window_end = byte_index_of_char(text, limit);
    let window = &text[..window_end];

    let break_at = if prefer_newline {
        window.rfind('\n')
    } else {
        match (window.rfind('\n'), window.rfind(' ')) {
            (Some(newline), Some(space)) => Some(newline.max(space)),
            (newline, space) => newline.or(space),
        }
    };

    match break_at {
        // Both break characters are one byte, so the offset just past
        // them is a valid boundary.
        Some(pos) if pos > 0 => pos + 1,
        _ => window_end,
    }
}

/// Byte offset of the `index`-th character, or the total length when the
/// string has fewer characters.
fn byte_index_of_char(text: &str, index: usize) -> usize {
    text.char_indices()
        .nth(index)
        .map_or(text.len(), |(pos, _)| pos)
}

/// Visible-character length of the `pre` block opening at `start_index`,
/// or `None` when the block never closes.
fn measure_pre_block(tokens: &[Token], start_index: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut length = 0usize;
    for token in &tokens[start_index..] {
        match token {
            Token::Start(tag) if tag.name == "pre" => depth += 1,
            Token::End(name) if name == "pre" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(length);
                }
            }
            Token::Text(text) => length += text.chars().count(),
            _ => {}
        }
    }
    None
}

fn reopen_tags(open_tags: &[StartTag]) -> Vec<Token> {
    open_tags
        .iter()
        .map(|tag| Token::Start(tag.clone()))
        .collect()
}

/// Tags still open after walking the whole stream, in opening order.
fn collect_open_tags(tokens: &[Token]) -> Vec<StartTag> {
    let mut stack: Vec<StartTag> = Vec::new();
    for token in tokens {
        match token {
            Token::Start(tag) => stack.push(tag.clone()),
            Token::End(name) => {
                if stack.last().map(|tag| tag.name.as_str()) == Some(name.as_str()) {
                    stack.pop();
                }
            }
            Token::Text(_) => {}
        }
    }
    stack
}
