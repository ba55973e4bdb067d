//! HTML sanitization into the Telegram tag subset.
//!
//! The rendered HTML is re-tokenized with html5ever's permissive tokenizer
//! and re-emitted as a [`Token`] stream containing only the constructs
//! Telegram accepts. Synonym tags are normalized (`strong` → `b`), block
//! structure is flattened to the platform's plain-text conventions (list
//! bullets, heading bold, newline block breaks), and anything unrecognized
//! degrades to literal escaped text instead of being dropped.
//!
//! The emitted stream is well-nested by construction: the sanitizer keeps
//! its own open-tag stack and silently drops end tags that do not match
//! the top of it.

use std::cell::RefCell;

use html5ever::buffer_queue::BufferQueue;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    Tag, TagKind, Token as HtmlToken, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use regex::Regex;
use tracing::trace;

use crate::token::{StartTag, Token};

/// Parse an HTML string and re-emit it as the Telegram token dialect.
///
/// Tolerates arbitrarily malformed markup: unmatched end tags are dropped,
/// disallowed elements are unwrapped around their children, and unknown
/// tags become literal text. Trailing newline-only text is trimmed from
/// the end of the stream.
pub fn sanitize(html: &str) -> Vec<Token> {
    let sink = SanitizerSink {
        state: RefCell::new(SanitizerState::new()),
    };
    let tokenizer = Tokenizer::new(sink, TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(html));
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    let mut tokens = tokenizer.sink.state.into_inner().tokens;
    trim_trailing_newlines(&mut tokens);
    trace!(tokens = tokens.len(), "sanitized html into token stream");
    tokens
}

/// One nested-list level. Ordered frames carry the running item counter.
enum ListFrame {
    Unordered,
    Ordered { index: u64 },
}

/// html5ever sink feeding the sanitizer state machine.
///
/// The tokenizer calls `process_token` through `&self`, so the mutable
/// state lives behind a `RefCell`.
struct SanitizerSink {
    state: RefCell<SanitizerState>,
}

impl TokenSink for SanitizerSink {
    type Handle = ();

    fn process_token(&self, token: HtmlToken, _line_number: u64) -> TokenSinkResult<()> {
        let mut state = self.state.borrow_mut();
        match token {
            HtmlToken::TagToken(tag) => match tag.kind {
                TagKind::StartTag => state.handle_start_tag(&tag),
                TagKind::EndTag => state.handle_end_tag(&tag),
            },
            HtmlToken::CharacterTokens(text) => state.handle_text(&text),
            // Comments, doctypes, parse errors, and EOF carry nothing the
            // output dialect can express.
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

struct SanitizerState {
    tokens: Vec<Token>,
    open_tags: Vec<String>,
    list_stack: Vec<ListFrame>,
    blockquote_depth: usize,
    emoji_src: Regex,
}

impl SanitizerState {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            open_tags: Vec::new(),
            list_stack: Vec::new(),
            blockquote_depth: 0,
            emoji_src: Regex::new(r"(?i)^tg://emoji\?id=(\d+)$").unwrap(),
        }
    }

    fn handle_start_tag(&mut self, tag: &Tag) {
        match &*tag.name {
            "ul" | "ol" => self.start_list(&tag.name),
            "li" => self.start_list_item(),
            "br" => self.append_text("\n"),
            "p" => self.ensure_block_break(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.ensure_block_break();
                self.open_tag(StartTag::new("b"));
            }
            "blockquote" => self.start_blockquote(tag),
            "img" => self.handle_img(tag),
            _ => match normalize_start(tag) {
                Normalized::Keep(start) => self.open_tag(start),
                Normalized::Drop => {}
                Normalized::Literal => self.append_text(&literal_start_tag(tag)),
            },
        }
    }

    fn handle_end_tag(&mut self, tag: &Tag) {
        match &*tag.name {
            "ul" | "ol" => self.end_list(),
            "li" => self.append_text("\n"),
            "p" => self.append_text("\n"),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.close_tag("b");
                self.append_text("\n");
            }
            "blockquote" => self.end_blockquote(),
            "img" => {}
            name => match normalize_end(name) {
                Some(mapped) => self.close_tag(mapped),
                None => self.append_text(&format!("</{name}>")),
            },
        }
    }

    fn handle_text(&mut self, data: &str) {
        // The renderer separates block elements with newline-only text
        // nodes; those would show up as stray blank lines in the output.
        if data.contains('\n')
            && data.chars().all(char::is_whitespace)
            && !self.preserve_whitespace()
        {
            return;
        }
        self.append_text(data);
    }

    fn handle_img(&mut self, tag: &Tag) {
        let alt = find_attr(tag, "alt").unwrap_or("").to_string();
        let emoji_id = find_attr(tag, "src")
            .and_then(|src| self.emoji_src.captures(src))
            .map(|caps| caps[1].to_string());

        match emoji_id {
            Some(id) if !alt.is_empty() => {
                self.open_tag(StartTag::with_attr("tg-emoji", "emoji-id", &id));
                self.append_text(&alt);
                self.close_tag("tg-emoji");
            }
            _ if !alt.is_empty() => self.append_text(&alt),
            _ => {}
        }
    }

    // ── Lists ───────────────────────────────────────────────────────

    fn start_list(&mut self, name: &str) {
        self.ensure_block_break();
        let frame = if name == "ol" {
            ListFrame::Ordered { index: 0 }
        } else {
            ListFrame::Unordered
        };
        self.list_stack.push(frame);
    }

    fn end_list(&mut self) {
        self.list_stack.pop();
        self.append_text("\n");
    }

    fn start_list_item(&mut self) {
        let prefix = match self.list_stack.last_mut() {
            Some(ListFrame::Ordered { index }) => {
                *index += 1;
                format!("{index}. ")
            }
            Some(ListFrame::Unordered) => "• ".to_string(),
            None => {
                // li outside any list: malformed input, fall back to a
                // plain line break.
                self.append_text("\n");
                return;
            }
        };

        if !self.tokens.is_empty() && !self.ends_with_newline() {
            self.append_text("\n");
        }
        self.append_text(&prefix);
    }

    // ── Blockquotes ─────────────────────────────────────────────────

    fn start_blockquote(&mut self, tag: &Tag) {
        // Telegram has no nested blockquotes; inner quotes collapse into
        // the outermost one.
        if self.blockquote_depth > 0 {
            self.blockquote_depth += 1;
            return;
        }

        let mut start = StartTag::new("blockquote");
        if find_attr(tag, "expandable").is_some() {
            start.attrs.push(("expandable".to_string(), "true".to_string()));
        }
        self.ensure_block_break();
        self.open_tag(start);
        self.blockquote_depth = 1;
    }

    fn end_blockquote(&mut self) {
        if self.blockquote_depth == 0 {
            return;
        }
        self.blockquote_depth -= 1;
        if self.blockquote_depth == 0 {
            self.close_tag("blockquote");
            self.append_text("\n");
        }
    }

    // ── Token buffer primitives ─────────────────────────────────────

    fn open_tag(&mut self, start: StartTag) {
        self.open_tags.push(start.name.clone());
        self.tokens.push(Token::Start(start));
    }

    fn close_tag(&mut self, name: &str) {
        if self.open_tags.last().map(String::as_str) != Some(name) {
            return;
        }
        self.open_tags.pop();
        self.tokens.push(Token::End(name.to_string()));
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            last.push_str(text);
            return;
        }
        self.tokens.push(Token::Text(text.to_string()));
    }

    /// Insert a newline before a block element unless the output already
    /// sits at a line start.
    fn ensure_block_break(&mut self) {
        match self.tokens.last() {
            Some(Token::Text(text)) if !text.ends_with('\n') => self.append_text("\n"),
            Some(Token::End(_)) => self.append_text("\n"),
            _ => {}
        }
    }

    fn ends_with_newline(&self) -> bool {
        matches!(self.tokens.last(), Some(Token::Text(text)) if text.ends_with('\n'))
    }

    fn preserve_whitespace(&self) -> bool {
        self.open_tags.iter().any(|t| t == "pre" || t == "code")
    }
}

/// Outcome of normalizing an allow-list candidate start tag.
enum Normalized {
    /// Emit the mapped tag.
    Keep(StartTag),
    /// Allow-listed name with disallowed attributes: the element vanishes
    /// but its children are still processed.
    Drop,
    /// Unrecognized tag: reproduce its start-tag syntax as literal text.
    Literal,
}

fn normalize_start(tag: &Tag) -> Normalized {
    let mapped = match &*tag.name {
        "strong" | "b" => "b",
        "em" | "i" => "i",
        "ins" | "u" => "u",
        "strike" | "s" | "del" => "s",
        "code" => "code",
        "pre" => "pre",
        "a" => "a",
        "span" | "tg-spoiler" => "span",
        "tg-emoji" => "tg-emoji",
        _ => return Normalized::Literal,
    };

    match mapped {
        "a" => match find_attr(tag, "href") {
            Some(href) if allowed_href(href) => {
                Normalized::Keep(StartTag::with_attr("a", "href", href))
            }
            _ => Normalized::Drop,
        },
        "span" => {
            if &*tag.name == "tg-spoiler" || find_attr(tag, "class") == Some("tg-spoiler") {
                Normalized::Keep(StartTag::with_attr("span", "class", "tg-spoiler"))
            } else {
                Normalized::Drop
            }
        }
        "code" => {
            let mut start = StartTag::new("code");
            if let Some(class) = find_attr(tag, "class") {
                if class.starts_with("language-") {
                    start.attrs.push(("class".to_string(), class.to_string()));
                }
            }
            Normalized::Keep(start)
        }
        "tg-emoji" => match find_attr(tag, "emoji-id") {
            Some(id) if !id.is_empty() => {
                Normalized::Keep(StartTag::with_attr("tg-emoji", "emoji-id", id))
            }
            _ => Normalized::Drop,
        },
        name => Normalized::Keep(StartTag::new(name)),
    }
}

fn normalize_end(name: &str) -> Option<&'static str> {
    match name {
        "strong" | "b" => Some("b"),
        "em" | "i" => Some("i"),
        "ins" | "u" => Some("u"),
        "strike" | "s" | "del" => Some("s"),
        "code" => Some("code"),
        "pre" => Some("pre"),
        "a" => Some("a"),
        "span" | "tg-spoiler" => Some("span"),
        "tg-emoji" => Some("tg-emoji"),
        _ => None,
    }
}

fn allowed_href(href: &str) -> bool {
    href.starts_with("http://")
        || href.starts_with("https://")
        || href.starts_with("tg://user?id=")
}

fn find_attr<'t>(tag: &'t Tag, name: &str) -> Option<&'t str> {
    tag.attrs
        .iter()
        .find(|attr| &*attr.name.local == name)
        .map(|attr| &*attr.value)
}

/// Reconstruct an unrecognized start tag as text, e.g. `<div class="x">`.
/// Attributes keep their source order; valueless attributes render bare.
fn literal_start_tag(tag: &Tag) -> String {
    let name = &*tag.name;
    if tag.attrs.is_empty() {
        return format!("<{name}>");
    }
    let attrs = tag
        .attrs
        .iter()
        .map(|attr| {
            let attr_name = &*attr.name.local;
            if attr.value.is_empty() {
                attr_name.to_string()
            } else {
                format!("{}=\"{}\"", attr_name, attr.value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    format!("<{name} {attrs}>")
}

/// Remove trailing newline-only text from the end of the token stream,
/// dropping text tokens that become empty.
fn trim_trailing_newlines(tokens: &mut Vec<Token>) {
    while let Some(Token::Text(text)) = tokens.last_mut() {
        let trimmed = text.trim_end_matches('\n');
        if trimmed.len() == text.len() {
            break;
        }
        if trimmed.is_empty() {
            tokens.pop();
            continue;
        }
        text.truncate(trimmed.len());
        break;
    }
}
