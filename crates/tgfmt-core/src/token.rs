//! Token intermediate representation for sanitized Telegram HTML.
//!
//! The sanitizer emits a flat sequence of these tokens instead of a string
//! so that the splitter can measure visible text and reconstruct open tags
//! across chunk boundaries. Text is escaped only when a token sequence is
//! rendered, never at construction time.

/// One atomic unit of the sanitized markup stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text payload.
    Text(String),
    /// Opening of an allow-listed element.
    Start(StartTag),
    /// Closing tag. Always matches the nearest unmatched [`Token::Start`]
    /// with the same name; the sanitizer drops anything that would not.
    End(String),
}

/// An opening tag together with its retained attributes, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl StartTag {
    /// A start tag with no attributes.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
        }
    }

    /// A start tag carrying a single attribute.
    pub fn with_attr(name: &str, attr: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: vec![(attr.to_string(), value.to_string())],
        }
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Escape the characters special in Telegram HTML text and attribute
/// values: `&`, `<`, `>`, `"`, `'`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render a token sequence to a Telegram HTML string, then close every tag
/// in `open_tags` innermost-first so the result is well-formed on its own.
pub fn render_tokens(tokens: &[Token], open_tags: &[StartTag]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(text) => out.push_str(&escape_html(text)),
            Token::Start(tag) => out.push_str(&render_start_tag(tag)),
            Token::End(name) => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
    for tag in open_tags.iter().rev() {
        out.push_str("</");
        out.push_str(&tag.name);
        out.push('>');
    }
    out
}

/// Render one start tag with only the attributes Telegram accepts on it.
fn render_start_tag(tag: &StartTag) -> String {
    match tag.name.as_str() {
        "a" => match tag.attr("href") {
            Some(href) => format!("<a href=\"{}\">", escape_html(href)),
            None => "<a>".to_string(),
        },
        "span" if tag.attr("class") == Some("tg-spoiler") => {
            "<span class=\"tg-spoiler\">".to_string()
        }
        "blockquote" if tag.attr("expandable") == Some("true") => {
            "<blockquote expandable>".to_string()
        }
        "code" => match tag.attr("class") {
            Some(class) => format!("<code class=\"{}\">", escape_html(class)),
            None => "<code>".to_string(),
        },
        "tg-emoji" => match tag.attr("emoji-id") {
            Some(id) => format!("<tg-emoji emoji-id=\"{}\">", escape_html(id)),
            None => "<tg-emoji>".to_string(),
        },
        name => format!("<{name}>"),
    }
}
