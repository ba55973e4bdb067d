//! tgfmt-core: Markdown → Telegram-HTML formatting pipeline.
//!
//! Converts Markdown-formatted text into the restricted HTML dialect
//! Telegram accepts, then splits the result into message-sized chunks
//! without breaking markup or words inappropriately:
//!
//! - `preprocess` — Line-ending normalization, control-character
//!   stripping, and `||spoiler||` protection
//! - `render` — CommonMark rendering (strikethrough enabled, raw HTML
//!   passed through)
//! - `sanitize` — Allow-list sanitization into a well-nested token
//!   stream
//! - `split` — Length-aware chunking that closes and reopens tags
//!   across chunk boundaries
//! - [`token`] — The token intermediate representation and its renderer
//!
//! # Quick Start
//!
//! ```
//! let chunks = tgfmt_core::format_message("Hello *world*", 4096);
//! assert_eq!(chunks, vec!["Hello <i>world</i>".to_string()]);
//! ```
//!
//! The pipeline is total: any input string produces well-formed output,
//! however malformed its markup. It holds no shared state and is safe to
//! call concurrently.

pub mod preprocess;
pub mod render;
pub mod sanitize;
pub mod split;
pub mod token;

pub use preprocess::{preprocess, protect_spoilers};
pub use render::render_html;
pub use sanitize::sanitize;
pub use split::split;
pub use token::{render_tokens, StartTag, Token};

use tracing::debug;

/// Format Markdown for Telegram: render, sanitize, and split into chunks
/// whose visible text is at most `max_len` characters each.
///
/// Returns an empty `Vec` when the input is empty or whitespace-only
/// after preprocessing. `max_len == 0` disables splitting and yields a
/// single chunk.
pub fn format_message(text: &str, max_len: usize) -> Vec<String> {
    let cleaned = preprocess(text);
    if cleaned.trim().is_empty() {
        return Vec::new();
    }

    let prepared = protect_spoilers(&cleaned);
    let html = render_html(&prepared);
    let tokens = sanitize(&html);
    let chunks = split(&tokens, max_len);

    debug!(
        input_len = text.len(),
        chunks = chunks.len(),
        max_len,
        "formatted message"
    );
    chunks
}
