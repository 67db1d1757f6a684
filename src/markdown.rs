//! Converts post bodies from markdown to HTML. Posts are handed to consumers
//! unrendered ([`crate::post::Post::content`]); this is the rendering used by
//! the command line's `show --html`.

use pulldown_cmark::{html, Options, Parser};

/// Converts `markdown` to HTML with footnotes, smart punctuation,
/// strikethrough, tables and task lists enabled.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}
