//! Allow-list HTML sanitizer for user-submitted rich text.
//!
//! A single left-to-right pass over the [`Tokenizer`] events. Allowed tags
//! are re-serialized with their permitted attributes, everything else is
//! dropped while its text content is kept (escaped). Open tags are tracked
//! on a stack so the output is always well-formed.
//!
//! ```
//! use classifieds_api::sanitizer::sanitize_html;
//!
//! let clean = sanitize_html("<p onclick='x'>Hi</p><script>alert(1)</script>");
//! assert_eq!(clean, "<p>Hi</p>alert(1)");
//! ```

pub mod policy;
pub mod tokenizer;

use std::borrow::Cow;

use policy::{Tag, is_attr_allowed, is_safe_href};
use tokenizer::{Attribute, Token, Tokenizer};

const REL_HARDENING: [&str; 2] = ["noopener", "noreferrer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    AllowList,
    TextOnly,
}

struct Sanitizer {
    mode: Mode,
    out: String,
    open: Vec<Tag>,
}

impl Sanitizer {
    fn new(mode: Mode, capacity: usize) -> Self {
        Self {
            mode,
            out: String::with_capacity(capacity),
            open: Vec::new(),
        }
    }

    fn run(mut self, input: &str) -> String {
        let input = normalize_newlines(input);
        for token in Tokenizer::new(&input) {
            match token {
                Token::Text(text) => escape_into(&mut self.out, text),
                Token::CharRef(reference) => self.out.push_str(reference),
                Token::StartTag {
                    name,
                    attrs,
                    self_closing,
                } if self.mode == Mode::AllowList => self.start_tag(&name, attrs, self_closing),
                Token::EndTag { name } if self.mode == Mode::AllowList => self.end_tag(&name),
                _ => {}
            }
        }
        while let Some(tag) = self.open.pop() {
            self.close(tag);
        }
        self.out
    }

    fn start_tag(&mut self, name: &str, attrs: Vec<Attribute<'_>>, self_closing: bool) {
        let Some(tag) = Tag::from_name(name) else {
            return;
        };

        self.out.push('<');
        self.out.push_str(tag.as_str());
        for (attr_name, value) in filter_attributes(tag, attrs) {
            self.out.push(' ');
            self.out.push_str(&attr_name);
            self.out.push_str("=\"");
            escape_into(&mut self.out, &value);
            self.out.push('"');
        }
        self.out.push('>');

        if tag.is_void() {
            return;
        }
        if self_closing {
            self.close(tag);
        } else {
            self.open.push(tag);
        }
    }

    fn end_tag(&mut self, name: &str) {
        let Some(tag) = Tag::from_name(name) else {
            return;
        };
        // Closing an outer tag closes everything opened inside it; stray
        // close tags are dropped.
        let Some(index) = self.open.iter().rposition(|open| *open == tag) else {
            return;
        };
        while self.open.len() > index {
            if let Some(open) = self.open.pop() {
                self.close(open);
            }
        }
    }

    fn close(&mut self, tag: Tag) {
        self.out.push_str("</");
        self.out.push_str(tag.as_str());
        self.out.push('>');
    }
}

/// Keep the first occurrence of each permitted attribute, drop unsafe links
/// and force `rel="noopener noreferrer"` onto `target="_blank"` anchors.
fn filter_attributes<'a>(tag: Tag, attrs: Vec<Attribute<'a>>) -> Vec<(String, Cow<'a, str>)> {
    let mut kept: Vec<(String, Cow<'a, str>)> = Vec::new();
    for attr in attrs {
        if !is_attr_allowed(tag, &attr.name) || kept.iter().any(|(name, _)| *name == attr.name) {
            continue;
        }
        let value = attr.value.unwrap_or(Cow::Borrowed(""));
        if attr.name == "href" && !is_safe_href(&value) {
            continue;
        }
        kept.push((attr.name, value));
    }

    if tag != Tag::A {
        return kept;
    }
    let opens_new_window = kept
        .iter()
        .any(|(name, value)| name == "target" && value.trim().eq_ignore_ascii_case("_blank"));
    if opens_new_window {
        let mut rel: Vec<String> = Vec::new();
        if let Some(pos) = kept.iter().position(|(name, _)| name == "rel") {
            let (_, existing) = kept.remove(pos);
            rel.extend(existing.split_whitespace().map(str::to_ascii_lowercase));
        }
        rel.extend(REL_HARDENING.iter().map(|token| token.to_string()));
        rel.sort();
        rel.dedup();
        kept.push(("rel".to_string(), Cow::Owned(rel.join(" "))));
    }
    kept
}

fn normalize_newlines(input: &str) -> Cow<'_, str> {
    if input.contains('\r') {
        Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(input)
    }
}

/// Escape `& < > " '` for use in text or a double-quoted attribute.
pub fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
}

/// Escape plain text for safe inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

/// Reduce untrusted markup to the allowed subset.
pub fn sanitize_html(input: &str) -> String {
    Sanitizer::new(Mode::AllowList, input.len()).run(input)
}

/// [`sanitize_html`] for optional input; `None` yields an empty string.
pub fn sanitize_html_opt(input: Option<&str>) -> String {
    input.map(sanitize_html).unwrap_or_default()
}

/// Discard every tag and return only the escaped text content.
pub fn strip_all_html(input: &str) -> String {
    Sanitizer::new(Mode::TextOnly, input.len()).run(input)
}
