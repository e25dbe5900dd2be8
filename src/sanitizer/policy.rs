//! Allow-list policy for the HTML sanitizer.
//!
//! Which tags survive, which attributes each tag keeps, and which link
//! targets are considered safe.

/// Tags that may appear in sanitized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    B,
    Strong,
    I,
    Em,
    U,
    S,
    P,
    Br,
    Ul,
    Ol,
    Li,
    Blockquote,
    Code,
    Pre,
    Span,
    A,
}

impl Tag {
    /// Look up an allowed tag by its lower-cased name.
    pub fn from_name(name: &str) -> Option<Self> {
        let tag = match name {
            "b" => Tag::B,
            "strong" => Tag::Strong,
            "i" => Tag::I,
            "em" => Tag::Em,
            "u" => Tag::U,
            "s" => Tag::S,
            "p" => Tag::P,
            "br" => Tag::Br,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "blockquote" => Tag::Blockquote,
            "code" => Tag::Code,
            "pre" => Tag::Pre,
            "span" => Tag::Span,
            "a" => Tag::A,
            _ => return None,
        };
        Some(tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::B => "b",
            Tag::Strong => "strong",
            Tag::I => "i",
            Tag::Em => "em",
            Tag::U => "u",
            Tag::S => "s",
            Tag::P => "p",
            Tag::Br => "br",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Blockquote => "blockquote",
            Tag::Code => "code",
            Tag::Pre => "pre",
            Tag::Span => "span",
            Tag::A => "a",
        }
    }

    /// Void tags are emitted without a closing tag and never tracked as open.
    pub fn is_void(self) -> bool {
        matches!(self, Tag::Br)
    }

    /// Attribute names this tag may carry.
    pub fn allowed_attrs(self) -> &'static [&'static str] {
        match self {
            Tag::A => &["href", "title", "target", "rel"],
            Tag::Span => &["title"],
            _ => &[],
        }
    }
}

/// URI schemes accepted in `href` values.
pub const ALLOWED_SCHEMES: [&str; 4] = ["http:", "https:", "mailto:", "tel:"];

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "vbscript:", "data:"];

const RELATIVE_PREFIXES: [&str; 4] = ["/", "./", "../", "#"];

/// Whether an (already entity-decoded) `href` value may be kept.
///
/// Empty values, the allowed schemes and relative references pass. Every
/// other value is rejected, including the script-capable schemes.
pub fn is_safe_href(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() {
        return true;
    }
    if ALLOWED_SCHEMES.iter().any(|scheme| value.starts_with(scheme)) {
        return true;
    }
    if BLOCKED_SCHEMES.iter().any(|scheme| value.starts_with(scheme)) {
        return false;
    }
    RELATIVE_PREFIXES
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

/// `on*` attributes are event handlers on every element.
pub fn is_event_handler(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() > 2
        && bytes[..2].eq_ignore_ascii_case(b"on")
        && bytes[2..].iter().all(u8::is_ascii_alphabetic)
}

/// Whether `name` may be kept on `tag`.
pub fn is_attr_allowed(tag: Tag, name: &str) -> bool {
    if is_event_handler(name) || name.eq_ignore_ascii_case("style") {
        return false;
    }
    tag.allowed_attrs().contains(&name)
}
