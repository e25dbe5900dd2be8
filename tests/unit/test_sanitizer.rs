//! Properties of the HTML sanitizer over hostile and malformed input

use classifieds_api::sanitizer::policy::{Tag, is_attr_allowed, is_event_handler, is_safe_href};
use classifieds_api::sanitizer::tokenizer::decode_entities;
use classifieds_api::sanitizer::{sanitize_html, strip_all_html};

const HOSTILE: &[&str] = &[
    "<ScRiPt>alert(1)</sCrIpT>",
    "<img src=x onerror=alert(1)>",
    "<a href=\"JaVaScRiPt:alert(1)\">x</a>",
    "<a href=\"  javascript:alert(1)\">x</a>",
    "<a href=\"data:text/html;base64,PHNjcmlwdD4=\">x</a>",
    "<p onmouseover=\"steal()\">hover</p>",
    "<iframe src=\"https://evil.example\"></iframe>",
    "<style>body{display:none}</style>text",
    "<b><i>unbalanced</b>",
    "<<b>>double</b>",
    "</div></span>stray closers",
    "<a href='/ok' target=_blank>link</a>",
    "plain text & 'quotes' \"here\"",
    "<svg><script>alert(1)</script></svg>",
];

const MULTIBYTE: &[&str] = &[
    "<p a\u{e9}b=1>x</p>",
    "<p \u{e9}\u{e9}=1 o\u{e9}n=2>x</p>",
    "<b\u{e9}>жирный</b\u{e9}>",
    "<пр>Привет</пр>",
    "<a href=\"/объявления\" title=\"Цена: 100 ₽\" target=\"_blank\">ссылка</a>",
    "<span title='日本語'>テキスト</span>",
    "<a href=\"javascript:alert('ё')\">ё</a>",
    "<p onкнопка=1 onclick\u{e9}=2>😀 emoji</p>",
    "Продаю велосипед <i>недорого</i> & быстро",
    "<\u{e9}>",
];

/// Every fragment, every pairwise concatenation, and every prefix cut on a
/// char boundary.
fn generated_inputs() -> Vec<String> {
    let fragments: Vec<&str> = HOSTILE.iter().chain(MULTIBYTE).copied().collect();
    let mut inputs = Vec::new();
    for a in &fragments {
        for b in &fragments {
            inputs.push(format!("{}{}", a, b));
        }
        for (i, _) in a.char_indices().skip(1) {
            inputs.push(a[..i].to_string());
        }
    }
    inputs
}

/// Walk the tags of sanitized output, checking each against the allow-list
/// and that non-void tags nest.
fn assert_well_formed(input: &str, out: &str) {
    let mut open: Vec<Tag> = Vec::new();
    for segment in out.split('<').skip(1) {
        let (body, _) = segment
            .split_once('>')
            .unwrap_or_else(|| panic!("unterminated tag in {:?} -> {:?}", input, out));
        let (closing, body) = match body.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (name, mut attrs) = body.split_once(' ').unwrap_or((body, ""));
        let tag = Tag::from_name(name)
            .unwrap_or_else(|| panic!("tag {:?} escaped in {:?} -> {:?}", name, input, out));

        if closing {
            assert_eq!(open.pop(), Some(tag), "misnested in {:?} -> {:?}", input, out);
            continue;
        }
        if !tag.is_void() {
            open.push(tag);
        }

        while !attrs.is_empty() {
            let (attr, rest) = attrs
                .split_once("=\"")
                .unwrap_or_else(|| panic!("bad attribute in {:?}", out));
            let (value, rest) = rest
                .split_once('"')
                .unwrap_or_else(|| panic!("unquoted attribute in {:?}", out));
            assert!(is_attr_allowed(tag, attr), "{:?} kept in {:?}", attr, out);
            assert!(!is_event_handler(attr), "{:?} kept in {:?}", attr, out);
            if attr == "href" {
                assert!(is_safe_href(&decode_entities(value)), "href {:?} in {:?}", value, out);
            }
            attrs = rest.trim_start();
        }
    }
    assert!(open.is_empty(), "unclosed {:?} in {:?} -> {:?}", open, input, out);
}

#[test]
fn test_output_carries_no_active_content() {
    for input in HOSTILE {
        let out = sanitize_html(input).to_lowercase();
        assert!(!out.contains("<script"), "{} -> {}", input, out);
        assert!(!out.contains("<iframe"), "{} -> {}", input, out);
        assert!(!out.contains("<style"), "{} -> {}", input, out);
        assert!(!out.contains("<img"), "{} -> {}", input, out);
        assert!(!out.contains("onerror"), "{} -> {}", input, out);
        assert!(!out.contains("onmouseover"), "{} -> {}", input, out);
        assert!(!out.contains("javascript:"), "{} -> {}", input, out);
        assert!(!out.contains("href=\"data:"), "{} -> {}", input, out);
    }
}

#[test]
fn test_sanitizing_twice_changes_nothing() {
    for input in HOSTILE {
        let once = sanitize_html(input);
        assert_eq!(sanitize_html(&once), once, "input: {}", input);
    }
}

#[test]
fn test_blank_targets_always_get_noopener() {
    for input in [
        "<a href=\"/a\" target=\"_blank\">a</a>",
        "<a target=_blank rel=nofollow>b</a>",
        "<a target='_blank' rel='noopener'>c</a>",
    ] {
        let out = sanitize_html(input);
        assert!(out.contains("noopener"), "{}", out);
        assert!(out.contains("noreferrer"), "{}", out);
        assert_eq!(out.matches("noopener").count(), 1, "{}", out);
    }
}

#[test]
fn test_tags_are_balanced() {
    for input in HOSTILE {
        let out = sanitize_html(input);
        for tag in ["b", "i", "p", "a"] {
            let opened = out.matches(&format!("<{}>", tag)).count()
                + out.matches(&format!("<{} ", tag)).count();
            let closed = out.matches(&format!("</{}>", tag)).count();
            assert_eq!(opened, closed, "<{}> unbalanced in {}", tag, out);
        }
    }
}

#[test]
fn test_strip_all_html_leaves_no_markup() {
    for input in HOSTILE {
        let out = strip_all_html(input);
        assert!(!out.contains('<'), "{} -> {}", input, out);
        assert!(!out.contains('>'), "{} -> {}", input, out);
    }
    assert_eq!(strip_all_html("<b>Anna</b> <i>K.</i>"), "Anna K.");
}

#[test]
fn test_plain_text_survives() {
    assert_eq!(sanitize_html("Just words"), "Just words");
    assert_eq!(sanitize_html("line one\nline two"), "line one\nline two");
}

#[test]
fn test_multibyte_markup_is_handled() {
    assert_eq!(sanitize_html("<p a\u{e9}b=1>x</p>"), "<p>x</p>");
    assert_eq!(sanitize_html("<b\u{e9}>жирный</b\u{e9}>"), "<b>жирный</b>");
    // A close tag whose name does not start with a letter is a bogus comment.
    assert_eq!(sanitize_html("<пр>Привет</пр>"), "&lt;пр&gt;Привет");
    assert_eq!(
        sanitize_html("<span title='日本語' onкнопка=1>テキスト</span>"),
        "<span title=\"日本語\">テキスト</span>"
    );
    assert_eq!(strip_all_html("<p a\u{e9}b=1>Привет</p>"), "Привет");
}

#[test]
fn test_generated_inputs_keep_every_property() {
    for input in generated_inputs() {
        let out = sanitize_html(&input);
        assert_well_formed(&input, &out);
        assert_eq!(sanitize_html(&out), out, "not idempotent for {:?}", input);

        let text = strip_all_html(&input);
        assert!(!text.contains('<'), "{:?} -> {:?}", input, text);
        assert!(!text.contains('>'), "{:?} -> {:?}", input, text);
    }
}
