//! Event tokenizer for untrusted markup.
//!
//! Splits input into start tags, end tags, text runs, character references,
//! comments and declarations. It never fails: a `<` that does not open a
//! complete construct is yielded as text.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Lower-cased attribute name.
    pub name: String,
    /// Entity-decoded value, `None` for a bare attribute.
    pub value: Option<Cow<'a, str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    StartTag {
        name: String,
        attrs: Vec<Attribute<'a>>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// Literal text. May contain `&` only inside script/style bodies.
    Text(&'a str),
    /// A well-formed `&name;`, `&#NN;` or `&#xHH;` reference, verbatim.
    CharRef(&'a str),
    Comment,
    Declaration,
}

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_text_end: Option<&'static str>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text_end: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn lone_lt(&mut self) -> Token<'a> {
        let start = self.pos;
        self.pos += 1;
        Token::Text(&self.input[start..start + 1])
    }

    fn raw_text(&mut self, end_tag: &'static str) -> Option<Token<'a>> {
        let rest = self.rest();
        let end = find_ignore_ascii_case(rest, end_tag).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(Token::Text(&rest[..end]))
    }

    fn text(&mut self) -> Token<'a> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c == '<' || c == '&')
            .unwrap_or(rest.len());
        self.pos += end;
        Token::Text(&rest[..end])
    }

    fn char_ref(&mut self) -> Token<'a> {
        let rest = self.rest();
        match char_ref_len(rest) {
            Some(len) => {
                self.pos += len;
                Token::CharRef(&rest[..len])
            }
            None => {
                self.pos += 1;
                Token::Text(&rest[..1])
            }
        }
    }

    fn markup(&mut self) -> Token<'a> {
        let rest = self.rest();
        let bytes = rest.as_bytes();

        if rest.starts_with("<!--") {
            // `<!-->` and `<!--->` are complete empty comments.
            let end = rest[2..]
                .find("-->")
                .map(|i| 2 + i + 3)
                .unwrap_or(rest.len());
            self.pos += end;
            return Token::Comment;
        }

        match bytes.get(1) {
            Some(b'!') | Some(b'?') => match rest.find('>') {
                Some(i) => {
                    self.pos += i + 1;
                    Token::Declaration
                }
                None => self.lone_lt(),
            },
            Some(b'/') => match bytes.get(2) {
                Some(c) if c.is_ascii_alphabetic() => self.end_tag(),
                Some(_) => match rest.find('>') {
                    Some(i) => {
                        self.pos += i + 1;
                        Token::Comment
                    }
                    None => self.lone_lt(),
                },
                None => self.lone_lt(),
            },
            Some(c) if c.is_ascii_alphabetic() => self.start_tag(),
            _ => self.lone_lt(),
        }
    }

    fn end_tag(&mut self) -> Token<'a> {
        let rest = self.rest();
        let name_len = rest[2..].bytes().take_while(|b| is_name_byte(*b)).count();
        let name = rest[2..2 + name_len].to_ascii_lowercase();
        match rest[2 + name_len..].find('>') {
            Some(i) => {
                self.pos += 2 + name_len + i + 1;
                Token::EndTag { name }
            }
            None => self.lone_lt(),
        }
    }

    fn start_tag(&mut self) -> Token<'a> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let len = bytes.len();

        let mut i = 1;
        while i < len && is_name_byte(bytes[i]) {
            i += 1;
        }
        let name = rest[1..i].to_ascii_lowercase();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                None => return self.lone_lt(),
                Some(b'>') => {
                    i += 1;
                    break;
                }
                Some(b'/') => {
                    i += 1;
                    if bytes.get(i) == Some(&b'>') {
                        self_closing = true;
                    }
                    continue;
                }
                Some(_) => {}
            }

            let name_start = i;
            while i < len
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'>' | b'/' | b'=')
            {
                i += 1;
            }
            if i == name_start {
                // stray '='
                i += 1;
                continue;
            }
            let attr_name = rest[name_start..i].to_ascii_lowercase();

            let mut j = i;
            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let mut value = None;
            if bytes.get(j) == Some(&b'=') {
                j += 1;
                while j < len && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                match bytes.get(j) {
                    None => return self.lone_lt(),
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        match rest[j + 1..].find(quote as char) {
                            Some(k) => {
                                value = Some(&rest[j + 1..j + 1 + k]);
                                i = j + 1 + k + 1;
                            }
                            None => return self.lone_lt(),
                        }
                    }
                    Some(_) => {
                        let start = j;
                        while j < len && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                            j += 1;
                        }
                        value = Some(&rest[start..j]);
                        i = j;
                    }
                }
            }

            attrs.push(Attribute {
                name: attr_name,
                value: value.map(decode_entities),
            });
        }

        self.pos += i;
        if !self_closing {
            self.raw_text_end = match name.as_str() {
                "script" => Some("</script"),
                "style" => Some("</style"),
                _ => None,
            };
        }
        Token::StartTag {
            name,
            attrs,
            self_closing,
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.input.len() {
            return None;
        }
        if let Some(end_tag) = self.raw_text_end.take()
            && let Some(token) = self.raw_text(end_tag)
        {
            return Some(token);
        }
        let token = match self.input.as_bytes()[self.pos] {
            b'<' => self.markup(),
            b'&' => self.char_ref(),
            _ => self.text(),
        };
        Some(token)
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Length of the character reference at the start of `s`, if well formed.
pub fn char_ref_len(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    if b.first() != Some(&b'&') {
        return None;
    }
    let mut i = 1;
    if b.get(1) == Some(&b'#') {
        let hex = matches!(b.get(2), Some(b'x') | Some(b'X'));
        i = if hex { 3 } else { 2 };
        let start = i;
        while i < b.len()
            && if hex {
                b[i].is_ascii_hexdigit()
            } else {
                b[i].is_ascii_digit()
            }
        {
            i += 1;
        }
        if i == start {
            return None;
        }
    } else {
        let start = i;
        while i < b.len() && b[i].is_ascii_alphanumeric() {
            i += 1;
        }
        if i == start || !b[start].is_ascii_alphabetic() {
            return None;
        }
    }
    (b.get(i) == Some(&b';')).then_some(i + 1)
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "colon" => ':',
        "sol" => '/',
        "lpar" => '(',
        "rpar" => ')',
        "Tab" => '\t',
        "NewLine" => '\n',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "hellip" => '\u{2026}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        _ => return None,
    };
    Some(c)
}

fn decode_char_ref(reference: &str) -> Option<char> {
    let body = &reference[1..reference.len() - 1];
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => numeric.parse::<u32>().ok(),
        };
        let c = code
            .filter(|&c| c != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}');
        return Some(c);
    }
    named_entity(body)
}

/// Decode character references inside an attribute value.
///
/// Unknown named references are kept verbatim.
pub fn decode_entities(value: &str) -> Cow<'_, str> {
    if !value.contains('&') {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match char_ref_len(rest) {
            Some(len) => {
                match decode_char_ref(&rest[..len]) {
                    Some(c) => out.push(c),
                    None => out.push_str(&rest[..len]),
                }
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
