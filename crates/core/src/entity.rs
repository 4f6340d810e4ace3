//! Character reference restoration.
//!
//! Decodes the named entities that show up in novel pages plus decimal and
//! hexadecimal numeric references. Each reference is decoded exactly once, so
//! `&amp;lt;` becomes `&lt;`, never `<`. Anything not recognised is left as is.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());

/// Named entities and the code point each one stands for.
const NAMED_ENTITIES: [(&str, char); 13] = [
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
    ("hellip", '\u{2026}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
];

fn named_entity(name: &str) -> Option<char> {
    NAMED_ENTITIES.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

fn numeric_reference(body: &str) -> Option<char> {
    let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<u32>().ok()?
    };
    char::from_u32(code)
}

/// Restores character references in `text`.
///
/// # Example
///
/// ```rust
/// use narou_txt_core::restore_entities;
///
/// assert_eq!(restore_entities("&#65;&#x42;&lt;C&gt;"), "AB<C>");
/// assert_eq!(restore_entities("&unknown;"), "&unknown;");
/// ```
pub fn restore_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    ENTITY_RE.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        let decoded = match body.strip_prefix('#') {
            Some(numeric) => numeric_reference(numeric),
            None => named_entity(body),
        };
        match decoded {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}
