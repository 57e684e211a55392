//! Row regular expressions applied as scan post-filters.

use regex::bytes::Regex;

use crate::codec::{Position, TableLayout, HASH_PREFIX_LEN};
use crate::error::Error;

/// A regular expression over stored keys of one table.
///
/// The expression is anchored and follows the key layout:
/// `[hash]? first 0x00 second 0x00 third 0x01 column_family 0x01 qualifier`.
/// It only means something for the layout and hash mode it was built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowRegex {
    layout: TableLayout,
    hashed: bool,
    pattern: String,
}

impl RowRegex {
    /// Wrap an already assembled expression for keys of `layout`.
    pub fn new(layout: TableLayout, hashed: bool, pattern: impl Into<String>) -> Self {
        Self {
            layout,
            hashed,
            pattern: pattern.into(),
        }
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    pub fn is_hashed(&self) -> bool {
        self.hashed
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Compile for matching against raw keys.
    pub fn compile(&self) -> Result<Regex, Error> {
        Ok(Regex::new(&self.pattern)?)
    }
}

/// Per-position regexes requested by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RegexParts<'a> {
    pub subject: Option<&'a str>,
    pub predicate: Option<&'a str>,
    pub object: Option<&'a str>,
    pub context: Option<&'a str>,
    pub object_marker: Option<u8>,
}

impl RegexParts<'_> {
    fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.predicate.is_none()
            && self.object.is_none()
            && self.context.is_none()
            && self.object_marker.is_none()
    }
}

/// Assemble the key regex for a layout.
pub(crate) fn assemble(
    layout: TableLayout,
    hashed: bool,
    parts: RegexParts<'_>,
) -> Option<RowRegex> {
    if parts.is_empty() {
        return None;
    }

    let mut pattern = String::from("(?s)^");
    if hashed {
        pattern.push_str(&format!("[0-9a-f]{{{}}}", HASH_PREFIX_LEN));
    }

    for (i, position) in layout.order().into_iter().enumerate() {
        let terminal = i == 2;
        let any = if terminal { r"[^\x01]*" } else { r"[^\x00]*" };
        match position {
            Position::Subject => push_group(&mut pattern, parts.subject, any),
            Position::Predicate => push_group(&mut pattern, parts.predicate, any),
            Position::Object => {
                match parts.object_marker {
                    Some(marker) => {
                        pattern.push_str(&regex::escape(&char::from(marker).to_string()))
                    }
                    None if parts.object.is_some() => pattern.push('.'),
                    None => {}
                }
                push_group(&mut pattern, parts.object, any);
            }
        }
        if !terminal {
            pattern.push_str(r"\x00");
        }
    }

    pattern.push_str(r"\x01");
    push_group(&mut pattern, parts.context, r"[^\x01]*");
    pattern.push_str(r"\x01.*$");

    Some(RowRegex::new(layout, hashed, pattern))
}

fn push_group(pattern: &mut String, part: Option<&str>, any: &str) {
    match part {
        Some(re) => {
            pattern.push_str("(?:");
            pattern.push_str(re);
            pattern.push(')');
        }
        None => pattern.push_str(any),
    }
}
