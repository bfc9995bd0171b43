//! Scanner for `${env:NAME}` and `${ref:dotted.path}` placeholders.
//!
//! The grammar is exact: `${`, the tag (`env` or `ref`), `:`, a non-empty
//! payload without whitespace, `}`. Anything else is plain text.

use std::fmt;

/// Which placeholder grammar matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    /// `${env:NAME}`: process environment lookup.
    Env,
    /// `${ref:dotted.path}`: lookup inside the root document.
    Ref,
}

impl PlaceholderKind {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Ref => "ref",
        }
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single placeholder borrowed from the scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub kind: PlaceholderKind,
    /// Variable name for `env`, dotted path for `ref`.
    pub payload: &'a str,
}

impl fmt::Display for Placeholder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}:{}}}", self.kind, self.payload)
    }
}

/// A piece of a scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Placeholder(Placeholder<'a>),
}

/// Split `input` into literal text and placeholders, in order.
///
/// Adjacent text is never split, so a string without placeholders yields a
/// single `Text` segment (or nothing when `input` is empty).
#[must_use]
pub fn scan(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = input[cursor..].find("${") {
        let start = cursor + offset;
        match parse_at(&input[start..]) {
            Some((placeholder, len)) => {
                if start > text_start {
                    segments.push(Segment::Text(&input[text_start..start]));
                }
                segments.push(Segment::Placeholder(placeholder));
                cursor = start + len;
                text_start = cursor;
            },
            None => cursor = start + 2,
        }
    }

    if text_start < input.len() {
        segments.push(Segment::Text(&input[text_start..]));
    }
    segments
}

/// Returns the placeholder when `input` consists of exactly one placeholder
/// and nothing else.
#[must_use]
pub fn whole(input: &str) -> Option<Placeholder<'_>> {
    match scan(input).as_slice() {
        [Segment::Placeholder(p)] => Some(*p),
        _ => None,
    }
}

/// Returns `true` if `input` still carries a `${env:` or `${ref:` opener,
/// well-formed or not.
#[must_use]
pub fn has_marker(input: &str) -> bool {
    input.contains("${env:") || input.contains("${ref:")
}

/// Try to parse a placeholder at the very start of `input`. Returns it with
/// the number of bytes consumed.
fn parse_at(input: &str) -> Option<(Placeholder<'_>, usize)> {
    let body = input.strip_prefix("${")?;
    let (kind, rest) = if let Some(rest) = body.strip_prefix("env:") {
        (PlaceholderKind::Env, rest)
    } else if let Some(rest) = body.strip_prefix("ref:") {
        (PlaceholderKind::Ref, rest)
    } else {
        return None;
    };

    let close = rest.find('}')?;
    let payload = &rest[..close];
    if payload.is_empty()
        || payload
            .chars()
            .any(|c| c.is_whitespace() || c == '$' || c == '{')
    {
        return None;
    }

    // "${" + "env:" + payload + "}"
    let consumed = 2 + kind.tag().len() + 1 + close + 1;
    Some((Placeholder { kind, payload }, consumed))
}
