//! Property/index steps and a small parser for access paths such as
//! `pets.name[0]["kind"]`.
use std::fmt;

use serde::Serialize;

use crate::diag::SourceRange;
use crate::error::{ModelError, Result};

/// Filename recorded on ranges produced by [`parse_path`].
pub const PATH_SOURCE: &str = "<path>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IndexKey {
    Number(i64),
    String(String),
}

/// A single traversal step plus the range it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traverser {
    Attr { name: String, range: SourceRange },
    Index { key: IndexKey, range: SourceRange },
}

impl Traverser {
    pub fn attr(name: impl Into<String>, range: SourceRange) -> Self {
        Traverser::Attr { name: name.into(), range }
    }

    pub fn index(key: IndexKey, range: SourceRange) -> Self {
        Traverser::Index { key, range }
    }

    pub fn source_range(&self) -> &SourceRange {
        match self {
            Traverser::Attr { range, .. } | Traverser::Index { range, .. } => range,
        }
    }

    /// Property addressed by this step: attribute names and string keys.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            Traverser::Attr { name, .. } => Some(name),
            Traverser::Index { key: IndexKey::String(s), .. } => Some(s),
            Traverser::Index { key: IndexKey::Number(_), .. } => None,
        }
    }

    pub fn list_index(&self) -> Option<i64> {
        match self {
            Traverser::Index { key: IndexKey::Number(n), .. } => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Traverser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Traverser::Attr { name, .. } => write!(f, ".{name}"),
            Traverser::Index { key: IndexKey::Number(n), .. } => write!(f, "[{n}]"),
            Traverser::Index { key: IndexKey::String(s), .. } => write!(f, "[{s:?}]"),
        }
    }
}

// -------------------------------- Parsing --------------------------------- //

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Split an access path into traversers. Ranges are byte offsets into `src`.
pub fn parse_path(src: &str) -> Result<Vec<Traverser>> {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let err = |offset: usize, reason: &str| ModelError::InvalidPath {
        path: src.to_string(),
        offset,
        reason: reason.to_string(),
    };
    let range = |start: usize, end: usize| SourceRange::single_line(PATH_SOURCE, start as u32, end as u32);

    let mut out = Vec::new();
    let mut i = 0;
    while i < len {
        let start = i;
        if bytes[i] == b'[' {
            i += 1;
            let key = if i < len && bytes[i] == b'"' {
                i += 1;
                let key_start = i;
                while i < len && bytes[i] != b'"' {
                    i += 1;
                }
                if i >= len {
                    return Err(err(start, "unterminated string key"));
                }
                let key = src[key_start..i].to_string();
                i += 1;
                IndexKey::String(key)
            } else {
                let num_start = i;
                if i < len && bytes[i] == b'-' {
                    i += 1;
                }
                while i < len && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let n = src[num_start..i]
                    .parse::<i64>()
                    .map_err(|_| err(num_start, "expected an integer or a quoted key"))?;
                IndexKey::Number(n)
            };
            if i >= len || bytes[i] != b']' {
                return Err(err(i, "expected `]`"));
            }
            i += 1;
            out.push(Traverser::index(key, range(start, i)));
            continue;
        }

        if bytes[i] == b'.' {
            i += 1;
        } else if !out.is_empty() {
            return Err(err(i, "expected `.` or `[`"));
        }
        let name_start = i;
        while i < len && is_ident_byte(bytes[i]) {
            i += 1;
        }
        if name_start == i {
            return Err(err(name_start, "expected a property name"));
        }
        out.push(Traverser::attr(&src[name_start..i], range(start, i)));
    }
    Ok(out)
}
