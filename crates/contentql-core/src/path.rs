//! Names and paths.
//!
//! Canonical string forms omit the same-name-sibling index when it is 1,
//! so `/a[1]/b` and `/a/b` render (and are indexed) identically.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// A possibly prefixed name such as `jcr:title`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    /// Namespace prefix; empty for the default namespace
    pub prefix: String,
    /// Local part
    pub local: String,
}

impl Name {
    /// Creates a name from a prefix and a local part.
    pub fn new(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            local: local.into(),
        }
    }

    /// Parses `prefix:local` or `local`.
    pub fn parse(text: &str) -> Result<Self, ConvertError> {
        let invalid = || ConvertError::CannotConvert {
            value: text.to_string(),
            target: "NAME".to_string(),
        };
        if text.is_empty() || text.contains('/') || text.contains('[') || text.contains(']') {
            return Err(invalid());
        }
        match text.split_once(':') {
            Some((prefix, local)) => {
                if local.is_empty() || local.contains(':') {
                    return Err(invalid());
                }
                Ok(Name::new(prefix, local))
            }
            None => Ok(Name::new("", text)),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{}:{}", self.prefix, self.local)
        }
    }
}

impl FromStr for Name {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::parse(s)
    }
}

/// One step of a path: a name plus its 1-based same-name-sibling index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: Name,
    pub index: u32,
}

impl Segment {
    /// Creates a segment.
    pub fn new(name: Name, index: u32) -> Self {
        Self { name, index }
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.index != 1 {
            write!(f, "[{}]", self.index)?;
        }
        Ok(())
    }
}

/// An absolute or relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    pub absolute: bool,
    pub segments: Vec<Segment>,
}

impl Path {
    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            absolute: true,
            segments: Vec::new(),
        }
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    /// Number of segments; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The parent path, or `None` for the root and empty relative paths.
    pub fn parent(&self) -> Option<Path> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Path {
            absolute: self.absolute,
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Parses `/a/b[2]/c` style paths.
    pub fn parse(text: &str) -> Result<Self, ConvertError> {
        let invalid = || ConvertError::CannotConvert {
            value: text.to_string(),
            target: "PATH".to_string(),
        };
        if text.is_empty() {
            return Err(invalid());
        }
        if text == "/" {
            return Ok(Path::root());
        }

        let absolute = text.starts_with('/');
        let body = if absolute { &text[1..] } else { text };
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        for part in body.split('/') {
            if part.is_empty() {
                return Err(invalid());
            }
            let (name, index) = match part.find('[') {
                Some(open) => {
                    let digits = part[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
                    let index: u32 = digits.parse().map_err(|_| invalid())?;
                    if index == 0 {
                        return Err(invalid());
                    }
                    (&part[..open], index)
                }
                None => (part, 1),
            };
            let name = Name::parse(name).map_err(|_| invalid())?;
            segments.push(Segment::new(name, index));
        }

        Ok(Path { absolute, segments })
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        // Absolute paths sort ahead of relative ones, then segment by segment.
        other
            .absolute
            .cmp(&self.absolute)
            .then_with(|| self.segments.cmp(&other.segments))
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 || self.absolute {
                write!(f, "/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

/// How the backend orders indexed strings when evaluating a range.
///
/// Paths and names are stored in canonical string form, but their order
/// is not the plain byte order of that form: `/a/b[10]` sorts before
/// `/a/b[9]` under byte order yet after it segment-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueOrder {
    /// Plain lexicographic order
    Lexical,
    /// Prefix, then local name
    Name,
    /// Segment-wise: name, then same-name-sibling index
    Path,
}

impl ValueOrder {
    /// Compares two canonical strings under this order.
    ///
    /// Strings that do not parse under a structured order fall back to
    /// lexicographic comparison so the order stays total.
    pub fn compare(&self, left: &str, right: &str) -> Ordering {
        match self {
            ValueOrder::Lexical => left.cmp(right),
            ValueOrder::Name => match (Name::parse(left), Name::parse(right)) {
                (Ok(l), Ok(r)) => l.cmp(&r),
                _ => left.cmp(right),
            },
            ValueOrder::Path => match (Path::parse(left), Path::parse(right)) {
                (Ok(l), Ok(r)) => l.cmp(&r),
                _ => left.cmp(right),
            },
        }
    }
}
