//! Route declarations and path template compilation.
//!
//! A path template mixes literal text with `:name` placeholders, e.g.
//! `group/:nickname/members`. Templates compile two ways:
//! - into an anchored regex with one named group per placeholder (forward)
//! - into a [`Format`] of literal parts and positional slots (reverse)
//!
//! Literal text is regex-escaped, so the `.` in `version.:format` only
//! matches a dot. Templates are never read as partial regexes.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::error::DeclarationError;

/// Argument key naming the action a route dispatches to.
pub const ACTION: &str = "action";

/// Pattern used for placeholders without an explicit constraint.
pub const DEFAULT_PARAM_PATTERN: &str = "[^/]+";

/// Route arguments and matched parameters.
pub type Params = BTreeMap<String, String>;

/// Placeholder name to regex fragment.
pub type Patterns = BTreeMap<String, String>;

/// Build a [`Params`] map from string pairs.
pub fn params<const N: usize>(pairs: [(&str, &str); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// One `connect` call, kept verbatim so a table can be snapshotted and replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub path: String,
    pub args: Params,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub patterns: Patterns,
    /// Media types gating forward matching. Empty means unconditional.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accept: Vec<String>,
}

impl Declaration {
    pub fn new(path: impl Into<String>, args: Params) -> Self {
        Self {
            path: path.into(),
            args,
            patterns: Patterns::new(),
            accept: Vec::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: Patterns) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_accept(mut self, types: &[&str]) -> Self {
        self.accept = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn action(&self) -> Option<&str> {
        self.args.get(ACTION).map(String::as_str)
    }
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Split a template into literal runs and placeholders.
///
/// A `:` not followed by an identifier start stays literal.
fn segments(path: &str) -> Vec<Segment<'_>> {
    let bytes = path.as_bytes();
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b':' && i + 1 < bytes.len() && is_ident_start(bytes[i + 1]) {
            if literal_start < i {
                out.push(Segment::Literal(&path[literal_start..i]));
            }
            let name_start = i + 1;
            let mut end = name_start + 1;
            while end < bytes.len() && is_ident_continue(bytes[end]) {
                end += 1;
            }
            out.push(Segment::Placeholder(&path[name_start..end]));
            i = end;
            literal_start = end;
        } else {
            i += 1;
        }
    }
    if literal_start < bytes.len() {
        out.push(Segment::Literal(&path[literal_start..]));
    }
    out
}

/// Placeholder names of a template, in order of appearance.
pub fn placeholder_names(path: &str) -> Vec<String> {
    segments(path)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Placeholder(name) => Some(name.to_string()),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Regex source for a template. Literal text is escaped.
pub fn regex_source(path: &str, patterns: &Patterns) -> String {
    let mut source = String::with_capacity(path.len() + 16);
    source.push('^');
    for seg in segments(path) {
        match seg {
            Segment::Literal(text) => source.push_str(&regex::escape(text)),
            Segment::Placeholder(name) => {
                let pattern = patterns
                    .get(name)
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_PARAM_PATTERN);
                let _ = write!(source, "(?P<{}>{})", name, pattern);
            }
        }
    }
    source.push('$');
    source
}

/// Part of a reverse-generation template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatPart {
    Literal(String),
    Slot,
}

/// Template with positional slots, filled in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    parts: Vec<FormatPart>,
}

impl Format {
    pub fn parse(path: &str) -> Self {
        let parts = segments(path)
            .into_iter()
            .map(|seg| match seg {
                Segment::Literal(text) => FormatPart::Literal(text.to_string()),
                Segment::Placeholder(_) => FormatPart::Slot,
            })
            .collect();
        Self { parts }
    }

    pub fn slots(&self) -> usize {
        self.parts
            .iter()
            .filter(|p| matches!(p, FormatPart::Slot))
            .count()
    }

    /// Substitute `values` into the slots. Missing values render empty.
    pub fn render(&self, values: &[&str]) -> String {
        let mut out = String::new();
        let mut values = values.iter();
        for part in &self.parts {
            match part {
                FormatPart::Literal(text) => out.push_str(text),
                FormatPart::Slot => out.push_str(values.next().copied().unwrap_or_default()),
            }
        }
        out
    }
}

/// A dynamic route ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    path: String,
    source: String,
    regex: Regex,
    args: Params,
    param_names: Vec<String>,
}

impl CompiledRoute {
    /// Compile a template. `args` must already have placeholder values migrated out.
    pub fn compile(
        path: &str,
        args: Params,
        param_names: Vec<String>,
        patterns: &Patterns,
    ) -> Result<Self, DeclarationError> {
        let source = regex_source(path, patterns);
        let regex = Regex::new(&source).map_err(|source| DeclarationError::InvalidPattern {
            path: path.to_string(),
            source,
        })?;
        Ok(Self {
            path: path.to_string(),
            source,
            regex,
            args,
            param_names,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The regex source, used as the identity of a compiled pattern.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn args(&self) -> &Params {
        &self.args
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Fixed args overlaid with the captured placeholder values.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut result = self.args.clone();
        for name in &self.param_names {
            if let Some(m) = caps.name(name) {
                result.insert(name.clone(), m.as_str().to_string());
            }
        }
        Some(result)
    }
}

/// Coercing equality for argument values.
///
/// Identical strings are equal; so are two strings that both read as finite
/// numbers with the same value (`"1"`, `"01"`, `"1.0"`).
pub fn loose_eq(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn as_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
