//! URL templates.
//!
//! A template such as `admin/user/{Id}/posts` is a path with named
//! placeholders. Rendering substitutes each placeholder with the
//! parameter string of the matching field. Matching ignores case and
//! `_`/`-` separators, so `{UserId}` resolves against a `user_id` field.

use crate::error::{CodecError, CodecResult};
use crate::naming::normalize_key;
use crate::value::{Payload, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    /// Parses a template.
    ///
    /// Fails with [`CodecError::MalformedTemplate`] on an unclosed or empty
    /// placeholder.
    pub fn parse(source: &str) -> CodecResult<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }
            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            let name = name.trim().to_string();
            if !closed || name.is_empty() {
                return Err(CodecError::malformed_template(source));
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(name));
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template text as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the placeholders, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Renders the template against serialized field values.
    ///
    /// Every placeholder must resolve; otherwise the render fails with
    /// [`CodecError::UnresolvedPlaceholder`].
    pub fn render(&self, fields: &Payload) -> CodecResult<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let wanted = normalize_key(name);
                    let value = fields
                        .iter()
                        .find(|(key, _)| normalize_key(key) == wanted)
                        .map(|(_, value)| value)
                        .ok_or_else(|| CodecError::unresolved_placeholder(name, &self.source))?;
                    out.push_str(&value.to_param_string());
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses and renders a template in one step.
pub fn render_template(template: &str, fields: &Payload) -> CodecResult<String> {
    UrlTemplate::parse(template)?.render(fields)
}

/// Joins path segments with `/`, dropping blank ones (null, `false`, empty
/// text). Numeric segments are kept even when zero.
pub fn join_path<I, V>(segments: I) -> String
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    segments
        .into_iter()
        .map(Into::into)
        .filter(|v| !v.is_blank_segment())
        .map(|v| v.to_param_string())
        .collect::<Vec<_>>()
        .join("/")
}
