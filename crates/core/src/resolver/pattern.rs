//! Output name patterns.

use std::fmt::Write as _;
use thiserror::Error;

/// Pattern used when a configured one cannot be rendered.
pub const FALLBACK_PATTERN: &str = "{name}_{index}";

/// Errors raised while parsing a rename pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),

    #[error("Unsupported format spec {spec:?} for {{{field}}}")]
    UnsupportedSpec { field: String, spec: String },

    #[error("Unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Ext,
    Index,
    Date,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "ext" => Some(Self::Ext),
            "index" => Some(Self::Index),
            "date" => Some(Self::Date),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { field: Field, width: Option<usize> },
}

/// Values substituted into a pattern.
#[derive(Debug, Clone, Copy)]
pub struct NameContext<'a> {
    /// Source file stem.
    pub name: &'a str,
    /// Source extension, lowercase, without a dot.
    pub ext: &'a str,
    pub index: u64,
    /// Run start date as `YYYYMMDD`.
    pub date: &'a str,
}

/// A parsed rename pattern such as `{name}_{index:03}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePattern {
    segments: Vec<Segment>,
}

impl RenamePattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(PatternError::UnbalancedBrace(pos)),
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        if inner == '{' {
                            return Err(PatternError::UnbalancedBrace(pos));
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(PatternError::UnbalancedBrace(pos));
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Self::parse_placeholder(&body)?);
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    fn parse_placeholder(body: &str) -> Result<Segment, PatternError> {
        let (name, spec) = match body.split_once(':') {
            Some((name, spec)) => (name.trim(), Some(spec.trim())),
            None => (body.trim(), None),
        };

        let field =
            Field::parse(name).ok_or_else(|| PatternError::UnknownPlaceholder(name.to_string()))?;

        let width = match spec {
            None | Some("") => None,
            Some(spec) => {
                let digits = spec.strip_suffix('d').unwrap_or(spec);
                match (field, digits.parse::<usize>()) {
                    (Field::Index, Ok(width)) if width <= 32 => Some(width),
                    _ => {
                        return Err(PatternError::UnsupportedSpec {
                            field: name.to_string(),
                            spec: spec.to_string(),
                        })
                    }
                }
            }
        };

        Ok(Segment::Placeholder { field, width })
    }

    /// The pattern used when a configured one fails to parse.
    pub fn fallback() -> Self {
        Self {
            segments: vec![
                Segment::Placeholder {
                    field: Field::Name,
                    width: None,
                },
                Segment::Literal("_".to_string()),
                Segment::Placeholder {
                    field: Field::Index,
                    width: None,
                },
            ],
        }
    }

    pub fn render(&self, ctx: &NameContext<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { field, width } => match field {
                    Field::Name => out.push_str(ctx.name),
                    Field::Ext => out.push_str(ctx.ext),
                    Field::Date => out.push_str(ctx.date),
                    Field::Index => {
                        let _ = match width {
                            Some(w) => write!(out, "{:0width$}", ctx.index, width = *w),
                            None => write!(out, "{}", ctx.index),
                        };
                    }
                },
            }
        }
        out
    }
}
