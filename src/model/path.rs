//! `google.api.http` path templates
//!
//! Templates follow the grammar from `google/api/http.proto`:
//!
//! ```text
//! Template = "/" Segments [ Verb ] ;
//! Segments = Segment { "/" Segment } ;
//! Segment  = "*" | "**" | LITERAL | Variable ;
//! Variable = "{" FieldPath [ "=" Segments ] "}" ;
//! Verb     = ":" LITERAL ;
//! ```
//!
//! and are converted to axum route syntax (`/{id}`, `/{*rest}`). Only the
//! subset axum can express is accepted.

use thiserror::Error;

/// Reasons a path template is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The template is empty
    #[error("path template is empty")]
    Empty,
    /// A `{` without `}` or the other way around
    #[error("unbalanced braces in path template `{0}`")]
    UnbalancedBraces(String),
    /// `{user.id}`; only top-level fields can be bound
    #[error("nested field path `{0}` cannot be bound to a route parameter")]
    NestedField(String),
    /// A variable name that is not a valid identifier
    #[error("invalid path parameter name `{0}`")]
    InvalidIdentifier(String),
    /// `*` or `**` outside a variable
    #[error("wildcard `{0}` must be bound to a variable, e.g. `{{name={0}}}`")]
    BareWildcard(String),
    /// A literal segment with characters axum cannot route
    #[error("invalid literal segment `{0}`")]
    InvalidLiteral(String),
    /// A catch-all followed by more segments
    #[error("catch-all parameter `{0}` must be the last segment")]
    CatchAllNotLast(String),
    /// A custom verb not preceded by a literal segment
    #[error("custom verb `:{0}` must follow a literal segment")]
    MisplacedVerb(String),
    /// The same parameter used twice
    #[error("path parameter `{0}` is used more than once")]
    DuplicateParameter(String),
}

/// One segment of a converted route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteSegment {
    /// Matched verbatim
    Literal(String),
    /// Matches exactly one segment, bound to the named field
    Param(String),
    /// Matches the rest of the path, bound to the named field
    CatchAll(String),
}

/// A parsed and validated path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<RouteSegment>,
    verb: Option<String>,
}

enum Token {
    Literal(String),
    Variable { name: String, pattern: Option<String> },
}

impl PathTemplate {
    /// Parse a template such as `/v1/{name=projects/*}/books:batchGet`
    pub fn parse(template: &str) -> Result<Self, PathError> {
        let template = template.trim();
        if template.is_empty() {
            return Err(PathError::Empty);
        }

        let (path, verb) = split_verb(template)?;
        let mut segments = Vec::new();
        for token in tokenize(path, template)? {
            match token {
                Token::Literal(literal) => segments.push(literal_segment(&literal)?),
                Token::Variable { name, pattern } => {
                    validate_name(&name)?;
                    segments.extend(variable_segments(name, pattern.as_deref())?);
                }
            }
        }

        let last = segments.len().saturating_sub(1);
        let mut seen: Vec<&str> = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            let name = match segment {
                RouteSegment::Literal(_) => continue,
                RouteSegment::Param(name) => name,
                RouteSegment::CatchAll(name) => {
                    if i != last {
                        return Err(PathError::CatchAllNotLast(name.clone()));
                    }
                    name
                }
            };
            if seen.contains(&name.as_str()) {
                return Err(PathError::DuplicateParameter(name.clone()));
            }
            seen.push(name);
        }

        if let Some(verb) = &verb {
            if !matches!(segments.last(), Some(RouteSegment::Literal(_))) {
                return Err(PathError::MisplacedVerb(verb.clone()));
            }
        }

        Ok(Self { segments, verb })
    }

    /// Route segments in path order
    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// Custom verb, without the leading `:`
    pub fn verb(&self) -> Option<&str> {
        self.verb.as_deref()
    }

    /// Names of the bound parameters in path order
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            RouteSegment::Literal(_) => None,
            RouteSegment::Param(name) | RouteSegment::CatchAll(name) => Some(name.as_str()),
        })
    }

    /// The route in axum syntax, e.g. `/files/{*path}`
    pub fn axum_route(&self) -> String {
        self.render(|segment| match segment {
            RouteSegment::Literal(literal) => literal.clone(),
            RouteSegment::Param(name) => format!("{{{}}}", name),
            RouteSegment::CatchAll(name) => format!("{{*{}}}", name),
        })
    }

    /// The route in swagger syntax, e.g. `/files/{path}`
    pub fn swagger_path(&self) -> String {
        self.render(|segment| match segment {
            RouteSegment::Literal(literal) => literal.clone(),
            RouteSegment::Param(name) | RouteSegment::CatchAll(name) => format!("{{{}}}", name),
        })
    }

    fn render(&self, segment: impl Fn(&RouteSegment) -> String) -> String {
        let mut out = String::new();
        for s in &self.segments {
            out.push('/');
            out.push_str(&segment(s));
        }
        if out.is_empty() {
            out.push('/');
        }
        if let Some(verb) = &self.verb {
            out.push(':');
            out.push_str(verb);
        }
        out
    }
}

/// Split a trailing `:verb` (outside any variable) off the template
fn split_verb(template: &str) -> Result<(&str, Option<String>), PathError> {
    let mut depth = 0usize;
    for (i, c) in template.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                let verb = &template[i + 1..];
                if verb.is_empty()
                    || !verb
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
                {
                    return Err(PathError::InvalidLiteral(format!(":{}", verb)));
                }
                return Ok((&template[..i], Some(verb.to_string())));
            }
            _ => {}
        }
    }
    Ok((template, None))
}

fn tokenize(path: &str, template: &str) -> Result<Vec<Token>, PathError> {
    let unbalanced = || PathError::UnbalancedBraces(template.to_string());
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = path.chars();

    let flush = |literal: &mut String, tokens: &mut Vec<Token>| {
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(literal)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '/' => flush(&mut literal, &mut tokens),
            '{' => {
                flush(&mut literal, &mut tokens);
                let mut body = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(unbalanced()),
                        Some(c) => body.push(c),
                    }
                }
                let (name, pattern) = match body.split_once('=') {
                    Some((name, pattern)) => {
                        (name.trim().to_string(), Some(pattern.trim().to_string()))
                    }
                    None => (body.trim().to_string(), None),
                };
                tokens.push(Token::Variable { name, pattern });
            }
            '}' => return Err(unbalanced()),
            c => literal.push(c),
        }
    }
    flush(&mut literal, &mut tokens);
    Ok(tokens)
}

fn literal_segment(literal: &str) -> Result<RouteSegment, PathError> {
    if literal == "*" || literal == "**" {
        return Err(PathError::BareWildcard(literal.to_string()));
    }
    if literal.contains('*') {
        return Err(PathError::InvalidLiteral(literal.to_string()));
    }
    Ok(RouteSegment::Literal(literal.to_string()))
}

fn validate_name(name: &str) -> Result<(), PathError> {
    if name.contains('.') {
        return Err(PathError::NestedField(name.to_string()));
    }
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PathError::InvalidIdentifier(name.to_string()))
    }
}

/// Segments produced by `{name=pattern}`
fn variable_segments(name: String, pattern: Option<&str>) -> Result<Vec<RouteSegment>, PathError> {
    let parts: Vec<&str> = match pattern {
        None => return Ok(vec![RouteSegment::Param(name)]),
        Some(pattern) => pattern.split('/').filter(|p| !p.is_empty()).collect(),
    };
    if parts.is_empty() {
        return Err(PathError::InvalidLiteral(format!("{{{}=}}", name)));
    }
    for part in &parts {
        if part.contains('*') && *part != "*" && *part != "**" {
            return Err(PathError::InvalidLiteral((*part).to_string()));
        }
    }

    let is_wildcard = |part: &&str| *part == "*" || *part == "**";
    let first_wildcard = parts.iter().position(is_wildcard);
    let wildcards = parts.iter().filter(|part| is_wildcard(*part)).count();

    let mut segments: Vec<RouteSegment> = parts
        .iter()
        .take(first_wildcard.unwrap_or(parts.len()))
        .map(|part| RouteSegment::Literal((*part).to_string()))
        .collect();

    match first_wildcard {
        // `{version=v1}` binds nothing
        None => {}
        Some(index) if index == parts.len() - 1 && wildcards == 1 => {
            if parts[index] == "*" {
                segments.push(RouteSegment::Param(name));
            } else {
                segments.push(RouteSegment::CatchAll(name));
            }
        }
        Some(_) => segments.push(RouteSegment::CatchAll(name)),
    }
    Ok(segments)
}
