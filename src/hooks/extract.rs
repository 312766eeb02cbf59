//! Value extraction for post-call directives.
//!
//! A [`Source`] names a value reachable from a [`ScriptContext`]: part of the
//! response, part of the request that was sent, the bound model, or an
//! environment variable. JSON values are addressed with a small JSONPath
//! subset:
//!
//! ```text
//! $                   the whole document
//! $.user.name         object fields
//! $.items[0].id       array indexes
//! $['content-type']   quoted keys
//! ```

use super::{ScriptContext, ScriptError};
use serde_json::Value as JsonValue;

/// A value reference used by `@capture` and `@assert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Response status code.
    Status,
    /// Response reason phrase.
    StatusText,
    /// Response body as text.
    Body,
    /// First value of a response header (`headers.Name`).
    ResponseHeader(String),
    /// JSONPath into the response body (`$...`).
    ResponseJson(String),
    /// JSONPath into the bound model (`model`, `model.field`).
    Model(String),
    /// Method of the sent request.
    RequestMethod,
    /// Final URL of the sent request.
    RequestUrl,
    /// Body of the sent request.
    RequestBody,
    /// Header of the sent request (`request.headers.Name`).
    RequestHeader(String),
    /// Environment variable (`env.name`).
    Env(String),
}

impl Source {
    /// Parses a source reference. Returns `None` for unknown forms.
    pub fn parse(source: &str) -> Option<Self> {
        let source = source.trim();

        match source {
            "status" => return Some(Source::Status),
            "statusText" => return Some(Source::StatusText),
            "body" => return Some(Source::Body),
            "model" => return Some(Source::Model("$".to_string())),
            "request.method" => return Some(Source::RequestMethod),
            "request.url" => return Some(Source::RequestUrl),
            "request.body" => return Some(Source::RequestBody),
            _ => {}
        }

        if source.starts_with('$') {
            return Some(Source::ResponseJson(source.to_string()));
        }

        if let Some(rest) = source.strip_prefix("model") {
            if rest.starts_with('.') || rest.starts_with('[') {
                return Some(Source::Model(format!("${}", rest)));
            }
            return None;
        }

        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());

        if let Some(name) = source.strip_prefix("request.headers.") {
            return non_empty(name).map(Source::RequestHeader);
        }
        if let Some(name) = source.strip_prefix("headers.") {
            return non_empty(name).map(Source::ResponseHeader);
        }
        if let Some(name) = source.strip_prefix("env.") {
            return non_empty(name).map(Source::Env);
        }

        None
    }

    /// Reads the value from `ctx`.
    ///
    /// Returns `Ok(None)` when the referenced value does not exist (missing
    /// header, path or variable).
    ///
    /// # Errors
    ///
    /// Fails when the response body is not JSON for a `$` path, when a path
    /// is malformed, or when the model is referenced but not bound.
    pub fn read(&self, ctx: &ScriptContext<'_>) -> Result<Option<String>, ScriptError> {
        let response = ctx.api_response;
        let request = ctx.api_request;

        let value = match self {
            Source::Status => Some(response.status_code().to_string()),
            Source::StatusText => response.status_text().map(str::to_string),
            Source::Body => Some(response.text().to_string()),
            Source::ResponseHeader(name) => response.header(name).map(str::to_string),
            Source::ResponseJson(path) => {
                let json = response.json().map_err(|e| {
                    ScriptError::new(format!("response body is not valid JSON: {}", e))
                })?;
                evaluate_json_path(&json, path)?.map(json_value_to_string)
            }
            Source::Model(path) => {
                let model = ctx.model.as_ref().ok_or_else(|| {
                    ScriptError::new("`model` is not bound for this response")
                })?;
                evaluate_json_path(model.json(), path)?.map(json_value_to_string)
            }
            Source::RequestMethod => Some(request.method.to_string()),
            Source::RequestUrl => Some(request.url.clone()),
            Source::RequestBody => request.body.clone(),
            Source::RequestHeader(name) => request.header(name).map(str::to_string),
            Source::Env(name) => ctx.environment.get(name),
        };

        Ok(value)
    }
}

/// A segment in a JSONPath expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object field access (e.g., "user", "name")
    Field(String),

    /// Array index access (e.g., [0], [5])
    Index(usize),
}

/// Parses a JSONPath expression into segments.
///
/// - `$.user.name` -> `[Field("user"), Field("name")]`
/// - `$.items[0].id` -> `[Field("items"), Index(0), Field("id")]`
/// - `$['a.b']` -> `[Field("a.b")]`
pub fn parse_json_path(path: &str) -> Result<Vec<PathSegment>, ScriptError> {
    let trimmed = path.trim();
    let body = trimmed
        .strip_prefix('$')
        .ok_or_else(|| ScriptError::new(format!("JSON path `{}` must start with `$`", path)))?;

    let invalid = |reason: &str| ScriptError::new(format!("invalid JSON path `{}`: {}", path, reason));

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(std::mem::take(&mut current)));
                }

                match chars.peek().copied() {
                    Some(quote @ ('\'' | '"')) => {
                        chars.next();
                        let mut key = String::new();
                        loop {
                            match chars.next() {
                                Some(c) if c == quote => break,
                                Some(c) => key.push(c),
                                None => return Err(invalid("unterminated quoted key")),
                            }
                        }
                        if chars.next() != Some(']') {
                            return Err(invalid("expected `]` after quoted key"));
                        }
                        segments.push(PathSegment::Field(key));
                    }
                    _ => {
                        let mut index = String::new();
                        loop {
                            match chars.next() {
                                Some(']') => break,
                                Some(c) => index.push(c),
                                None => return Err(invalid("unterminated index")),
                            }
                        }
                        let index = index
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| invalid("index must be a non-negative integer"))?;
                        segments.push(PathSegment::Index(index));
                    }
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Field(current));
    }

    Ok(segments)
}

/// Evaluates a JSONPath expression against `json`.
///
/// Returns `Ok(None)` if the path does not exist in the document.
pub fn evaluate_json_path<'a>(
    json: &'a JsonValue,
    path: &str,
) -> Result<Option<&'a JsonValue>, ScriptError> {
    let segments = parse_json_path(path)?;

    let found = segments.iter().try_fold(json, |current, segment| match segment {
        PathSegment::Field(name) => current.get(name.as_str()),
        PathSegment::Index(index) => current.get(*index),
    });

    Ok(found)
}

/// Converts a JSON value to its string form.
///
/// - Strings: returned as-is (without quotes)
/// - Numbers, booleans, null: converted to string
/// - Objects, arrays: serialized as compact JSON
pub fn json_value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => "null".to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}
