//! Line-based post-call script language.
//!
//! One directive per line. Blank lines and lines starting with `#` are
//! ignored.
//!
//! ```text
//! # store values for later calls
//! @capture authToken = $.access_token
//! @capture sessionId = headers.X-Session-Id
//! @set authHeader = Bearer {{authToken}}
//! @unset tempVar
//!
//! # check the response
//! @assert status == 200
//! @assert headers.Content-Type contains json
//! @assert $.user.email matches ^[^@]+@example\.com$
//! @assert model.id exists
//! @assert $.user.name == "{{expectedName}}"
//! ```
//!
//! The script is parsed completely before anything runs, so a syntax error
//! never leaves the environment partially updated.

use super::extract::Source;
use super::{PostCallHandler, ScriptContext, ScriptError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Matches: `@capture variableName = source`
static CAPTURE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@capture\s+([A-Za-z_][A-Za-z0-9_.\-]*)\s*=\s*(.+?)\s*$")
        .expect("Failed to compile capture directive regex")
});

/// Matches: `@set variableName = template`
static SET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@set\s+([A-Za-z_][A-Za-z0-9_.\-]*)\s*=\s*(.*?)\s*$")
        .expect("Failed to compile set directive regex")
});

/// Matches: `@unset variableName`
static UNSET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@unset\s+([A-Za-z_][A-Za-z0-9_.\-]*)\s*$")
        .expect("Failed to compile unset directive regex")
});

/// Matches: `@assert source op [expected]`
static ASSERT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@assert\s+(\S+)\s+(==|!=|contains|matches|exists)(?:\s+(.*?))?\s*$")
        .expect("Failed to compile assert directive regex")
});

/// Comparison used by `@assert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertOp {
    Equals,
    NotEquals,
    Contains,
    Matches,
    Exists,
}

impl AssertOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "==" => Some(AssertOp::Equals),
            "!=" => Some(AssertOp::NotEquals),
            "contains" => Some(AssertOp::Contains),
            "matches" => Some(AssertOp::Matches),
            "exists" => Some(AssertOp::Exists),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssertOp::Equals => "==",
            AssertOp::NotEquals => "!=",
            AssertOp::Contains => "contains",
            AssertOp::Matches => "matches",
            AssertOp::Exists => "exists",
        }
    }
}

impl fmt::Display for AssertOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Capture {
        variable: String,
        source: Source,
    },
    Set {
        variable: String,
        template: String,
    },
    Unset {
        variable: String,
    },
    Assert {
        source: Source,
        op: AssertOp,
        /// Template; `None` only for `exists`.
        expected: Option<String>,
    },
}

/// Parses a script into `(line number, directive)` pairs.
///
/// # Errors
///
/// Returns the first malformed line as a [`ScriptError`] carrying its
/// 1-based line number.
pub fn parse_script(script: &str) -> Result<Vec<(usize, Directive)>, ScriptError> {
    let mut directives = Vec::new();

    for (idx, raw) in script.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let directive = parse_directive(line).map_err(|e| e.at_line(line_no))?;
        directives.push((line_no, directive));
    }

    Ok(directives)
}

fn parse_source(source: &str) -> Result<Source, ScriptError> {
    Source::parse(source)
        .ok_or_else(|| ScriptError::new(format!("unknown value source `{}`", source)))
}

fn parse_directive(line: &str) -> Result<Directive, ScriptError> {
    if let Some(caps) = CAPTURE_REGEX.captures(line) {
        return Ok(Directive::Capture {
            variable: caps[1].to_string(),
            source: parse_source(&caps[2])?,
        });
    }

    if let Some(caps) = SET_REGEX.captures(line) {
        return Ok(Directive::Set {
            variable: caps[1].to_string(),
            template: unquote(&caps[2]).to_string(),
        });
    }

    if let Some(caps) = UNSET_REGEX.captures(line) {
        return Ok(Directive::Unset {
            variable: caps[1].to_string(),
        });
    }

    if let Some(caps) = ASSERT_REGEX.captures(line) {
        let source = parse_source(&caps[1])?;
        let op = AssertOp::parse(&caps[2])
            .ok_or_else(|| ScriptError::new(format!("unknown operator `{}`", &caps[2])))?;
        let expected = caps
            .get(3)
            .map(|m| unquote(m.as_str()).to_string())
            .filter(|s| !s.is_empty() || op != AssertOp::Exists);

        match (op, &expected) {
            (AssertOp::Exists, Some(_)) => {
                return Err(ScriptError::new("`exists` takes no expected value"));
            }
            (AssertOp::Exists, None) => {}
            (_, None) => {
                return Err(ScriptError::new(format!("`{}` needs an expected value", op)));
            }
            (AssertOp::Matches, Some(pattern)) if !pattern.contains("{{") => {
                Regex::new(pattern)
                    .map_err(|e| ScriptError::new(format!("invalid pattern: {}", e)))?;
            }
            _ => {}
        }

        return Ok(Directive::Assert {
            source,
            op,
            expected,
        });
    }

    let keyword = line.split_whitespace().next().unwrap_or(line);
    Err(ScriptError::new(format!("unrecognized directive `{}`", keyword)))
}

/// Strips one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// [`PostCallHandler`] for the directive language.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveHandler;

impl DirectiveHandler {
    pub fn new() -> Self {
        Self
    }

    fn apply(&self, directive: &Directive, ctx: &mut ScriptContext<'_>) -> Result<(), ScriptError> {
        match directive {
            Directive::Capture { variable, source } => {
                let value = source.read(ctx)?.ok_or_else(|| {
                    ScriptError::new(format!("no value found for `{}`", variable))
                })?;
                log::debug!("captured {} from {:?}", variable, source);
                ctx.environment.set(variable, value);
            }
            Directive::Set { variable, template } => {
                let value = ctx
                    .environment
                    .process(template)
                    .map_err(|e| ScriptError::new(e.to_string()))?;
                ctx.environment.set(variable, value);
            }
            Directive::Unset { variable } => {
                ctx.environment.remove(variable);
            }
            Directive::Assert {
                source,
                op,
                expected,
            } => {
                let actual = source.read(ctx)?;
                let expected = match expected {
                    Some(template) => Some(
                        ctx.environment
                            .process(template)
                            .map_err(|e| ScriptError::new(e.to_string()))?,
                    ),
                    None => None,
                };
                check(source, *op, actual.as_deref(), expected.as_deref())?;
            }
        }
        Ok(())
    }
}

fn check(
    source: &Source,
    op: AssertOp,
    actual: Option<&str>,
    expected: Option<&str>,
) -> Result<(), ScriptError> {
    let expected_str = expected.unwrap_or_default();

    let passed = match op {
        AssertOp::Exists => actual.is_some(),
        AssertOp::Equals => actual == Some(expected_str),
        AssertOp::NotEquals => actual != Some(expected_str),
        AssertOp::Contains => actual.is_some_and(|a| a.contains(expected_str)),
        AssertOp::Matches => {
            let pattern = Regex::new(expected_str)
                .map_err(|e| ScriptError::new(format!("invalid pattern: {}", e)))?;
            actual.is_some_and(|a| pattern.is_match(a))
        }
    };

    if passed {
        return Ok(());
    }

    let shown = actual.map_or_else(|| "<missing>".to_string(), |a| format!("{:?}", a));
    Err(ScriptError::new(match op {
        AssertOp::Exists => format!("assertion failed: {:?} does not exist", source),
        _ => format!(
            "assertion failed: {:?} {} {:?}, actual {}",
            source, op, expected_str, shown
        ),
    }))
}

impl PostCallHandler for DirectiveHandler {
    fn evaluate(&self, script: &str, ctx: &mut ScriptContext<'_>) -> Result<(), ScriptError> {
        for (line_no, directive) in parse_script(script)? {
            self.apply(&directive, ctx).map_err(|e| e.at_line(line_no))?;
        }
        Ok(())
    }
}
