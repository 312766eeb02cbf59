//! Post-call hooks.
//!
//! After a call's response is attached, its post-call script (if any) is
//! evaluated by a [`PostCallHandler`] against a [`ScriptContext`] exposing:
//!
//! - `apiRequest`: the request that was sent
//! - `apiResponse`: the response
//! - `environment`: the suite environment, writable
//! - `model`: the decoded response, only when the call declares a
//!   [`ModelDescriptor`] and the response is JSON
//!
//! Writes to the environment are visible to every later call in the suite.

pub mod directives;
pub mod extract;
pub mod model;

pub use directives::{AssertOp, Directive, DirectiveHandler};
pub use extract::Source;
pub use model::{BoundModel, ModelDescriptor};

use crate::environment::Environment;
use crate::executor::error::{CallError, CallStep, StepError};
use crate::models::{ResolvedRequest, Response};
use thiserror::Error;

/// Longest script excerpt carried in a [`CallError::ScriptEvaluationFailure`].
const MAX_EXCERPT_CHARS: usize = 80;

/// Failure reported by a script handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .line.map(|l| format!(" (line {})", l)).unwrap_or_default())]
pub struct ScriptError {
    pub message: String,

    /// 1-based script line the failure belongs to, when known.
    pub line: Option<usize>,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Values bound for one script evaluation.
#[derive(Debug)]
pub struct ScriptContext<'a> {
    pub api_request: &'a ResolvedRequest,
    pub api_response: &'a Response,
    pub environment: &'a Environment,
    pub model: Option<BoundModel>,
}

impl<'a> ScriptContext<'a> {
    pub const API_REQUEST: &'static str = "apiRequest";
    pub const API_RESPONSE: &'static str = "apiResponse";
    pub const ENVIRONMENT: &'static str = "environment";
    pub const MODEL: &'static str = "model";

    pub fn new(
        api_request: &'a ResolvedRequest,
        api_response: &'a Response,
        environment: &'a Environment,
        model: Option<BoundModel>,
    ) -> Self {
        Self {
            api_request,
            api_response,
            environment,
            model,
        }
    }

    /// Returns `true` if `name` is bound in this context.
    pub fn has_binding(&self, name: &str) -> bool {
        match name {
            Self::API_REQUEST | Self::API_RESPONSE | Self::ENVIRONMENT => true,
            Self::MODEL => self.model.is_some(),
            _ => false,
        }
    }

    /// Names bound in this context.
    pub fn binding_names(&self) -> Vec<&'static str> {
        let mut names = vec![Self::API_REQUEST, Self::API_RESPONSE, Self::ENVIRONMENT];
        if self.model.is_some() {
            names.push(Self::MODEL);
        }
        names
    }
}

/// Evaluates post-call scripts.
///
/// Any `Fn(&str, &mut ScriptContext) -> Result<(), ScriptError>` closure is a
/// handler:
///
/// ```
/// use api_suite::hooks::{PostCallHandler, ScriptContext, ScriptError};
///
/// let handler = |_script: &str, ctx: &mut ScriptContext<'_>| -> Result<(), ScriptError> {
///     let status = ctx.api_response.status_code().to_string();
///     ctx.environment.set("lastStatus", status);
///     Ok(())
/// };
/// # fn assert_handler<H: PostCallHandler>(_: &H) {}
/// # assert_handler(&handler);
/// ```
pub trait PostCallHandler: Send + Sync {
    fn evaluate(&self, script: &str, ctx: &mut ScriptContext<'_>) -> Result<(), ScriptError>;
}

impl<F> PostCallHandler for F
where
    F: Fn(&str, &mut ScriptContext<'_>) -> Result<(), ScriptError> + Send + Sync,
{
    fn evaluate(&self, script: &str, ctx: &mut ScriptContext<'_>) -> Result<(), ScriptError> {
        self(script, ctx)
    }
}

/// Runs a call's post-call script.
///
/// Does nothing for an empty or whitespace-only script. Otherwise binds the
/// context, decoding the response into `model` when a descriptor is given and
/// the response is JSON, and hands the script to `handler`.
///
/// # Errors
///
/// - [`CallError::ModelDeserializationFailure`] if the body does not decode
///   into the declared model; the script is not run.
/// - [`CallError::ScriptEvaluationFailure`] if the handler fails.
pub fn run_post_script(
    handler: &dyn PostCallHandler,
    script: &str,
    request: &ResolvedRequest,
    response: &Response,
    environment: &Environment,
    model: Option<&ModelDescriptor>,
) -> Result<(), StepError> {
    if script.trim().is_empty() {
        return Ok(());
    }

    let bound = match model {
        Some(descriptor) if response.is_json() => {
            let decoded = descriptor.decode(response.body_bytes()).map_err(|source| {
                StepError::new(
                    CallStep::ModelDeserialization,
                    CallError::ModelDeserializationFailure {
                        model: descriptor.type_name().to_string(),
                        source,
                    },
                )
            })?;
            Some(decoded)
        }
        Some(descriptor) => {
            log::debug!(
                "not binding model {}: response content type is {:?}",
                descriptor.type_name(),
                response.content_type()
            );
            None
        }
        None => None,
    };

    let mut ctx = ScriptContext::new(request, response, environment, bound);

    handler.evaluate(script, &mut ctx).map_err(|source| {
        log::warn!("post-call script failed: {}", source);
        StepError::new(
            CallStep::PostCallScript,
            CallError::ScriptEvaluationFailure {
                excerpt: excerpt(script, source.line),
                source,
            },
        )
    })
}

/// The failing line when known, else the first non-blank line, truncated.
fn excerpt(script: &str, line: Option<usize>) -> String {
    let text = line
        .and_then(|n| script.lines().nth(n.saturating_sub(1)))
        .or_else(|| script.lines().find(|l| !l.trim().is_empty()))
        .unwrap_or_default()
        .trim();

    if text.chars().count() > MAX_EXCERPT_CHARS {
        let truncated: String = text.chars().take(MAX_EXCERPT_CHARS).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    }
}
