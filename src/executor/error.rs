//! Call execution error types.
//!
//! [`TransportError`] covers failures reported by the HTTP transport.
//! [`CallError`] is the closed set of ways a call can fail; the pipeline wraps
//! it in a [`StepError`] naming the step that failed, and the suite runner
//! turns that into a [`CallFailure`] naming the call as well.

use crate::hooks::ScriptError;
use crate::variables::TemplateError;
use std::fmt;
use thiserror::Error;

/// Underlying cause carried by a [`TransportError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by a [`Transport`](super::Transport).
///
/// Variants built from a client error keep it as their `source()`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS failure, reset).
    #[error("connection failed: {message}")]
    Connect {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout {
        #[source]
        source: Option<BoxError>,
    },

    /// The final URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Malformed response or other HTTP-level failure.
    #[error("HTTP protocol error: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The transport could not turn the resolved request into a request.
    #[error("request build error: {message}")]
    Build {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Any other network failure.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl TransportError {
    /// A connection failure with no underlying cause.
    pub fn connect(message: impl Into<String>) -> Self {
        TransportError::Connect {
            message: message.into(),
            source: None,
        }
    }

    /// A timeout with no underlying cause.
    pub fn timeout() -> Self {
        TransportError::Timeout { source: None }
    }

    /// A network failure with no underlying cause.
    pub fn network(message: impl Into<String>) -> Self {
        TransportError::Network {
            message: message.into(),
            source: None,
        }
    }
}

/// Convert reqwest errors to TransportError.
#[cfg(feature = "native")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();

        if err.is_timeout() {
            TransportError::Timeout {
                source: Some(Box::new(err)),
            }
        } else if err.is_connect() {
            TransportError::Connect {
                message,
                source: Some(Box::new(err)),
            }
        } else if err.is_builder() {
            TransportError::Build {
                message,
                source: Some(Box::new(err)),
            }
        } else if err.is_decode() || err.is_body() || err.is_redirect() {
            TransportError::Protocol {
                message,
                source: Some(Box::new(err)),
            }
        } else {
            TransportError::Network {
                message,
                source: Some(Box::new(err)),
            }
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        TransportError::InvalidUrl(err.to_string())
    }
}

/// The ways a single call can fail.
#[derive(Debug, Error)]
pub enum CallError {
    /// Method outside the dispatchable set.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The transport failed; no response exists.
    #[error("execution failed: {0}")]
    ExecutionFailure(#[from] TransportError),

    /// The response body could not be decoded into the declared model.
    #[error("failed to deserialize response into {model}: {source}")]
    ModelDeserializationFailure {
        model: String,
        #[source]
        source: serde_json::Error,
    },

    /// The post-call script failed.
    #[error("post-call script failed at `{excerpt}`: {source}")]
    ScriptEvaluationFailure {
        excerpt: String,
        #[source]
        source: ScriptError,
    },

    /// A template did not settle to a final value.
    #[error(transparent)]
    TemplateResolutionDivergence(#[from] TemplateError),

    /// The call was cancelled while in flight.
    #[error("call was cancelled")]
    Cancelled,

    /// A result was already attached to the call.
    #[error("call has already been executed")]
    AlreadyExecuted,
}

/// The pipeline step in which a call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStep {
    ResolveUrl,
    SelectMethod,
    ApplyHeaders,
    ApplyQuery,
    ApplyRoute,
    ResolveBody,
    Dispatch,
    Attach,
    ModelDeserialization,
    PostCallScript,
}

impl CallStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStep::ResolveUrl => "resolve-url",
            CallStep::SelectMethod => "select-method",
            CallStep::ApplyHeaders => "apply-headers",
            CallStep::ApplyQuery => "apply-query",
            CallStep::ApplyRoute => "apply-route",
            CallStep::ResolveBody => "resolve-body",
            CallStep::Dispatch => "dispatch",
            CallStep::Attach => "attach",
            CallStep::ModelDeserialization => "model-deserialization",
            CallStep::PostCallScript => "post-call-script",
        }
    }
}

impl fmt::Display for CallStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`CallError`] tagged with the step that produced it.
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct StepError {
    pub step: CallStep,
    #[source]
    pub source: CallError,
}

impl StepError {
    pub fn new(step: CallStep, source: impl Into<CallError>) -> Self {
        Self {
            step,
            source: source.into(),
        }
    }

    /// Attaches the id of the failing call.
    pub fn into_failure(self, call_id: impl Into<String>) -> CallFailure {
        CallFailure {
            call_id: call_id.into(),
            step: self.step,
            source: self.source,
        }
    }
}

/// A call failure naming the call and the step.
#[derive(Debug, Error)]
#[error("call {call_id} failed during {step}: {source}")]
pub struct CallFailure {
    pub call_id: String,
    pub step: CallStep,
    #[source]
    pub source: CallError,
}
