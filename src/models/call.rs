//! A call in a suite and its single-assignment result slot.

use super::request::{CallSpec, ResolvedRequest};
use super::response::Response;
use crate::executor::error::CallError;
use std::sync::OnceLock;
use uuid::Uuid;

/// One call of a suite.
///
/// The specification never changes. The resolved request and response are
/// attached exactly once, after the call executes.
#[derive(Debug)]
pub struct ApiCall {
    id: String,
    name: Option<String>,
    spec: CallSpec,
    exchange: OnceLock<(ResolvedRequest, Response)>,
}

impl ApiCall {
    /// Creates a call with a generated UUID.
    pub fn new(spec: CallSpec) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), spec)
    }

    pub fn with_id(id: impl Into<String>, spec: CallSpec) -> Self {
        Self {
            id: id.into(),
            name: None,
            spec,
            exchange: OnceLock::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if one was given, id otherwise.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn spec(&self) -> &CallSpec {
        &self.spec
    }

    /// Records the request that was sent and the response it produced.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::AlreadyExecuted`] if a result is already attached;
    /// the first result is kept.
    pub fn attach(&self, request: ResolvedRequest, response: Response) -> Result<(), CallError> {
        self.exchange
            .set((request, response))
            .map_err(|_| CallError::AlreadyExecuted)
    }

    pub fn is_executed(&self) -> bool {
        self.exchange.get().is_some()
    }

    pub fn request(&self) -> Option<&ResolvedRequest> {
        self.exchange.get().map(|(request, _)| request)
    }

    pub fn response(&self) -> Option<&Response> {
        self.exchange.get().map(|(_, response)| response)
    }
}
