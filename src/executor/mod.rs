//! Call executor.
//!
//! Turns a [`CallSpec`] into a [`ResolvedRequest`] against an [`Environment`],
//! dispatches it through a [`Transport`] and normalizes the reply into a
//! [`Response`].
//!
//! ```no_run
//! use api_suite::environment::Environment;
//! use api_suite::executor::{ExecutionConfig, RequestExecutor};
//! use api_suite::models::CallSpec;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = RequestExecutor::native(ExecutionConfig::default())?;
//! let env = Environment::from_variables([("base", "https://httpbin.org")]);
//!
//! let executed = executor.execute(&env, &CallSpec::get("{{base}}/get")).await?;
//! println!("Status: {}", executed.response.status_code());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod transport;

#[cfg(feature = "native")]
pub mod native;

pub use cancellation::{CallHandle, CallTracker, CancelError, SharedCallTracker};
pub use config::ExecutionConfig;
pub use error::{BoxError, CallError, CallFailure, CallStep, StepError, TransportError};
pub use transport::{Transport, TransportResponse};

#[cfg(feature = "native")]
pub use native::ReqwestTransport;

use crate::environment::Environment;
use crate::models::{CallSpec, Header, ResolvedRequest, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A request that was sent together with the response it produced.
#[derive(Debug, Clone)]
pub struct Executed {
    pub request: ResolvedRequest,
    pub response: Response,
}

/// Executes call specifications over a [`Transport`].
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    config: ExecutionConfig,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, config: ExecutionConfig) -> Self {
        Self { transport, config }
    }

    /// Creates an executor over a [`ReqwestTransport`] built from `config`.
    #[cfg(feature = "native")]
    pub fn native(config: ExecutionConfig) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Resolves `spec` against `env` without sending anything.
    pub fn build_request(
        &self,
        env: &Environment,
        spec: &CallSpec,
    ) -> Result<ResolvedRequest, StepError> {
        builder::build_request(env, spec, &self.config)
    }

    /// Resolves, sends and normalizes one call.
    ///
    /// A response with any status code is a success; only transport failures
    /// are errors.
    pub async fn execute(&self, env: &Environment, spec: &CallSpec) -> Result<Executed, StepError> {
        let request = self.build_request(env, spec)?;
        let response = self.dispatch(&request).await?;
        Ok(Executed { request, response })
    }

    /// Like [`execute`](Self::execute), but gives up as soon as `handle` is
    /// cancelled. A cancelled call fails with [`CallError::Cancelled`].
    pub async fn execute_with_handle(
        &self,
        env: &Environment,
        spec: &CallSpec,
        handle: &CallHandle,
    ) -> Result<Executed, StepError> {
        let request = self.build_request(env, spec)?;

        if handle.is_cancelled() {
            return Err(StepError::new(CallStep::Dispatch, CallError::Cancelled));
        }

        let response = tokio::select! {
            biased;
            _ = handle.cancelled() => {
                log::warn!("call {} cancelled during dispatch", handle.call_id);
                return Err(StepError::new(CallStep::Dispatch, CallError::Cancelled));
            }
            response = self.dispatch(&request) => response?,
        };

        Ok(Executed { request, response })
    }

    async fn dispatch(&self, request: &ResolvedRequest) -> Result<Response, StepError> {
        log::info!("dispatching {} {}", request.method, request.url);
        let started = Instant::now();

        let raw = self
            .transport
            .send(request)
            .await
            .map_err(|e| StepError::new(CallStep::Dispatch, e))?;

        let elapsed = started.elapsed();
        log::info!(
            "{} {} completed with {} in {:?}",
            request.method,
            request.url,
            raw.status_code,
            elapsed
        );

        Ok(normalize(raw, elapsed))
    }
}

/// Flattens grouped transport headers into one entry per value.
pub fn normalize(raw: TransportResponse, elapsed: Duration) -> Response {
    let headers = raw.headers.into_iter().flat_map(|(name, values)| {
        values
            .into_iter()
            .map(move |value| Header::new(name.clone(), value))
    });

    let response = Response::new(raw.status_code)
        .with_headers(headers)
        .with_body(raw.body)
        .with_elapsed(elapsed);

    match raw.status_text {
        Some(text) => response.with_status_text(text),
        None => response,
    }
}
