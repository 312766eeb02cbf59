//! Sequential suite runner.
//!
//! Runs calls in order against one shared [`Environment`]: execute, attach
//! the result to the call, then run its post-call script. A failing call is
//! recorded and the run continues with the next one.

use crate::config::SuiteConfig;
use crate::environment::{load_profiles, load_profiles_file, Environment, LoadError};
use crate::executor::{
    CallError, CallFailure, CallHandle, CallStep, CancelError, ExecutionConfig, RequestExecutor,
    SharedCallTracker, StepError, TransportError,
};
use crate::hooks::{run_post_script, PostCallHandler};
use crate::models::ApiCall;
use crate::variables::TemplateResolver;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while setting up a runner.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("failed to create transport: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to load environment: {0}")]
    Environment(#[from] LoadError),
}

/// Result of one call in a run.
#[derive(Debug)]
pub struct CallOutcome {
    pub call_id: String,
    pub name: Option<String>,

    /// Response status, if a response was received.
    pub status: Option<u16>,

    /// Dispatch duration, if a response was received.
    pub elapsed: Option<Duration>,

    pub failure: Option<CallFailure>,
}

impl CallOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CallOutcome>,
}

impl SuiteReport {
    /// Number of calls that completed without error.
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    /// Number of calls that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Failures in call order.
    pub fn failures(&self) -> impl Iterator<Item = &CallFailure> {
        self.outcomes.iter().filter_map(|o| o.failure.as_ref())
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Runs calls one after another against a shared environment.
pub struct SuiteRunner {
    executor: RequestExecutor,
    handler: Arc<dyn PostCallHandler>,
    environment: Environment,
    tracker: SharedCallTracker,
}

impl std::fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("executor", &self.executor)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl SuiteRunner {
    pub fn new(
        executor: RequestExecutor,
        handler: Arc<dyn PostCallHandler>,
        environment: Environment,
    ) -> Self {
        Self {
            executor,
            handler,
            environment,
            tracker: SharedCallTracker::new(),
        }
    }

    /// Builds a runner from configuration: a reqwest transport with the
    /// configured timeout and redirect policy, and an environment seeded from
    /// the profile file.
    ///
    /// `config.environment_file` is used when it names an existing file
    /// (relative paths against `start_dir`); otherwise the default file names
    /// are searched from `start_dir` upwards.
    #[cfg(feature = "native")]
    pub fn from_config(
        config: &SuiteConfig,
        handler: Arc<dyn PostCallHandler>,
        start_dir: &Path,
    ) -> Result<Self, SuiteError> {
        let executor = RequestExecutor::native(ExecutionConfig::from_suite_config(config))?;

        let configured = start_dir.join(&config.environment_file);
        let profiles = if configured.is_file() {
            load_profiles_file(&configured)?
        } else {
            load_profiles(start_dir)?
        };

        let environment =
            Environment::from_profiles(&profiles, config.active_environment.as_deref())?
                .with_resolver(TemplateResolver::from_config(config));

        Ok(Self::new(executor, handler, environment))
    }

    /// Uses `tracker` for in-flight calls, so several runners can be
    /// cancelled through one tracker.
    pub fn with_tracker(mut self, tracker: SharedCallTracker) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Tracker holding the calls currently in flight.
    pub fn tracker(&self) -> &SharedCallTracker {
        &self.tracker
    }

    /// Cancels an in-flight call by id.
    pub fn cancel(&self, call_id: &str) -> Result<(), CancelError> {
        self.tracker.cancel(call_id)
    }

    /// Runs one call: execute, attach, post-call script.
    ///
    /// # Errors
    ///
    /// Returns a [`CallFailure`] naming the call and the step that failed.
    /// A call that fails after its response was attached keeps the response.
    pub async fn run_call(&self, call: &ApiCall) -> Result<(), CallFailure> {
        self.run_steps(call)
            .await
            .map_err(|e| e.into_failure(call.id()))
    }

    async fn run_steps(&self, call: &ApiCall) -> Result<(), StepError> {
        if call.is_executed() {
            return Err(StepError::new(CallStep::Attach, CallError::AlreadyExecuted));
        }

        let spec = call.spec();
        let handle = CallHandle::with_id(call.id());
        if let Err(e) = self.tracker.register(handle.clone()) {
            log::warn!("call {} is not cancellable: {}", call.label(), e);
        }

        let executed = self
            .executor
            .execute_with_handle(&self.environment, spec, &handle)
            .await;
        if let Err(e) = self.tracker.unregister(call.id()) {
            log::warn!("call {} could not be removed from the tracker: {}", call.label(), e);
        }
        let executed = executed?;

        call.attach(executed.request, executed.response)
            .map_err(|e| StepError::new(CallStep::Attach, e))?;

        let (Some(request), Some(response)) = (call.request(), call.response()) else {
            return Err(StepError::new(CallStep::Attach, CallError::AlreadyExecuted));
        };

        match spec.post_call_script.as_deref() {
            Some(script) => run_post_script(
                self.handler.as_ref(),
                script,
                request,
                response,
                &self.environment,
                spec.response_model.as_ref(),
            ),
            None => Ok(()),
        }
    }

    /// Runs `calls` in order. Failures are recorded, never fatal.
    pub async fn run(&self, calls: &[ApiCall]) -> SuiteReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(calls.len());

        for call in calls {
            let result = self.run_call(call).await;

            let response = call.response();
            match &result {
                Ok(()) => log::info!(
                    "call {} passed ({})",
                    call.label(),
                    response.map_or(0, |r| r.status_code())
                ),
                Err(failure) => log::warn!("call {} failed: {}", call.label(), failure),
            }

            outcomes.push(CallOutcome {
                call_id: call.id().to_string(),
                name: call.name().map(str::to_string),
                status: response.map(|r| r.status_code()),
                elapsed: response.map(|r| r.elapsed()),
                failure: result.err(),
            });
        }

        let report = SuiteReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        log::info!(
            "suite finished: {} passed, {} failed",
            report.passed(),
            report.failed()
        );

        report
    }
}
