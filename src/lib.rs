//! API Suite
//!
//! Runs suites of templated HTTP API calls against a shared variable
//! environment. Each call is resolved, sent, attached to its response and
//! then handed to an optional post-call script that can read the exchange
//! and write values back for later calls.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **models**: Call specifications, resolved requests, responses and calls
//! - **variables**: `{{name}}` template resolution
//! - **environment**: The shared variable store and environment profile files
//! - **executor**: Request building, dispatch over a transport, cancellation
//! - **hooks**: Post-call script binding and the built-in directive language
//! - **config**: Suite settings, loaded from JSON and merged with defaults
//! - **suite**: Sequential runner producing a report per run
//!
//! # Call lifecycle
//!
//! 1. Every template in the call (URL, headers, query and route parameters,
//!    body) is resolved against the environment
//! 2. The method is validated and the body attached when the method carries one
//! 3. The request is sent and the response normalized
//! 4. The request/response pair is attached to the call, exactly once
//! 5. The post-call script runs with `apiRequest`, `apiResponse`,
//!    `environment` and, for JSON responses with a declared model, `model`
//!
//! # Example
//!
//! ```no_run
//! use api_suite::environment::Environment;
//! use api_suite::executor::{ExecutionConfig, RequestExecutor};
//! use api_suite::hooks::DirectiveHandler;
//! use api_suite::models::{ApiCall, CallSpec};
//! use api_suite::suite::SuiteRunner;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let env = Environment::from_variables([("base", "https://api.example.com")]);
//! let executor = RequestExecutor::native(ExecutionConfig::new(30))?;
//! let runner = SuiteRunner::new(executor, Arc::new(DirectiveHandler::new()), env);
//!
//! let calls = vec![
//!     ApiCall::new(
//!         CallSpec::post("{{base}}/login")
//!             .body(r#"{"user": "ada"}"#)
//!             .post_call_script("@capture token = $.token"),
//!     ),
//!     ApiCall::new(CallSpec::get("{{base}}/me").header("Authorization", "Bearer {{token}}")),
//! ];
//!
//! let report = runner.run(&calls).await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod environment;
pub mod executor;
pub mod hooks;
pub mod models;
pub mod suite;
pub mod variables;

pub use environment::Environment;
pub use executor::{CallError, CallFailure, CallStep, ExecutionConfig, RequestExecutor};
pub use hooks::{DirectiveHandler, ModelDescriptor, PostCallHandler, ScriptContext, ScriptError};
pub use models::{ApiCall, CallSpec, HttpMethod, ResolvedRequest, Response};
pub use suite::{SuiteReport, SuiteRunner};
