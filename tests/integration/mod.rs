//! Integration tests module for API suites
//!
//! Shared setup for tests that run calls against a local mock server.

pub mod end_to_end_test;
pub mod request_chaining_test;

use api_suite::environment::Environment;
use api_suite::executor::{ExecutionConfig, RequestExecutor};
use api_suite::hooks::DirectiveHandler;
use api_suite::suite::SuiteRunner;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Runner over the reqwest transport using the directive handler, with
/// `base` pointing at `server_uri`.
pub fn runner_for(server_uri: &str) -> SuiteRunner {
    init_test_env();
    let executor = RequestExecutor::native(ExecutionConfig::new(5)).expect("transport");
    let env = Environment::from_variables([("base", server_uri)]);
    SuiteRunner::new(executor, Arc::new(DirectiveHandler::new()), env)
}
