//! Data models for API calls, requests and responses.
//!
//! This module contains the core data structures shared by the executor, the
//! post-call hooks and the suite runner.

pub mod call;
pub mod request;
pub mod response;

pub use call::ApiCall;
pub use request::{CallSpec, Header, HttpMethod, Param, ResolvedRequest};
pub use response::{MediaKind, Response};
