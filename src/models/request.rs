//! API call request data models.
//!
//! This module defines the description of a templated call ([`CallSpec`]) and
//! the concrete request produced from it once every template has been
//! resolved against an environment ([`ResolvedRequest`]).

use crate::executor::error::CallError;
use crate::hooks::ModelDescriptor;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// HTTP request method.
///
/// Represents all standard HTTP methods as defined in RFC 7231 and RFC 5789.
/// TRACE and CONNECT can be described but are never dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
    /// HTTP OPTIONS method - describe communication options
    OPTIONS,
    /// HTTP HEAD method - retrieve headers only
    HEAD,
    /// HTTP TRACE method - perform a message loop-back test
    TRACE,
    /// HTTP CONNECT method - establish a tunnel to the server
    CONNECT,
}

impl HttpMethod {
    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::HEAD => "HEAD",
            HttpMethod::TRACE => "TRACE",
            HttpMethod::CONNECT => "CONNECT",
        }
    }

    /// Returns `true` if calls with this method can be dispatched.
    pub fn is_dispatchable(&self) -> bool {
        !matches!(self, HttpMethod::TRACE | HttpMethod::CONNECT)
    }

    /// Returns `true` if a request with this method carries a body.
    ///
    /// GET and HEAD never carry one.
    pub fn supports_body(&self) -> bool {
        matches!(
            self,
            HttpMethod::POST
                | HttpMethod::PUT
                | HttpMethod::PATCH
                | HttpMethod::DELETE
                | HttpMethod::OPTIONS
        )
    }
}

impl FromStr for HttpMethod {
    type Err = CallError;

    /// Parses a method name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnsupportedMethod`] for names outside the standard
    /// method set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::GET),
            "POST" => Ok(HttpMethod::POST),
            "PUT" => Ok(HttpMethod::PUT),
            "DELETE" => Ok(HttpMethod::DELETE),
            "PATCH" => Ok(HttpMethod::PATCH),
            "OPTIONS" => Ok(HttpMethod::OPTIONS),
            "HEAD" => Ok(HttpMethod::HEAD),
            "TRACE" => Ok(HttpMethod::TRACE),
            "CONNECT" => Ok(HttpMethod::CONNECT),
            _ => Err(CallError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A header name/value pair.
///
/// In a [`CallSpec`] the value is a template; in a [`ResolvedRequest`] or a
/// response it is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A query or route parameter with a templated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable description of one API call.
///
/// Every string field except `method` may contain `{{name}}` placeholders,
/// resolved against the environment when the call executes. Route
/// placeholders in the URL use single braces (`/users/{id}`).
///
/// Call specifications can be described in JSON:
///
/// ```
/// use api_suite::models::{CallSpec, HttpMethod};
///
/// let spec: CallSpec = serde_json::from_str(r#"{
///     "method": "POST",
///     "url": "{{baseUrl}}/users",
///     "headers": [{ "name": "Accept", "value": "application/json" }],
///     "body": "{\"name\": \"{{userName}}\"}",
///     "contentType": "application/json"
/// }"#).unwrap();
///
/// assert_eq!(spec.method, HttpMethod::POST);
/// assert!(spec.query_params.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSpec {
    pub method: HttpMethod,

    /// URL template.
    pub url: String,

    /// Headers in declaration order.
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Query parameters, appended to the URL in declaration order.
    #[serde(default)]
    pub query_params: Vec<Param>,

    /// Route parameters, substituted into `{name}` URL segments.
    #[serde(default)]
    pub route_params: Vec<Param>,

    /// Body template. Empty means no body.
    #[serde(default)]
    pub body: String,

    /// Declared content type, used when no explicit `Content-Type` header
    /// exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Type the response body is decoded into for post-call scripts.
    #[serde(skip)]
    pub response_model: Option<ModelDescriptor>,

    /// Script evaluated after the response is received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_call_script: Option<String>,
}

impl CallSpec {
    /// Creates a call specification with no headers, parameters or body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            route_params: Vec::new(),
            body: String::new(),
            content_type: None,
            response_model: None,
            post_call_script: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::DELETE, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push(Param::new(name, value));
        self
    }

    pub fn route(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.push(Param::new(name, value));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn response_model(mut self, model: ModelDescriptor) -> Self {
        self.response_model = Some(model);
        self
    }

    pub fn post_call_script(mut self, script: impl Into<String>) -> Self {
        self.post_call_script = Some(script.into());
        self
    }

    /// Returns `true` if an explicit `Content-Type` header is declared.
    pub fn has_explicit_content_type(&self) -> bool {
        self.headers.iter().any(|h| h.is("content-type"))
    }
}

/// A request with every template resolved.
///
/// Built once per execution and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRequest {
    pub method: HttpMethod,

    /// Final URL, after query and route parameters were applied.
    pub url: String,

    /// URL as it was right after query parameters were appended.
    pub query_url: String,

    /// Headers in send order.
    pub headers: Vec<Header>,

    pub body: Option<String>,
}

impl ResolvedRequest {
    /// Returns the first header named `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .map(|h| h.value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// JSON view bound as `apiRequest` in post-call scripts.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "method": self.method.as_str(),
            "url": self.url,
            "queryUrl": self.query_url,
            "headers": self
                .headers
                .iter()
                .map(|h| serde_json::json!({ "name": h.name, "value": h.value }))
                .collect::<Vec<_>>(),
            "body": self.body,
        })
    }
}
