//! Builds a [`ResolvedRequest`] from a [`CallSpec`].
//!
//! Each step resolves its templates against the environment and fails with a
//! [`StepError`] naming the step. No I/O happens here.

use super::config::ExecutionConfig;
use super::error::{CallError, CallStep, StepError};
use crate::environment::Environment;
use crate::models::{CallSpec, Header, Param, ResolvedRequest};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped in a route parameter value, which must stay inside one
/// path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

const CONTENT_TYPE: &str = "Content-Type";

/// Runs every build step for `spec` in order.
pub fn build_request(
    env: &Environment,
    spec: &CallSpec,
    config: &ExecutionConfig,
) -> Result<ResolvedRequest, StepError> {
    let url = resolve(env, &spec.url, CallStep::ResolveUrl)?;

    if !spec.method.is_dispatchable() {
        return Err(StepError::new(
            CallStep::SelectMethod,
            CallError::UnsupportedMethod(spec.method.to_string()),
        ));
    }

    let attaches_body = spec.method.supports_body() && !spec.body.is_empty();
    let headers = resolve_headers(env, spec, attaches_body, config)?;

    let query = resolve_params(env, &spec.query_params, CallStep::ApplyQuery)?;
    let query_url = append_query(&url, &query);

    let route = resolve_params(env, &spec.route_params, CallStep::ApplyRoute)?;
    let url = apply_route_params(&query_url, &route);

    let body = if attaches_body {
        Some(resolve(env, &spec.body, CallStep::ResolveBody)?)
    } else {
        None
    };

    Ok(ResolvedRequest {
        method: spec.method,
        url,
        query_url,
        headers,
        body,
    })
}

fn resolve(env: &Environment, template: &str, step: CallStep) -> Result<String, StepError> {
    env.process(template).map_err(|e| StepError::new(step, e))
}

/// Content-Type first when synthesized, then explicit headers in declaration
/// order.
fn resolve_headers(
    env: &Environment,
    spec: &CallSpec,
    attaches_body: bool,
    config: &ExecutionConfig,
) -> Result<Vec<Header>, StepError> {
    let mut headers = Vec::with_capacity(spec.headers.len() + 1);

    if !spec.has_explicit_content_type() {
        let declared = match &spec.content_type {
            Some(content_type) => Some(resolve(env, content_type, CallStep::ApplyHeaders)?),
            None if attaches_body => Some(config.default_content_type.clone()),
            None => None,
        };

        if let Some(content_type) = declared.filter(|ct| !ct.is_empty()) {
            headers.push(Header::new(CONTENT_TYPE, content_type));
        }
    }

    for header in &spec.headers {
        let value = resolve(env, &header.value, CallStep::ApplyHeaders)?;
        headers.push(Header::new(header.name.clone(), value));
    }

    Ok(headers)
}

fn resolve_params(
    env: &Environment,
    params: &[Param],
    step: CallStep,
) -> Result<Vec<(String, String)>, StepError> {
    params
        .iter()
        .map(|p| resolve(env, &p.value, step).map(|value| (p.name.clone(), value)))
        .collect()
}

/// Appends form-urlencoded `pairs` to the query of `url`, keeping any
/// existing query and `#fragment`.
pub fn append_query(url: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return url.to_string();
    }

    let (base, fragment) = match url.find('#') {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    };

    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();

    let separator = if !base.contains('?') {
        "?"
    } else if base.ends_with('?') || base.ends_with('&') {
        ""
    } else {
        "&"
    };

    format!("{}{}{}{}", base, separator, encoded, fragment)
}

/// Replaces each `{name}` in `url` with the percent-encoded value of the
/// matching route parameter. Placeholders without a parameter stay as they
/// are.
pub fn apply_route_params(url: &str, params: &[(String, String)]) -> String {
    params.iter().fold(url.to_string(), |acc, (name, value)| {
        let placeholder = format!("{{{}}}", name);
        let encoded = utf8_percent_encode(value, PATH_SEGMENT).to_string();
        acc.replace(&placeholder, &encoded)
    })
}
