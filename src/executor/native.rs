//! Native HTTP transport using reqwest.
//!
//! Available with the `native` feature (enabled by default).

use super::config::ExecutionConfig;
use super::error::TransportError;
use super::transport::{Transport, TransportResponse};
use crate::models::{HttpMethod, ResolvedRequest};
use async_trait::async_trait;
use reqwest::redirect::Policy;

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client honouring the timeout, redirect policy and user agent
    /// in `config`.
    pub fn new(config: &ExecutionConfig) -> Result<Self, TransportError> {
        let redirect = if config.follow_redirects {
            Policy::limited(config.max_redirects as usize)
        } else {
            Policy::none()
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout_duration())
            .redirect(redirect)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(TransportError::from)?;

        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::GET => reqwest::Method::GET,
        HttpMethod::POST => reqwest::Method::POST,
        HttpMethod::PUT => reqwest::Method::PUT,
        HttpMethod::DELETE => reqwest::Method::DELETE,
        HttpMethod::PATCH => reqwest::Method::PATCH,
        HttpMethod::HEAD => reqwest::Method::HEAD,
        HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
        HttpMethod::TRACE => reqwest::Method::TRACE,
        HttpMethod::CONNECT => reqwest::Method::CONNECT,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ResolvedRequest) -> Result<TransportResponse, TransportError> {
        let url = url::Url::parse(&request.url)?;
        let mut req_builder = self.client.request(to_reqwest_method(request.method), url);

        for header in &request.headers {
            req_builder = req_builder.header(header.name.as_str(), header.value.as_str());
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let response = req_builder.send().await?;

        let status = response.status();
        let status_code = status.as_u16();
        let status_text = status.canonical_reason().map(str::to_string);

        let mut headers: Vec<(String, Vec<String>)> = Vec::new();
        for name in response.headers().keys() {
            let values = response
                .headers()
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect();
            headers.push((name.as_str().to_string(), values));
        }

        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status_code,
            status_text,
            headers,
            body,
        })
    }
}
