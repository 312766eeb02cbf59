//! The HTTP transport seam.
//!
//! The executor never talks to the network directly. It hands a fully
//! resolved request to a [`Transport`] and normalizes what comes back.

use super::error::TransportError;
use crate::models::ResolvedRequest;
use async_trait::async_trait;

/// Raw response as reported by a transport.
///
/// Headers are grouped by name with every value the server sent, in the
/// order they were received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub status_code: u16,
    pub status_text: Option<String>,
    pub headers: Vec<(String, Vec<String>)>,
    pub body: Vec<u8>,
}

/// Sends resolved requests over HTTP.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the complete response.
    ///
    /// Any status code, including 4xx and 5xx, is a successful send.
    async fn send(&self, request: &ResolvedRequest) -> Result<TransportResponse, TransportError>;
}
