//! HTTP response data model.
//!
//! A single immutable [`Response`] type is produced for every executed call.
//! Headers keep one entry per occurrence, so repeated headers such as
//! `Set-Cookie` are never merged. The body is kept as bytes; its text is
//! decoded lazily, once, using the charset announced by the `Content-Type`
//! header.

use super::request::Header;
use encoding_rs::{Encoding, UTF_8};
use mime::Mime;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Broad classification of a response body's media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    /// JSON data (application/json, any +json suffix)
    Json,
    /// XML data (application/xml, text/xml, any +xml suffix)
    Xml,
    /// HTML content (text/html)
    Html,
    /// Other text/* types
    PlainText,
    /// Image data (image/*)
    Image,
    /// Anything else, or no Content-Type at all
    Binary,
}

impl MediaKind {
    /// Classifies a Content-Type header value.
    pub fn from_content_type(content_type: &str) -> Self {
        let Ok(mime) = content_type.trim().parse::<Mime>() else {
            return MediaKind::Binary;
        };

        if is_json_mime(&mime) {
            MediaKind::Json
        } else if mime.subtype() == mime::XML || mime.suffix() == Some(mime::XML) {
            MediaKind::Xml
        } else if mime.subtype() == mime::HTML {
            MediaKind::Html
        } else if mime.type_() == mime::TEXT {
            MediaKind::PlainText
        } else if mime.type_() == mime::IMAGE {
            MediaKind::Image
        } else {
            MediaKind::Binary
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Json => "JSON",
            MediaKind::Xml => "XML",
            MediaKind::Html => "HTML",
            MediaKind::PlainText => "Plain Text",
            MediaKind::Image => "Image",
            MediaKind::Binary => "Binary",
        }
    }

    /// Checks if the body can be displayed as text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            MediaKind::Json | MediaKind::Xml | MediaKind::Html | MediaKind::PlainText
        )
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_json_mime(mime: &Mime) -> bool {
    mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON)
}

/// The response to one executed call.
#[derive(Debug, Clone)]
pub struct Response {
    status_code: u16,
    status_text: Option<String>,
    headers: Vec<Header>,
    body: Vec<u8>,
    elapsed: Duration,
    text: OnceLock<String>,
}

impl Response {
    /// Creates a response with the given status and no headers or body.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            status_text: None,
            headers: Vec::new(),
            body: Vec::new(),
            elapsed: Duration::ZERO,
            text: OnceLock::new(),
        }
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    /// Appends one header entry. Repeated names produce repeated entries.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = Header>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.text = OnceLock::new();
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Reason phrase, when the transport reported one.
    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    /// All header entries in received order.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Returns the first value of header `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.is(name))
            .map(|h| h.value.as_str())
    }

    /// Returns every value of header `name` in received order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.is(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn media_kind(&self) -> MediaKind {
        self.content_type()
            .map(MediaKind::from_content_type)
            .unwrap_or(MediaKind::Binary)
    }

    /// Returns `true` if the Content-Type is `application/json` or carries a
    /// `+json` suffix.
    pub fn is_json(&self) -> bool {
        self.content_type()
            .and_then(|ct| ct.trim().parse::<Mime>().ok())
            .is_some_and(|m| is_json_mime(&m))
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as text.
    ///
    /// Uses the `charset` parameter of the Content-Type when it names a known
    /// encoding and UTF-8 otherwise. Malformed sequences are replaced with
    /// U+FFFD. Decoding happens on first access only.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| {
            let encoding = self.charset().unwrap_or(UTF_8);
            let (decoded, _, had_errors) = encoding.decode(&self.body);
            if had_errors {
                log::debug!(
                    "response body contained malformed {} sequences",
                    encoding.name()
                );
            }
            decoded.into_owned()
        })
    }

    fn charset(&self) -> Option<&'static Encoding> {
        let mime = self.content_type()?.trim().parse::<Mime>().ok()?;
        let label = mime.get_param(mime::CHARSET)?;
        Encoding::for_label(label.as_str().as_bytes())
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Time between dispatch and the full body being received.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Checks if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Checks if the response status indicates a redirection (3xx).
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    /// Checks if the response status indicates a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    /// Checks if the response status indicates a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }

    /// JSON view bound as `apiResponse` in post-call scripts.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status_code,
            "statusText": self.status_text,
            "headers": self
                .headers
                .iter()
                .map(|h| serde_json::json!({ "name": h.name, "value": h.value }))
                .collect::<Vec<_>>(),
            "body": self.text(),
            "elapsedMs": self.elapsed.as_millis() as u64,
        })
    }
}
