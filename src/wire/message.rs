//! Message types shared by the client and the server.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::wire::error::WireError;
use crate::wire::framer;
use crate::wire::headers::Headers;

/// The only protocol version this crate emits.
pub const HTTP_1_1: &str = "HTTP/1.1";
pub const HTTP_1_0: &str = "HTTP/1.0";

/// Value of the `Allow` header for every method the server understands.
pub const ALLOWED_METHODS: &str = "GET, POST, HEAD, PUT, DELETE, OPTIONS, TRACE, CONNECT";

/// Request method token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Trace,
    Connect,
    Patch,
    /// Any other syntactically valid token.
    Extension(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Patch => "PATCH",
            Method::Extension(token) => token,
        }
    }
}

impl FromStr for Method {
    type Err = WireError;

    /// Method tokens are case-sensitive; `get` is an extension method.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.is_empty() || !token.bytes().all(is_tchar) {
            return Err(WireError::MalformedHead(format!("invalid method token {token:?}")));
        }
        Ok(match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            "TRACE" => Method::Trace,
            "CONNECT" => Method::Connect,
            "PATCH" => Method::Patch,
            other => Method::Extension(other.to_string()),
        })
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token characters per RFC 9110 §5.6.2.
pub(crate) fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z'
    )
}

/// Parsed request line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub target: String,
    pub version: String,
    pub headers: Headers,
}

impl RequestHead {
    /// Whether the connection stays open after this exchange.
    ///
    /// HTTP/1.1 defaults to persistent unless `Connection: close`; any
    /// version opts in with `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        let close = self.headers.has_token("connection", "close");
        let keep = self.headers.has_token("connection", "keep-alive");
        (self.version == HTTP_1_1 && !close) || keep
    }
}

/// Parsed status line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

impl ResponseHead {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// A request ready to be written by the client.
///
/// Redirect handling builds a fresh value per attempt instead of mutating
/// the one that produced the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: Method,
    pub target: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl OutgoingRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        framer::encode_request(&self.method, &self.target, &self.headers, &self.body)
    }
}

/// A response ready to be written by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl OutgoingResponse {
    pub fn new(status: u16) -> Self {
        Self {
            version: HTTP_1_1.to_string(),
            status,
            reason: reason_phrase(status).to_string(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// A response with a body, `Content-Type` and a matching `Content-Length`.
    pub fn with_text(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::new(status)
            .with_header("Content-Type", content_type)
            .with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body and its `Content-Length`.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self.headers
            .insert("Content-Length", self.body.len().to_string());
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        framer::encode_response(
            &self.version,
            self.status,
            &self.reason,
            &self.headers,
            &self.body,
        )
    }
}

/// Canonical reason phrase for a status code.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        411 => "Length Required",
        413 => "Content Too Large",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown Status",
    }
}
