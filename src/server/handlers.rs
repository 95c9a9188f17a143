//! Request handlers.
//!
//! A [`Handler`] turns one fully-read request into a response. Handlers are
//! synchronous and never see the socket; the dispatcher owns framing,
//! keep-alive and error conversion.

use bytes::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::wire::message::ALLOWED_METHODS;
use crate::wire::{Method, OutgoingResponse, RequestHead};

/// A request as read off the wire, head and body complete.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub head: RequestHead,
    /// Head bytes exactly as received, without the blank line.
    pub raw_head: Bytes,
    pub body: Bytes,
}

impl IncomingRequest {
    /// The request as it appeared on the wire.
    pub fn raw(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.raw_head.len() + 4 + self.body.len());
        raw.extend_from_slice(&self.raw_head);
        raw.extend_from_slice(b"\r\n\r\n");
        raw.extend_from_slice(&self.body);
        raw
    }

    /// Request target without its query string.
    pub fn path(&self) -> &str {
        let target = self.head.target.as_str();
        target.split_once('?').map_or(target, |(path, _)| path)
    }
}

/// Handler failure. Answered with 500 and the connection is closed.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Internal(String),
}

pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &IncomingRequest) -> Result<OutgoingResponse, HandlerError>;
}

/// Method-based demo responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoHandler;

impl Handler for DemoHandler {
    fn handle(&self, request: &IncomingRequest) -> Result<OutgoingResponse, HandlerError> {
        let target = request.head.target.as_str();
        let response = match &request.head.method {
            Method::Get => text(request, 200, format!("Received GET request from {target}")),
            Method::Post => accept_body(request, 201),
            Method::Put => accept_body(request, 200),
            Method::Delete => text(
                request,
                200,
                format!("Resource at {target} deleted successfully"),
            ),
            Method::Options => OutgoingResponse::new(204)
                .with_header("Allow", ALLOWED_METHODS)
                .with_body(Bytes::new()),
            Method::Head => {
                // Same headers as GET, body withheld.
                let mut response =
                    text(request, 200, format!("Received GET request from {target}"));
                response.body = Bytes::new();
                response
            }
            Method::Trace => text(request, 200, request.raw()),
            Method::Connect => text(
                request,
                200,
                format!(
                    "CONNECT method successful! Tunneling to {} established.",
                    target.trim_matches('/')
                ),
            ),
            Method::Patch | Method::Extension(_) => text(request, 400, "Method Not Allowed"),
        };
        Ok(response)
    }
}

/// Response with the request's `Content-Type` echoed back.
fn text(request: &IncomingRequest, status: u16, body: impl Into<Bytes>) -> OutgoingResponse {
    let content_type = request
        .head
        .headers
        .get("content-type")
        .unwrap_or("text/plain");
    OutgoingResponse::with_text(status, content_type, body)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Xml,
    Plain,
}

impl BodyKind {
    fn of(request: &IncomingRequest) -> Self {
        let media_type = request
            .head
            .headers
            .get("content-type")
            .and_then(|ct| ct.split(';').next())
            .map(str::trim)
            .unwrap_or("text/plain");
        if media_type.eq_ignore_ascii_case("application/json") {
            BodyKind::Json
        } else if media_type.eq_ignore_ascii_case("application/xml") {
            BodyKind::Xml
        } else {
            BodyKind::Plain
        }
    }
}

/// POST / PUT: check structured bodies are well formed, then echo.
fn accept_body(request: &IncomingRequest, status: u16) -> OutgoingResponse {
    let method = request.head.method.as_str();
    let body = String::from_utf8_lossy(&request.body);
    let (label, problem) = match BodyKind::of(request) {
        BodyKind::Json => (
            "JSON",
            serde_json::from_slice::<serde_json::Value>(&request.body)
                .err()
                .map(|_| "Malformed JSON body"),
        ),
        BodyKind::Xml => (
            "XML",
            (!is_well_formed_xml(&request.body)).then_some("Malformed XML body"),
        ),
        BodyKind::Plain => ("Plain text", None),
    };

    match problem {
        Some(message) => OutgoingResponse::with_text(400, "text/plain", message),
        None => text(
            request,
            status,
            format!("{method} request successful! {label} body received: {body}."),
        ),
    }
}

/// One root element, balanced tags, nothing but whitespace outside it.
/// Attributes must be unique and every entity reference must be known.
fn is_well_formed_xml(body: &[u8]) -> bool {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut roots = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(tag)) => {
                if !attributes_are_valid(&tag) {
                    return false;
                }
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::End(_)) => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Ok(Event::Empty(tag)) => {
                if !attributes_are_valid(&tag) {
                    return false;
                }
                if depth == 0 {
                    roots += 1;
                }
            }
            Ok(Event::Text(text)) => {
                if text.unescape().is_err() {
                    return false;
                }
                if depth == 0 && !text.iter().all(u8::is_ascii_whitespace) {
                    return false;
                }
            }
            Ok(Event::CData(_)) if depth == 0 => return false,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return false,
        }
        buf.clear();
    }

    depth == 0 && roots == 1
}

fn attributes_are_valid(tag: &BytesStart<'_>) -> bool {
    let mut attributes = tag.attributes();
    attributes.with_checks(true);
    attributes.all(|attr| attr.is_ok_and(|attr| attr.unescape_value().is_ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::framer;

    fn request(raw: &str) -> IncomingRequest {
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        IncomingRequest {
            head: framer::decode_request_head(head.as_bytes()).unwrap(),
            raw_head: Bytes::copy_from_slice(head.as_bytes()),
            body: Bytes::copy_from_slice(body.as_bytes()),
        }
    }

    fn body_of(response: &OutgoingResponse) -> &str {
        std::str::from_utf8(&response.body).unwrap()
    }

    #[test]
    fn get_names_the_path() {
        let response = DemoHandler.handle(&request("GET / HTTP/1.1\r\n\r\n")).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(body_of(&response), "Received GET request from /");
        assert_eq!(response.headers.get("content-length"), Some("27"));
        assert_eq!(response.headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn post_json_is_created() {
        let response = DemoHandler
            .handle(&request(
                "POST /items HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"a\": 1}",
            ))
            .unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(
            body_of(&response),
            "POST request successful! JSON body received: {\"a\": 1}."
        );
        assert_eq!(response.headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn malformed_json_and_xml_are_rejected() {
        let response = DemoHandler
            .handle(&request(
                "PUT /items HTTP/1.1\r\nContent-Type: application/json\r\n\r\n{\"a\":",
            ))
            .unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(body_of(&response), "Malformed JSON body");

        let response = DemoHandler
            .handle(&request(
                "POST /items HTTP/1.1\r\nContent-Type: application/xml\r\n\r\n<a><b></a>",
            ))
            .unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(body_of(&response), "Malformed XML body");

        let response = DemoHandler
            .handle(&request(
                "POST /items HTTP/1.1\r\nContent-Type: application/xml\r\n\r\n<a>&bogus;</a>",
            ))
            .unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(body_of(&response), "Malformed XML body");
    }

    #[test]
    fn put_xml_and_plain_text_are_echoed() {
        let response = DemoHandler
            .handle(&request(
                "PUT /doc HTTP/1.1\r\nContent-Type: application/xml; charset=utf-8\r\n\r\n<doc><x/></doc>",
            ))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            body_of(&response),
            "PUT request successful! XML body received: <doc><x/></doc>."
        );

        let response = DemoHandler
            .handle(&request("POST /note HTTP/1.1\r\n\r\nhello"))
            .unwrap();
        assert_eq!(
            body_of(&response),
            "POST request successful! Plain text body received: hello."
        );
    }

    #[test]
    fn xml_well_formedness() {
        assert!(is_well_formed_xml(b"<?xml version=\"1.0\"?>\n<a><b>t</b></a>\n"));
        assert!(is_well_formed_xml(b"<a/>"));
        assert!(!is_well_formed_xml(b""));
        assert!(!is_well_formed_xml(b"<a></a><b></b>"));
        assert!(!is_well_formed_xml(b"<a>"));
        assert!(!is_well_formed_xml(b"text <a/>"));
        assert!(is_well_formed_xml(b"<a x='1' y='&lt;'>&amp;&#65;</a>"));
        assert!(!is_well_formed_xml(b"<a>&bogus;</a>"));
        assert!(!is_well_formed_xml(b"<a x='1' x='2'/>"));
        assert!(!is_well_formed_xml(b"<a><b x='1' x='2'></b></a>"));
        assert!(!is_well_formed_xml(b"<a x='&nope;'/>"));
    }

    #[test]
    fn head_keeps_get_length_without_body() {
        let response = DemoHandler.handle(&request("HEAD / HTTP/1.1\r\n\r\n")).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
        assert_eq!(response.headers.get("content-length"), Some("27"));
    }

    #[test]
    fn options_lists_methods() {
        let response = DemoHandler.handle(&request("OPTIONS * HTTP/1.1\r\n\r\n")).unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.headers.get("allow"), Some(ALLOWED_METHODS));
        assert_eq!(response.headers.get("content-length"), Some("0"));
    }

    #[test]
    fn trace_echoes_the_request() {
        let raw = "TRACE /t HTTP/1.1\r\nX-Probe: 1\r\n\r\n";
        let response = DemoHandler.handle(&request(raw)).unwrap();
        assert_eq!(body_of(&response), raw);
    }

    #[test]
    fn delete_connect_and_unknown_methods() {
        let response = DemoHandler.handle(&request("DELETE /r/1 HTTP/1.1\r\n\r\n")).unwrap();
        assert_eq!(body_of(&response), "Resource at /r/1 deleted successfully");

        let response = DemoHandler
            .handle(&request("CONNECT example.com:443 HTTP/1.1\r\n\r\n"))
            .unwrap();
        assert_eq!(
            body_of(&response),
            "CONNECT method successful! Tunneling to example.com:443 established."
        );

        let response = DemoHandler.handle(&request("BREW /pot HTTP/1.1\r\n\r\n")).unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(body_of(&response), "Method Not Allowed");
    }
}
