//! Message head encoding and decoding. Pure functions, no I/O.
//!
//! # Wire Format
//! ```text
//! request  = METHOD SP target SP HTTP/1.1 CRLF *(name ": " value CRLF) CRLF body
//! response = version SP code SP reason CRLF *(name ": " value CRLF) CRLF body
//! ```
//!
//! Decoders take the head bytes as returned by the stream reader, i.e.
//! without the terminating blank line.

use crate::wire::error::WireError;
use crate::wire::headers::Headers;
use crate::wire::message::{is_tchar, Method, RequestHead, ResponseHead, HTTP_1_1};

const CRLF: &[u8] = b"\r\n";

/// Encode a request line, headers in iteration order, a blank line and the
/// raw body. No headers are added or rewritten.
pub fn encode_request(method: &Method, target: &str, headers: &Headers, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + body.len());
    out.extend_from_slice(method.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(target.as_bytes());
    out.push(b' ');
    out.extend_from_slice(HTTP_1_1.as_bytes());
    out.extend_from_slice(CRLF);
    write_headers(&mut out, headers);
    out.extend_from_slice(body);
    out
}

/// Encode a status line, headers, a blank line and the raw body.
pub fn encode_response(
    version: &str,
    status: u16,
    reason: &str,
    headers: &Headers,
    body: &[u8],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + body.len());
    out.extend_from_slice(format!("{version} {status} {reason}").as_bytes());
    out.extend_from_slice(CRLF);
    write_headers(&mut out, headers);
    out.extend_from_slice(body);
    out
}

fn write_headers(out: &mut Vec<u8>, headers: &Headers) {
    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(CRLF);
    }
    out.extend_from_slice(CRLF);
}

/// Decode `version SP code SP reason` plus header lines.
pub fn decode_response_head(raw: &[u8]) -> Result<ResponseHead, WireError> {
    let text = String::from_utf8_lossy(raw);
    let (start_line, header_block) = split_start_line(&text);

    // The reason phrase may itself contain spaces.
    let mut parts = start_line.splitn(3, ' ');
    let (version, code, reason) = match (parts.next(), parts.next(), parts.next()) {
        (Some(v), Some(c), Some(r)) => (v, c, r),
        _ => {
            return Err(WireError::MalformedHead(format!(
                "status line {start_line:?} does not have 3 parts"
            )))
        }
    };
    check_version(version)?;
    let status = parse_status(code)?;

    Ok(ResponseHead {
        version: version.to_string(),
        status,
        reason: reason.to_string(),
        headers: decode_header_lines(header_block)?,
    })
}

/// Decode `method SP target SP version` plus header lines.
pub fn decode_request_head(raw: &[u8]) -> Result<RequestHead, WireError> {
    let text = String::from_utf8_lossy(raw);
    // Servers ignore empty lines ahead of a request line.
    let text = text.trim_start_matches("\r\n");
    let (start_line, header_block) = split_start_line(text);

    let parts: Vec<&str> = start_line.split(' ').collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(WireError::MalformedHead(format!(
            "request line {start_line:?} does not have 3 parts"
        )));
    };
    if target.is_empty() {
        return Err(WireError::MalformedHead("empty request target".into()));
    }
    check_version(version)?;

    Ok(RequestHead {
        method: method.parse()?,
        target: target.to_string(),
        version: version.to_string(),
        headers: decode_header_lines(header_block)?,
    })
}

fn split_start_line(text: &str) -> (&str, &str) {
    text.split_once("\r\n").unwrap_or((text, ""))
}

fn check_version(version: &str) -> Result<(), WireError> {
    let valid = version
        .strip_prefix("HTTP/")
        .and_then(|v| v.split_once('.'))
        .map(|(major, minor)| {
            !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|b| b.is_ascii_digit())
                && minor.bytes().all(|b| b.is_ascii_digit())
        })
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(WireError::MalformedHead(format!("invalid protocol version {version:?}")))
    }
}

fn parse_status(code: &str) -> Result<u16, WireError> {
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WireError::MalformedHead(format!("invalid status code {code:?}")));
    }
    match code.parse::<u16>() {
        Ok(status @ 100..=599) => Ok(status),
        _ => Err(WireError::MalformedHead(format!("status code {code} out of range"))),
    }
}

/// Split each line on its first colon, which must be followed by
/// whitespace; repeated names are folded.
fn decode_header_lines(block: &str) -> Result<Headers, WireError> {
    let mut headers = Headers::new();
    for line in block.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(WireError::MalformedHead(format!("header line {line:?} has no colon")));
        };
        // Whitespace between name and colon is a known smuggling vector.
        if name.is_empty() || !name.bytes().all(is_tchar) {
            return Err(WireError::MalformedHead(format!("invalid header name {name:?}")));
        }
        if !value.starts_with([' ', '\t']) {
            return Err(WireError::MalformedHead(format!(
                "header line {line:?} has no whitespace after the colon"
            )));
        }
        headers.append_folded(name, value.trim_matches([' ', '\t']));
    }
    Ok(headers)
}
