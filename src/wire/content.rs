//! Content-coding and charset decoding applied after the body is framed.

use std::io::Read;

use bytes::Bytes;
use encoding_rs::Encoding;
use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};

use crate::wire::error::WireError;
use crate::wire::headers::Headers;

/// A decoded body: text when the charset decoded cleanly, raw bytes otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// Undo every coding listed in `Content-Encoding`, last applied first.
///
/// Unknown codings are left in place so the caller can still inspect the
/// bytes; a coding that is known but does not match the data is an error.
/// Each decoded layer is held to `limit` bytes.
pub fn decode_content(headers: &Headers, body: Bytes, limit: usize) -> Result<Bytes, WireError> {
    let Some(codings) = headers.get("content-encoding") else {
        return Ok(body);
    };
    if body.is_empty() {
        return Ok(body);
    }

    let mut body = body;
    for coding in codings.rsplit(',').map(str::trim) {
        body = match coding.to_ascii_lowercase().as_str() {
            "" | "identity" => body,
            "gzip" | "x-gzip" => inflate(coding, MultiGzDecoder::new(&body[..]), limit)?,
            "deflate" => match inflate(coding, ZlibDecoder::new(&body[..]), limit) {
                // Some servers send raw deflate without the zlib wrapper.
                Err(WireError::ContentDecoding { .. }) => {
                    inflate(coding, DeflateDecoder::new(&body[..]), limit)?
                }
                other => other?,
            },
            other => {
                tracing::debug!(coding = %other, "Leaving unsupported content coding in place");
                return Ok(body);
            }
        };
    }
    Ok(body)
}

fn inflate(coding: &str, decoder: impl Read, limit: usize) -> Result<Bytes, WireError> {
    let mut out = Vec::new();
    decoder
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|source| WireError::ContentDecoding {
            encoding: coding.to_string(),
            source,
        })?;
    if out.len() > limit {
        return Err(WireError::BodyTooLarge { limit });
    }
    Ok(Bytes::from(out))
}

/// The `charset` parameter of `Content-Type`, if any.
pub fn charset(headers: &Headers) -> Option<&str> {
    let content_type = headers.get("content-type")?;
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Decode the body with its declared charset, defaulting to UTF-8.
///
/// An unknown label or bytes invalid in that charset keep the payload
/// binary instead of failing the exchange.
pub fn decode_text(headers: &Headers, body: Bytes) -> Payload {
    let label = charset(headers).unwrap_or("utf-8");
    let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
        tracing::debug!(charset = %label, "Unknown charset, keeping body as bytes");
        return Payload::Binary(body);
    };
    match encoding.decode_without_bom_handling_and_without_replacement(&body) {
        Some(text) => Payload::Text(text.into_owned()),
        None => Payload::Binary(body),
    }
}
