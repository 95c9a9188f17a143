//! Body framing selection and body reading.
//!
//! # Framing Rules
//! ```text
//! HEAD request / 1xx / 204 / 304        → NoBody
//! Transfer-Encoding + Content-Length    → AmbiguousFraming error
//! Transfer-Encoding ending in chunked   → Chunked
//! other Transfer-Encoding               → ReadToClose (responses), error (requests)
//! Content-Length                        → FixedLength(n)
//! nothing                               → ReadToClose (responses), NoBody (requests)
//! ```
//!
//! Selection is a pure function of the method/status and the headers;
//! reading is driven by the selected mode against a [`StreamReader`].

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;

use crate::wire::error::WireError;
use crate::wire::headers::Headers;
use crate::wire::message::Method;
use crate::wire::reader::StreamReader;

/// Longest accepted chunk size line, extensions included.
const MAX_CHUNK_LINE: usize = 4 * 1024;

/// Largest size of a single trailer section.
const MAX_TRAILER_BYTES: usize = 16 * 1024;

/// How the end of a message body is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    NoBody,
    FixedLength(u64),
    Chunked,
    ReadToClose,
}

impl Framing {
    /// Framing of a response to a request made with `request_method`.
    pub fn for_response(
        request_method: &Method,
        status: u16,
        headers: &Headers,
    ) -> Result<Self, WireError> {
        if *request_method == Method::Head || matches!(status, 100..=199 | 204 | 304) {
            return Ok(Framing::NoBody);
        }
        match declared(headers)? {
            Declared::Chunked => Ok(Framing::Chunked),
            Declared::Length(n) => Ok(Framing::FixedLength(n)),
            Declared::OtherCoding(_) | Declared::Nothing => Ok(Framing::ReadToClose),
        }
    }

    /// Framing of a request body. Requests are never close-delimited.
    pub fn for_request(headers: &Headers) -> Result<Self, WireError> {
        match declared(headers)? {
            Declared::Chunked => Ok(Framing::Chunked),
            Declared::Length(0) | Declared::Nothing => Ok(Framing::NoBody),
            Declared::Length(n) => Ok(Framing::FixedLength(n)),
            Declared::OtherCoding(coding) => Err(WireError::UnsupportedTransferCoding(coding)),
        }
    }
}

enum Declared {
    Chunked,
    Length(u64),
    OtherCoding(String),
    Nothing,
}

fn declared(headers: &Headers) -> Result<Declared, WireError> {
    match (headers.get("transfer-encoding"), headers.get("content-length")) {
        (Some(_), Some(_)) => Err(WireError::AmbiguousFraming),
        (Some(te), None) => {
            // Chunked must be the final coding to delimit the message.
            let last = te.rsplit(',').next().unwrap_or("").trim();
            if last.eq_ignore_ascii_case("chunked") {
                Ok(Declared::Chunked)
            } else {
                Ok(Declared::OtherCoding(te.to_string()))
            }
        }
        (None, Some(cl)) => parse_content_length(cl).map(Declared::Length),
        (None, None) => Ok(Declared::Nothing),
    }
}

/// Parse a Content-Length value. Folded duplicates must all agree.
pub fn parse_content_length(value: &str) -> Result<u64, WireError> {
    let mut result = None;
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WireError::InvalidContentLength(value.to_string()));
        }
        let n: u64 = part
            .parse()
            .map_err(|_| WireError::InvalidContentLength(value.to_string()))?;
        match result {
            Some(prev) if prev != n => {
                return Err(WireError::InvalidContentLength(value.to_string()))
            }
            _ => result = Some(n),
        }
    }
    result.ok_or_else(|| WireError::InvalidContentLength(value.to_string()))
}

/// Read a body under `framing`, refusing more than `limit` bytes.
pub async fn read_body<S: AsyncRead + Unpin>(
    reader: &mut StreamReader<S>,
    framing: Framing,
    limit: usize,
) -> Result<Bytes, WireError> {
    match framing {
        Framing::NoBody => Ok(Bytes::new()),
        Framing::FixedLength(n) => {
            let n = usize::try_from(n).map_err(|_| WireError::BodyTooLarge { limit })?;
            if n > limit {
                return Err(WireError::BodyTooLarge { limit });
            }
            reader.read_exact(n).await
        }
        Framing::Chunked => read_chunked(reader, limit).await,
        Framing::ReadToClose => reader.read_to_end(limit).await,
    }
}

async fn read_chunked<S: AsyncRead + Unpin>(
    reader: &mut StreamReader<S>,
    limit: usize,
) -> Result<Bytes, WireError> {
    let mut body = BytesMut::new();
    loop {
        let line = reader
            .read_until(b"\r\n", MAX_CHUNK_LINE)
            .await
            .map_err(chunk_error("chunk size line"))?;
        let size = parse_chunk_size(&line)?;
        if size == 0 {
            skip_trailers(reader).await?;
            return Ok(body.freeze());
        }
        if body.len().saturating_add(size) > limit {
            return Err(WireError::BodyTooLarge { limit });
        }
        let data = reader
            .read_exact(size)
            .await
            .map_err(chunk_error("chunk data"))?;
        body.extend_from_slice(&data);

        let terminator = reader
            .read_exact(2)
            .await
            .map_err(chunk_error("chunk terminator"))?;
        if &terminator[..] != b"\r\n" {
            return Err(WireError::ChunkFraming(format!(
                "chunk of {size} bytes not followed by CRLF"
            )));
        }
    }
}

/// Trailer fields are read and discarded up to the closing blank line.
async fn skip_trailers<S: AsyncRead + Unpin>(reader: &mut StreamReader<S>) -> Result<(), WireError> {
    let mut seen = 0;
    loop {
        let line = reader
            .read_until(b"\r\n", MAX_TRAILER_BYTES)
            .await
            .map_err(chunk_error("trailer section"))?;
        if line.is_empty() {
            return Ok(());
        }
        seen += line.len() + 2;
        if seen > MAX_TRAILER_BYTES {
            return Err(WireError::ChunkFraming("trailer section too large".into()));
        }
    }
}

/// Parse the hex digits ahead of any `;` extension.
pub fn parse_chunk_size(line: &[u8]) -> Result<usize, WireError> {
    let digits = line.split(|&b| b == b';').next().unwrap_or_default();
    let digits = std::str::from_utf8(digits)
        .map_err(|_| WireError::ChunkFraming("chunk size is not ASCII".into()))?
        .trim_matches([' ', '\t']);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(WireError::ChunkFraming(format!(
            "chunk size {digits:?} is not hexadecimal"
        )));
    }
    usize::from_str_radix(digits, 16)
        .map_err(|_| WireError::ChunkFraming(format!("chunk size {digits} overflows")))
}

/// Inside a chunked body, running out of bytes is a framing error.
fn chunk_error(stage: &'static str) -> impl Fn(WireError) -> WireError {
    move |err| match err {
        WireError::TruncatedStream { received } => WireError::ChunkFraming(format!(
            "stream closed in {stage} after {received} bytes"
        )),
        WireError::HeadTooLarge { .. } => WireError::ChunkFraming(format!("{stage} too long")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::chunked::encode_chunked;

    const LIMIT: usize = 1 << 20;

    async fn decode(raw: &[u8], framing: Framing) -> Result<Bytes, WireError> {
        let mut reader = StreamReader::new(raw);
        read_body(&mut reader, framing, LIMIT).await
    }

    #[test]
    fn head_and_bodiless_statuses_have_no_body() {
        let headers = Headers::new().with("Content-Length", "10");
        for status in [100, 204, 304] {
            assert_eq!(
                Framing::for_response(&Method::Get, status, &headers).unwrap(),
                Framing::NoBody
            );
        }
        assert_eq!(
            Framing::for_response(&Method::Head, 200, &headers).unwrap(),
            Framing::NoBody
        );
    }

    #[test]
    fn response_framing_selection() {
        let chunked = Headers::new().with("Transfer-Encoding", "gzip, chunked");
        let fixed = Headers::new().with("Content-Length", "5");
        let other = Headers::new().with("Transfer-Encoding", "gzip");
        assert_eq!(Framing::for_response(&Method::Get, 200, &chunked).unwrap(), Framing::Chunked);
        assert_eq!(
            Framing::for_response(&Method::Get, 200, &fixed).unwrap(),
            Framing::FixedLength(5)
        );
        assert_eq!(Framing::for_response(&Method::Get, 200, &other).unwrap(), Framing::ReadToClose);
        assert_eq!(
            Framing::for_response(&Method::Get, 200, &Headers::new()).unwrap(),
            Framing::ReadToClose
        );
    }

    #[test]
    fn both_length_indicators_are_ambiguous() {
        let headers = Headers::new()
            .with("Transfer-Encoding", "chunked")
            .with("Content-Length", "4");
        assert!(matches!(
            Framing::for_response(&Method::Get, 200, &headers),
            Err(WireError::AmbiguousFraming)
        ));
        assert!(matches!(Framing::for_request(&headers), Err(WireError::AmbiguousFraming)));
    }

    #[test]
    fn request_framing_selection() {
        assert_eq!(Framing::for_request(&Headers::new()).unwrap(), Framing::NoBody);
        let gzip = Headers::new().with("Transfer-Encoding", "gzip");
        assert!(matches!(
            Framing::for_request(&gzip),
            Err(WireError::UnsupportedTransferCoding(_))
        ));
    }

    #[test]
    fn content_length_validation() {
        assert_eq!(parse_content_length("42").unwrap(), 42);
        assert_eq!(parse_content_length("7, 7").unwrap(), 7);
        assert!(parse_content_length("7, 8").is_err());
        assert!(parse_content_length("-1").is_err());
        assert!(parse_content_length("+5").is_err());
        assert!(parse_content_length("").is_err());
    }

    #[test]
    fn chunk_size_parsing() {
        assert_eq!(parse_chunk_size(b"1a").unwrap(), 26);
        assert_eq!(parse_chunk_size(b"FF;name=value").unwrap(), 255);
        assert_eq!(parse_chunk_size(b"0").unwrap(), 0);
        assert!(matches!(parse_chunk_size(b"zz"), Err(WireError::ChunkFraming(_))));
        assert!(matches!(parse_chunk_size(b""), Err(WireError::ChunkFraming(_))));
        assert!(parse_chunk_size(b"ffffffffffffffffffff").is_err());
    }

    #[tokio::test]
    async fn fixed_length_reads_exactly() {
        let mut reader = StreamReader::new(&b"helloEXTRA"[..]);
        let body = read_body(&mut reader, Framing::FixedLength(5), LIMIT).await.unwrap();
        assert_eq!(&body[..], b"hello");
        assert_eq!(reader.buffered(), b"EXTRA");
    }

    #[tokio::test]
    async fn fixed_length_short_stream_is_truncated() {
        let err = decode(b"hel", Framing::FixedLength(5)).await.unwrap_err();
        assert!(matches!(err, WireError::TruncatedStream { .. }));
    }

    #[tokio::test]
    async fn chunked_round_trip_various_splits() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        for chunk_len in [1, 7, 64, 1000, 4096] {
            let wire = encode_chunked(&payload, chunk_len);
            let body = decode(&wire, Framing::Chunked).await.unwrap();
            assert_eq!(&body[..], &payload[..], "chunk_len {chunk_len}");
        }
        let empty = encode_chunked(b"", 16);
        assert!(decode(&empty, Framing::Chunked).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunk_extensions_and_trailers_are_skipped() {
        let wire = b"4;ext=1\r\nWiki\r\n5\r\npedia\r\n0\r\nExpires: never\r\nX-Sum: 1\r\n\r\nNEXT";
        let mut reader = StreamReader::new(&wire[..]);
        let body = read_body(&mut reader, Framing::Chunked, LIMIT).await.unwrap();
        assert_eq!(&body[..], b"Wikipedia");
        assert_eq!(reader.buffered(), b"NEXT");
    }

    #[tokio::test]
    async fn truncated_chunk_is_framing_error() {
        let err = decode(b"a\r\nshort", Framing::Chunked).await.unwrap_err();
        assert!(matches!(err, WireError::ChunkFraming(_)));
    }

    #[tokio::test]
    async fn missing_chunk_crlf_is_framing_error() {
        let err = decode(b"3\r\nabcXY0\r\n\r\n", Framing::Chunked).await.unwrap_err();
        assert!(matches!(err, WireError::ChunkFraming(_)));
    }

    #[tokio::test]
    async fn bad_hex_is_framing_error() {
        let err = decode(b"xyz\r\ndata\r\n", Framing::Chunked).await.unwrap_err();
        assert!(matches!(err, WireError::ChunkFraming(_)));
    }

    #[tokio::test]
    async fn body_limit_applies_to_every_mode() {
        let mut reader = StreamReader::new(&b"0123456789"[..]);
        let err = read_body(&mut reader, Framing::FixedLength(10), 4).await.unwrap_err();
        assert!(matches!(err, WireError::BodyTooLarge { limit: 4 }));

        let wire = encode_chunked(b"0123456789", 3);
        let mut reader = StreamReader::new(&wire[..]);
        let err = read_body(&mut reader, Framing::Chunked, 4).await.unwrap_err();
        assert!(matches!(err, WireError::BodyTooLarge { limit: 4 }));

        let data = vec![b'x'; 20_000];
        let mut reader = StreamReader::new(&data[..]);
        let err = read_body(&mut reader, Framing::ReadToClose, 1000).await.unwrap_err();
        assert!(matches!(err, WireError::BodyTooLarge { limit: 1000 }));
    }

    #[tokio::test]
    async fn no_body_leaves_stream_untouched() {
        let mut reader = StreamReader::new(&b"GET / HTTP/1.1\r\n\r\n"[..]);
        let body = read_body(&mut reader, Framing::NoBody, LIMIT).await.unwrap();
        assert!(body.is_empty());
        assert!(reader.buffered().is_empty());
        assert!(reader.has_more().await.unwrap());
    }
}
