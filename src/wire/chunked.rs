//! Chunked transfer-coding encoder.

/// Encode `body` as chunks of at most `chunk_len` bytes, followed by the
/// zero-size last chunk and an empty trailer section.
pub fn encode_chunked(body: &[u8], chunk_len: usize) -> Vec<u8> {
    let chunk_len = chunk_len.max(1);
    let mut out = Vec::with_capacity(body.len() + body.len() / chunk_len * 8 + 8);
    for chunk in body.chunks(chunk_len) {
        out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}
