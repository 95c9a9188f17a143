//! One logical client request: connect, exchange, follow redirects.
//!
//! # Responsibilities
//! - Open a fresh socket per attempt (TLS for https targets)
//! - Write the encoded request and decode the final response
//! - Rewrite the request for each redirect hop until the budget runs out

use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, info};

use crate::client::error::ClientError;
use crate::client::tls;
use crate::client::url::{ParsedUrl, Scheme};
use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::wire::content::{self, Payload};
use crate::wire::framer;
use crate::wire::{read_body, Framing, Headers, Method, OutgoingRequest, ResponseHead, StreamReader, WireError};

/// A decoded final response.
#[derive(Debug, Clone)]
pub struct Response {
    pub head: ResponseHead,
    pub body: Payload,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.head.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name)
    }
}

/// HTTP/1.1 client. Holds no per-request state; safe to share.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    tls: TlsConnector,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            config,
            tls: tls::default_connector()?,
        })
    }

    /// Use a caller-built TLS connector, e.g. one trusting a private CA.
    pub fn with_tls_connector(config: ClientConfig, tls: TlsConnector) -> Self {
        Self { config, tls }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request and follow up to `max_redirects` redirects.
    ///
    /// A redirect without `Location`, or one received with no budget left,
    /// is returned to the caller unresolved.
    pub async fn execute(
        &self,
        method: Method,
        url: &ParsedUrl,
        headers: Headers,
        body: Bytes,
        max_redirects: u32,
    ) -> Result<Response, ClientError> {
        let mut url = url.clone();
        let mut request = OutgoingRequest::new(method, url.path())
            .with_headers(headers)
            .with_body(body);
        let mut remaining = max_redirects;

        loop {
            let response = self.send(&url, &request).await?;
            if !response.head.is_redirect() || remaining == 0 {
                return Ok(response);
            }
            let Some(location) = response.header("location") else {
                debug!(status = response.status(), "Redirect without Location");
                return Ok(response);
            };

            let next = url.join(location)?;
            let status = response.status();
            request = redirect_request(&request, status, &url, &next);
            metrics::redirect_followed(status);
            info!(
                status,
                from = %url,
                to = %next,
                method = %request.method,
                remaining = remaining - 1,
                "Following redirect"
            );
            url = next;
            remaining -= 1;
        }
    }

    /// One attempt on a new connection. No redirect handling.
    pub async fn send(
        &self,
        url: &ParsedUrl,
        request: &OutgoingRequest,
    ) -> Result<Response, ClientError> {
        let addr = format!("{}:{}", url.host(), url.port());
        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let request_timeout = Duration::from_secs(self.config.request_timeout_secs);

        let tcp = timeout(connect_timeout, TcpStream::connect((url.host(), url.port())))
            .await
            .map_err(|_| ClientError::Timeout(addr.clone()))?
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let _ = tcp.set_nodelay(true);
        debug!(%addr, method = %request.method, target = %request.target, "Connected");

        match url.scheme() {
            Scheme::Http => timeout(request_timeout, exchange(tcp, request, &self.config))
                .await
                .map_err(|_| ClientError::Timeout(addr))?
                .map_err(ClientError::from),
            Scheme::Https => {
                let name = tls::server_name(url.host())?;
                let stream = timeout(connect_timeout, self.tls.connect(name, tcp))
                    .await
                    .map_err(|_| ClientError::Timeout(addr.clone()))?
                    .map_err(|e| ClientError::Tls(format!("handshake with {addr}: {e}")))?;
                timeout(request_timeout, exchange(stream, request, &self.config))
                    .await
                    .map_err(|_| ClientError::Timeout(addr))?
                    .map_err(ClientError::from)
            }
        }
    }
}

/// Write `request` on `stream` and read the final response.
///
/// Interim 1xx responses (other than 101) are skipped.
pub async fn exchange<S>(
    stream: S,
    request: &OutgoingRequest,
    limits: &ClientConfig,
) -> Result<Response, WireError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = StreamReader::new(stream);
    reader.get_mut().write_all(&request.encode()).await?;
    reader.get_mut().flush().await?;

    loop {
        let raw = reader.read_until(b"\r\n\r\n", limits.max_head_bytes).await?;
        let head = framer::decode_response_head(&raw)?;
        if (100..200).contains(&head.status) && head.status != 101 {
            debug!(status = head.status, "Skipping interim response");
            continue;
        }

        let framing = Framing::for_response(&request.method, head.status, &head.headers)?;
        let body = read_body(&mut reader, framing, limits.max_body_bytes).await?;
        let body = content::decode_content(&head.headers, body, limits.max_body_bytes)?;
        let body = content::decode_text(&head.headers, body);
        return Ok(Response { head, body });
    }
}

/// Build the follow-up request for a redirect from `from` to `to`.
///
/// 303 turns anything but HEAD into a bodiless GET; other redirect codes
/// keep the method and body.
pub fn redirect_request(
    previous: &OutgoingRequest,
    status: u16,
    from: &ParsedUrl,
    to: &ParsedUrl,
) -> OutgoingRequest {
    let (method, body) = if status == 303 && previous.method != Method::Head {
        (Method::Get, Bytes::new())
    } else {
        (previous.method.clone(), previous.body.clone())
    };

    let mut headers = previous.headers.clone();
    if body.is_empty() {
        headers.remove("content-length");
        headers.remove("content-type");
        headers.remove("transfer-encoding");
    }
    if headers.contains("host") {
        headers.insert("Host", to.authority());
    }
    if !from.same_origin(to) && headers.remove("authorization").is_some() {
        debug!(to = %to, "Dropping Authorization on cross-origin redirect");
    }

    OutgoingRequest {
        method,
        target: to.path().to_string(),
        headers,
        body,
    }
}
