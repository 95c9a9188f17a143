//! Accept loop and per-connection request dispatch.
//!
//! # Responsibilities
//! - Accept connections until shutdown, one task per connection
//! - Read requests one at a time under the idle and request deadlines
//! - Answer wire-level rejections (400/411/413/431/501) before closing
//! - Turn handler failures and panics into 500 responses
//! - Drain in-flight connections on shutdown

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::config::{LimitsConfig, WireConfig};
use crate::lifecycle::ShutdownSignal;
use crate::net::{Accepted, ConnectionId, ConnectionTracker, Listener, ListenerError};
use crate::observability::metrics;
use crate::server::handlers::{Handler, IncomingRequest};
use crate::wire::message::{HTTP_1_0, HTTP_1_1};
use crate::wire::{framer, read_body, Framing, Method, OutgoingResponse, StreamReader, WireError};

/// HTTP/1.1 server around a [`Handler`].
pub struct Server<H> {
    ctx: Arc<ServerContext<H>>,
}

/// Read-only state shared by every connection task.
struct ServerContext<H> {
    config: Arc<WireConfig>,
    handler: H,
    tls: Option<TlsAcceptor>,
    tracker: ConnectionTracker,
}

impl<H: Handler> Server<H> {
    pub fn new(config: Arc<WireConfig>, handler: H, tls: Option<TlsAcceptor>) -> Self {
        Self {
            ctx: Arc::new(ServerContext {
                config,
                handler,
                tls,
                tracker: ConnectionTracker::new(),
            }),
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.ctx.tracker
    }

    /// Accept connections until `shutdown` fires, then drain.
    ///
    /// A faulting connection never stops the loop; only a closed listener
    /// does.
    pub async fn run(
        &self,
        listener: Listener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        info!(
            address = ?listener.local_addr().ok(),
            tls = self.ctx.tls.is_some(),
            "HTTP server starting"
        );

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };
            let Accepted { stream, peer, slot } = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Accept(e)) => {
                    warn!(error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let ctx = Arc::clone(&self.ctx);
            let guard = ctx.tracker.track();
            let signal = shutdown.clone();
            let span = info_span!("connection", connection_id = %guard.id(), peer = %peer);
            tokio::spawn(
                async move {
                    let _slot = slot;
                    ctx.handle_stream(stream, guard.id(), signal).await;
                    drop(guard);
                }
                .instrument(span),
            );
        }

        info!(
            active = self.ctx.tracker.active_count(),
            "Stopped accepting connections"
        );
        let grace = Duration::from_secs(self.ctx.config.timeouts.shutdown_grace_secs);
        if !self.ctx.tracker.wait_for_drain(grace).await {
            warn!(
                remaining = self.ctx.tracker.active_count(),
                "Shutdown grace period elapsed with connections still open"
            );
        }
        info!("HTTP server stopped");
        Ok(())
    }
}

impl<H: Handler> ServerContext<H> {
    async fn handle_stream(&self, stream: TcpStream, id: ConnectionId, shutdown: ShutdownSignal) {
        let _ = stream.set_nodelay(true);
        debug!(connection_id = %id, "Connection opened");
        match &self.tls {
            None => self.serve_connection(stream, shutdown).await,
            Some(acceptor) => {
                let deadline = Duration::from_secs(self.config.timeouts.request_secs);
                match timeout(deadline, acceptor.accept(stream)).await {
                    Ok(Ok(tls)) => self.serve_connection(tls, shutdown).await,
                    Ok(Err(e)) => debug!(error = %e, "TLS handshake failed"),
                    Err(_) => debug!("TLS handshake timed out"),
                }
            }
        }
    }

    /// Serve requests on one connection until it should close.
    async fn serve_connection<S>(&self, stream: S, mut shutdown: ShutdownSignal)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let idle = Duration::from_secs(self.config.timeouts.idle_secs);
        let mut reader = StreamReader::new(stream);

        loop {
            let next = tokio::select! {
                biased;
                next = timeout(idle, reader.has_more()) => next,
                _ = shutdown.recv() => {
                    debug!("Closing idle connection for shutdown");
                    break;
                }
            };
            match next {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    trace!("Peer closed connection");
                    break;
                }
                Ok(Err(e)) => {
                    debug!(error = %e, "Read failed while idle");
                    break;
                }
                Err(_) => {
                    debug!(idle_secs = idle.as_secs(), "Idle timeout");
                    break;
                }
            }

            let request_id = Uuid::new_v4();
            let keep_alive = self
                .serve_one(&mut reader)
                .instrument(info_span!("request", request_id = %request_id))
                .await;
            if !keep_alive {
                break;
            }
        }

        let _ = reader.get_mut().shutdown().await;
    }

    /// Read, dispatch and answer one request. Returns whether to keep going.
    async fn serve_one<S>(&self, reader: &mut StreamReader<S>) -> bool
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let start = Instant::now();
        let deadline = Duration::from_secs(self.config.timeouts.request_secs);

        let request = match timeout(deadline, read_request(reader, &self.config.limits)).await {
            Ok(Ok(request)) => request,
            Ok(Err(e)) => {
                self.reject(reader, &e, start).await;
                return false;
            }
            Err(_) => {
                debug!("Timed out reading request");
                return false;
            }
        };

        let method = request.head.method.clone();
        let keep_alive = request.head.keep_alive();
        let version = if request.head.version == HTTP_1_0 {
            HTTP_1_0
        } else {
            HTTP_1_1
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handler.handle(&request)));
        let (mut response, keep_alive) = match outcome {
            Ok(Ok(response)) => (response, keep_alive),
            Ok(Err(e)) => {
                error!(error = %e, method = %method, target = %request.head.target, "Handler failed");
                (internal_error(), false)
            }
            Err(_) => {
                error!(method = %method, target = %request.head.target, "Handler panicked");
                (internal_error(), false)
            }
        };

        response.version = version.to_string();
        if !response.headers.contains("content-length") {
            response
                .headers
                .insert("Content-Length", response.body.len().to_string());
        }
        if !keep_alive {
            response.headers.insert("Connection", "close");
        } else if version == HTTP_1_0 {
            response.headers.insert("Connection", "keep-alive");
        }

        let status = response.status;
        if let Err(e) = write_response(reader, &response).await {
            debug!(error = %e, "Failed to write response");
            return false;
        }

        metrics::record_request(method_label(&method), status, start);
        info!(
            method = %method,
            target = %request.head.target,
            status,
            keep_alive,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request served"
        );
        keep_alive
    }

    /// Answer a request that failed before reaching the handler, if the
    /// failure allows a response at all.
    async fn reject<S>(&self, reader: &mut StreamReader<S>, err: &WireError, start: Instant)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let Some(response) = rejection(err) else {
            debug!(error = %err, "Closing connection without a response");
            return;
        };
        warn!(error = %err, status = response.status, "Rejecting request");
        if let Err(e) = write_response(reader, &response).await {
            debug!(error = %e, "Failed to write rejection");
        }
        metrics::record_request("INVALID", response.status, start);
    }
}

/// Read one complete request: head, then body under the configured limits.
async fn read_request<S>(
    reader: &mut StreamReader<S>,
    limits: &LimitsConfig,
) -> Result<IncomingRequest, WireError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let raw_head = reader.read_until(b"\r\n\r\n", limits.max_head_bytes).await?;
    let head = framer::decode_request_head(&raw_head)?;
    let framing = Framing::for_request(&head.headers)?;
    if framing == Framing::Chunked && !limits.accept_chunked_requests {
        return Err(WireError::ChunkedRequestRefused);
    }
    if framing != Framing::NoBody && head.headers.has_token("expect", "100-continue") {
        reader
            .get_mut()
            .write_all(b"HTTP/1.1 100 Continue\r\n\r\n")
            .await?;
    }
    let body = read_body(reader, framing, limits.max_body_bytes).await?;
    trace!(method = %head.method, target = %head.target, body_len = body.len(), "Request read");
    Ok(IncomingRequest {
        head,
        raw_head,
        body,
    })
}

/// Response for a wire-level failure, or `None` when the peer is gone.
fn rejection(err: &WireError) -> Option<OutgoingResponse> {
    let status = err.status_hint()?;
    let body = if status == 400 {
        format!("Malformed request: {err}")
    } else {
        err.to_string()
    };
    Some(OutgoingResponse::with_text(status, "text/plain", body).with_header("Connection", "close"))
}

/// Metric label for a request method. Extension tokens share one label.
fn method_label(method: &Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Head => "HEAD",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        Method::Options => "OPTIONS",
        Method::Trace => "TRACE",
        Method::Connect => "CONNECT",
        Method::Patch => "PATCH",
        Method::Extension(_) => "OTHER",
    }
}

fn internal_error() -> OutgoingResponse {
    OutgoingResponse::with_text(500, "text/plain", "Internal Server Error")
}

async fn write_response<S>(
    reader: &mut StreamReader<S>,
    response: &OutgoingResponse,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let stream = reader.get_mut();
    stream.write_all(&response.encode()).await?;
    stream.flush().await
}
