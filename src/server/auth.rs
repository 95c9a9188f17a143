//! Bearer-token guard for a protected path prefix.

use crate::config::AuthConfig;
use crate::server::handlers::{Handler, HandlerError, IncomingRequest};
use crate::wire::OutgoingResponse;

/// Wraps a handler and demands `Authorization: Bearer <token>` for every
/// path at or below `secure_prefix`.
///
/// The token is fixed when the guard is built and never changes.
#[derive(Debug, Clone)]
pub struct BearerGuard<H> {
    inner: H,
    prefix: String,
    token: String,
}

impl<H: Handler> BearerGuard<H> {
    pub fn new(inner: H, config: &AuthConfig) -> Self {
        Self {
            inner,
            prefix: config.secure_prefix.trim_end_matches('/').to_string(),
            token: config.bearer_token.clone(),
        }
    }

    fn protects(&self, path: &str) -> bool {
        if self.prefix.is_empty() {
            return false;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    fn authorized(&self, request: &IncomingRequest) -> bool {
        request
            .head
            .headers
            .get("authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|presented| presented == self.token)
    }
}

impl<H: Handler> Handler for BearerGuard<H> {
    fn handle(&self, request: &IncomingRequest) -> Result<OutgoingResponse, HandlerError> {
        if self.protects(request.path()) && !self.authorized(request) {
            tracing::warn!(path = %request.path(), "Rejected request without a valid bearer token");
            return Ok(OutgoingResponse::with_text(401, "text/plain", "Unauthorized")
                .with_header("WWW-Authenticate", "Bearer"));
        }
        self.inner.handle(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::handlers::DemoHandler;
    use crate::wire::framer;
    use bytes::Bytes;

    fn guard() -> BearerGuard<DemoHandler> {
        BearerGuard::new(
            DemoHandler,
            &AuthConfig {
                secure_prefix: "/secure".into(),
                bearer_token: "s3cret".into(),
            },
        )
    }

    fn get(target: &str, authorization: Option<&str>) -> IncomingRequest {
        let mut head = format!("GET {target} HTTP/1.1\r\n");
        if let Some(value) = authorization {
            head.push_str(&format!("Authorization: {value}\r\n"));
        }
        IncomingRequest {
            head: framer::decode_request_head(head.as_bytes()).unwrap(),
            raw_head: Bytes::from(head),
            body: Bytes::new(),
        }
    }

    #[test]
    fn missing_or_wrong_token_is_unauthorized() {
        for auth in [None, Some("Bearer nope"), Some("Basic s3cret"), Some("Bearer ")] {
            let response = guard().handle(&get("/secure/x", auth)).unwrap();
            assert_eq!(response.status, 401, "{auth:?}");
            assert_eq!(response.headers.get("www-authenticate"), Some("Bearer"));
        }
    }

    #[test]
    fn correct_token_reaches_the_handler() {
        let response = guard()
            .handle(&get("/secure/x", Some("Bearer s3cret")))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"Received GET request from /secure/x");
    }

    #[test]
    fn prefix_matches_whole_segments() {
        let guard = guard();
        assert!(guard.protects("/secure"));
        assert!(guard.protects("/secure/a/b"));
        assert!(!guard.protects("/securely"));
        assert!(!guard.protects("/public"));
        assert_eq!(guard.handle(&get("/public?q=1", None)).unwrap().status, 200);
    }
}
