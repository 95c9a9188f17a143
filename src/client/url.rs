//! Target URL as the connection layer needs it: scheme, host, port, path.

use std::fmt;

use url::{Host, Url};

use crate::client::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// An absolute http(s) URL reduced to what a request needs.
///
/// Immutable once parsed. An explicit port is honoured for both schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
    url: Url,
}

impl ParsedUrl {
    /// Parse a URL string. Input without a scheme is treated as http.
    pub fn parse(input: &str) -> Result<Self, ClientError> {
        let input = input.trim();
        let absolute = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{input}")
        };
        let url = Url::parse(&absolute)
            .map_err(|e| ClientError::InvalidUrl(format!("{input}: {e}")))?;
        Self::from_url(url)
    }

    /// Resolve a `Location` value, absolute or relative, against this URL.
    pub fn join(&self, location: &str) -> Result<Self, ClientError> {
        let url = self
            .url
            .join(location.trim())
            .map_err(|e| ClientError::InvalidUrl(format!("{location}: {e}")))?;
        Self::from_url(url)
    }

    fn from_url(url: Url) -> Result<Self, ClientError> {
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(ClientError::InvalidUrl(format!(
                    "unsupported scheme {other:?} in {url}"
                )))
            }
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(ClientError::InvalidUrl(format!("no host in {url}"))),
        };
        let port = url.port().unwrap_or(scheme.default_port());
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok(Self {
            scheme,
            host,
            port,
            path,
            url,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host suitable for name resolution (IPv6 without brackets).
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Origin-form request target: path plus query, never empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `Host` header value; the port is omitted when it is the default.
    pub fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == self.scheme.default_port() {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }

    /// Same scheme, host and port.
    pub fn same_origin(&self, other: &ParsedUrl) -> bool {
        self.scheme == other.scheme
            && self.host.eq_ignore_ascii_case(&other.host)
            && self.port == other.port
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scheme_port_and_path() {
        let url = ParsedUrl::parse("example.com").unwrap();
        assert_eq!(url.scheme(), Scheme::Http);
        assert_eq!(url.host(), "example.com");
        assert_eq!(url.port(), 80);
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn https_defaults_to_443() {
        let url = ParsedUrl::parse("https://example.com/a/b").unwrap();
        assert_eq!(url.scheme(), Scheme::Https);
        assert_eq!(url.port(), 443);
        assert_eq!(url.path(), "/a/b");
        assert_eq!(url.authority(), "example.com");
    }

    #[test]
    fn https_keeps_explicit_port() {
        let url = ParsedUrl::parse("https://example.com:8443/").unwrap();
        assert_eq!(url.port(), 8443);
        assert_eq!(url.authority(), "example.com:8443");
    }

    #[test]
    fn query_is_part_of_the_target() {
        let url = ParsedUrl::parse("http://localhost:8080/search?q=rust&n=1#frag").unwrap();
        assert_eq!(url.port(), 8080);
        assert_eq!(url.path(), "/search?q=rust&n=1");
    }

    #[test]
    fn ipv6_hosts_are_bracketed_only_in_authority() {
        let url = ParsedUrl::parse("http://[::1]:9000/").unwrap();
        assert_eq!(url.host(), "::1");
        assert_eq!(url.authority(), "[::1]:9000");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            ParsedUrl::parse("ftp://example.com/file"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn join_resolves_relative_locations() {
        let base = ParsedUrl::parse("http://example.com/a/b").unwrap();
        assert_eq!(base.join("/c").unwrap().path(), "/c");
        assert_eq!(base.join("d").unwrap().path(), "/a/d");

        let moved = base.join("https://other.org:8443/x").unwrap();
        assert_eq!(moved.scheme(), Scheme::Https);
        assert_eq!(moved.host(), "other.org");
        assert!(!base.same_origin(&moved));
        assert!(base.same_origin(&base.join("/elsewhere").unwrap()));
    }
}
