//! Service endpoint: where requests go and what `Host` they carry.

use std::fmt;

use crate::error::CirrusError;

/// Conventional port that switches the transport to TLS.
pub const SECURE_PORT: u16 = 443;

const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: u16,
    host_header: String,
}

impl Endpoint {
    /// Parse `scheme://host[:port][/...]`.
    ///
    /// Without an explicit port, `https` maps to 443 and anything else
    /// to 80, and the `Host` header is the bare host name.
    pub fn parse(url: &str) -> Result<Self, CirrusError> {
        let malformed = || CirrusError::MalformedUrl(url.to_string());

        let (scheme, rest) = url.split_once("://").ok_or_else(malformed)?;
        if scheme.is_empty() {
            return Err(malformed());
        }
        let authority = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        // Strip userinfo.
        let authority = authority.rsplit_once('@').map_or(authority, |(_, a)| a);

        let (host, port) = split_host_port(authority).ok_or_else(malformed)?;
        if host.is_empty() {
            return Err(malformed());
        }

        let scheme = scheme.to_ascii_lowercase();
        Ok(match port {
            Some(port) => Self {
                host_header: format!("{host}:{port}"),
                scheme,
                host: host.to_string(),
                port,
            },
            None => Self {
                port: if scheme == "https" { SECURE_PORT } else { DEFAULT_PORT },
                scheme,
                host: host.to_string(),
                host_header: host.to_string(),
            },
        })
    }

    /// Build from a host name and port.
    ///
    /// `hostname` may carry a `:port` suffix; it is kept in the `Host`
    /// header and dropped for connecting.
    pub fn from_host(hostname: &str, port: u16) -> Self {
        let host = match split_host_port(hostname) {
            Some((host, _)) if !host.is_empty() => host,
            _ => hostname,
        };
        Self {
            scheme: if port == SECURE_PORT { "https" } else { "http" }.to_string(),
            host: host.to_string(),
            port,
            host_header: hostname.to_string(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name used for DNS and TLS server name.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Value for the `Host` header.
    pub fn host_header(&self) -> &str {
        &self.host_header
    }

    /// TLS is selected purely by the destination port.
    pub fn is_secure(&self) -> bool {
        self.port == SECURE_PORT
    }

    /// Address string suitable for `TcpStream::connect`.
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host_header)
    }
}

/// Split `host[:port]`, handling IPv6 literals. An unbracketed literal
/// such as `::1` carries no port.
fn split_host_port(authority: &str) -> Option<(&str, Option<u16>)> {
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        return match tail.strip_prefix(':') {
            Some(port) => Some((host, Some(port.parse().ok()?))),
            None if tail.is_empty() => Some((host, None)),
            None => None,
        };
    }
    if authority.matches(':').count() > 1 {
        return Some((authority, None));
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => Some((host, Some(port.parse().ok()?))),
        None => Some((authority, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_defaults_to_secure_port() {
        let ep = Endpoint::parse("https://sqs.us-east-1.amazonaws.com/").unwrap();
        assert_eq!(ep.port(), 443);
        assert!(ep.is_secure());
        assert_eq!(ep.host_header(), "sqs.us-east-1.amazonaws.com");
    }

    #[test]
    fn http_defaults_to_port_80() {
        let ep = Endpoint::parse("http://example.com").unwrap();
        assert_eq!(ep.port(), 80);
        assert!(!ep.is_secure());
    }

    #[test]
    fn explicit_port_lands_in_host_header() {
        let ep = Endpoint::parse("http://localhost:8000/path?x=1").unwrap();
        assert_eq!(ep.host(), "localhost");
        assert_eq!(ep.port(), 8000);
        assert_eq!(ep.host_header(), "localhost:8000");
        assert_eq!(ep.socket_addr(), "localhost:8000");
    }

    #[test]
    fn tls_follows_port_not_scheme() {
        let ep = Endpoint::parse("http://example.com:443").unwrap();
        assert!(ep.is_secure());
        let ep = Endpoint::parse("https://example.com:8443").unwrap();
        assert!(!ep.is_secure());
    }

    #[test]
    fn ipv6_literal() {
        let ep = Endpoint::parse("http://[::1]:9000").unwrap();
        assert_eq!(ep.host(), "::1");
        assert_eq!(ep.socket_addr(), "[::1]:9000");
    }

    #[test]
    fn missing_scheme_or_host_is_malformed() {
        assert!(matches!(
            Endpoint::parse("example.com"),
            Err(CirrusError::MalformedUrl(_))
        ));
        assert!(matches!(
            Endpoint::parse("http:///path"),
            Err(CirrusError::MalformedUrl(_))
        ));
        assert!(matches!(
            Endpoint::parse("://example.com"),
            Err(CirrusError::MalformedUrl(_))
        ));
        assert!(Endpoint::parse("http://example.com:notaport").is_err());
    }

    #[test]
    fn from_host_strips_port_for_connecting() {
        let ep = Endpoint::from_host("localhost:8080", 8080);
        assert_eq!(ep.host(), "localhost");
        assert_eq!(ep.host_header(), "localhost:8080");
        assert_eq!(ep.to_string(), "http://localhost:8080");
    }

    #[test]
    fn from_host_keeps_ipv6_literals() {
        let ep = Endpoint::from_host("::1", 9000);
        assert_eq!(ep.host(), "::1");
        assert_eq!(ep.socket_addr(), "[::1]:9000");

        let ep = Endpoint::from_host("[::1]:9000", 9000);
        assert_eq!(ep.host(), "::1");
        assert_eq!(ep.host_header(), "[::1]:9000");
    }
}
