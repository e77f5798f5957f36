//! One request over one connection.
//!
//! [`execute`] opens a TCP connection to the endpoint, upgrades it to TLS
//! when the port calls for it, and hands the stream to [`drive`], which
//! writes the request and feeds decoded events through the response
//! state machine until a response is complete.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_rustls::client::TlsStream;
use tokio_util::codec::Framed;

use crate::endpoint::Endpoint;
use crate::error::CirrusError;
use crate::request::Request;
use crate::response::Response;
use crate::transport::codec::HttpCodec;
use crate::transport::state::ResponseState;
use crate::transport::tls::TlsContext;

/// Default bound on connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Send `request` to `endpoint` and wait for the full response.
///
/// `connect_timeout` covers DNS, TCP connect and the TLS handshake.
/// Reading the response is unbounded.
pub async fn execute(
    endpoint: &Endpoint,
    request: Request,
    connect_timeout: Duration,
    tls: Option<&TlsContext>,
) -> Result<Response, CirrusError> {
    let tls = match (endpoint.is_secure(), tls) {
        (false, _) => None,
        (true, Some(tls)) => Some(tls),
        (true, None) => return Err(CirrusError::Tls("no tls context configured".into())),
    };

    let deadline = Instant::now() + connect_timeout;
    let addr = endpoint.socket_addr();

    tracing::debug!(%addr, "connecting");
    let stream = tokio::time::timeout_at(deadline, TcpStream::connect(&addr))
        .await
        .map_err(|_| CirrusError::ConnectTimeout(connect_timeout))??;
    stream.set_nodelay(true)?;

    match tls {
        None => drive(stream, request).await,
        Some(tls) => {
            let stream = upgrade(tls, endpoint.host(), stream, deadline, connect_timeout).await?;
            drive(stream, request).await
        }
    }
}

/// Run the TLS handshake on `stream`, giving up at `deadline`.
pub async fn upgrade<S>(
    tls: &TlsContext,
    host: &str,
    stream: S,
    deadline: Instant,
    connect_timeout: Duration,
) -> Result<TlsStream<S>, CirrusError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tracing::debug!(host, "tls handshake");
    tokio::time::timeout_at(deadline, tls.handshake(host, stream))
        .await
        .map_err(|_| CirrusError::ConnectTimeout(connect_timeout))?
}

/// Write `request` on `stream` and parse the reply.
///
/// Exactly one outcome is produced: the first completed response, or
/// the first framing, protocol or I/O error.
pub async fn drive<S>(stream: S, request: Request) -> Result<Response, CirrusError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, HttpCodec::new(request.method()));
    framed.send(request).await?;

    let mut state = ResponseState::default();
    while let Some(event) = framed.next().await {
        if let Some(response) = state.on_event(event?)? {
            tracing::debug!(
                status = response.status(),
                body = response.body().len(),
                "response completed"
            );
            return Ok(response);
        }
    }

    // The codec reports early EOF itself; this covers a stream that ends
    // without ever reaching EOF handling.
    Err(CirrusError::ConnectionClosed)
}
