//! Client-side TLS.
//!
//! Uses rustls with the Mozilla root set from `webpki-roots`. A
//! [`TlsContext`] is built once per client and shared by every
//! connection it opens.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::error::CirrusError;

#[derive(Clone)]
pub struct TlsContext {
    connector: TlsConnector,
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext").finish_non_exhaustive()
    }
}

impl TlsContext {
    /// Context trusting the bundled web PKI roots.
    pub fn with_webpki_roots() -> Result<Self, CirrusError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| CirrusError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(Self::from_config(Arc::new(config)))
    }

    /// Context over a caller-built rustls configuration.
    pub fn from_config(config: Arc<ClientConfig>) -> Self {
        Self {
            connector: TlsConnector::from(config),
        }
    }

    /// Run the client handshake over `stream`, verifying `host`.
    pub async fn handshake<S>(&self, host: &str, stream: S) -> Result<TlsStream<S>, CirrusError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| CirrusError::Tls(format!("invalid server name `{host}`: {e}")))?;
        self.connector
            .connect(server_name, stream)
            .await
            .map_err(|e| CirrusError::Tls(e.to_string()))
    }
}
