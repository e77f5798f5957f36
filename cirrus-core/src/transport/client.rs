//! HTTP transport client.

use std::sync::Arc;

use crate::config::TransportConfig;
use crate::endpoint::Endpoint;
use crate::error::CirrusError;
use crate::pool::{ExecutionContext, WorkerPool};
use crate::request::Request;
use crate::response::Response;
use crate::transport::codec::apply_fixed_headers;
use crate::transport::connection::execute;
use crate::transport::hook::{HookChain, RequestHook};
use crate::transport::settle::{pending, ResponseFuture};
use crate::transport::tls::TlsContext;

/// Sends requests to one endpoint, one connection per request.
///
/// Cloning is cheap; clones share the worker pool and hooks.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    endpoint: Endpoint,
    config: TransportConfig,
    pool: Arc<WorkerPool>,
    hooks: HookChain,
    tls: Option<TlsContext>,
}

impl HttpClient {
    /// Client with its own worker pool sized from `config`.
    pub fn new(endpoint: Endpoint, config: TransportConfig) -> Result<Self, CirrusError> {
        Self::builder(endpoint, config).build()
    }

    pub fn builder(endpoint: Endpoint, config: TransportConfig) -> HttpClientBuilder {
        HttpClientBuilder {
            endpoint,
            config,
            pool: None,
            hooks: HookChain::new(),
            tls: None,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.inner.pool
    }

    /// Send `request`.
    ///
    /// Called from a worker of this client's pool, the connection stays
    /// on that worker; otherwise the next worker is used.
    pub fn connect(&self, request: Request) -> ResponseFuture {
        match self.inner.pool.current_or_next() {
            Ok(ctx) => self.connect_on(&ctx, request),
            Err(e) => ResponseFuture::failed(e),
        }
    }

    /// Send `request` with the connection owned by `ctx`.
    pub fn connect_on(&self, ctx: &ExecutionContext, request: Request) -> ResponseFuture {
        let request = self.prepare(request);
        let inner = self.inner.clone();
        let (settle, future) = pending();

        let spawned = ctx.spawn(async move {
            let result = execute(
                &inner.endpoint,
                request,
                inner.config.connect_timeout(),
                inner.tls.as_ref(),
            )
            .await;
            if let Err(e) = &result {
                tracing::warn!(endpoint = %inner.endpoint, error = %e, "request failed");
            }
            settle.settle(result);
        });

        match spawned {
            Ok(_) => future,
            Err(e) => ResponseFuture::failed(e),
        }
    }

    /// Send `request` and wait for the response.
    pub async fn send(&self, request: Request) -> Result<Response, CirrusError> {
        self.connect(request).await
    }

    /// Release the worker pool. Idempotent.
    pub fn close(&self) {
        self.inner.pool.close();
    }

    /// Hooks first, fixed headers last.
    fn prepare(&self, request: Request) -> Request {
        let mut request = self.inner.hooks.apply(request);
        apply_fixed_headers(
            &mut request,
            self.inner.endpoint.host_header(),
            &self.inner.config.user_agent,
        );
        request
    }
}

// ── Builder ──────────────────────────────────────────────────────

pub struct HttpClientBuilder {
    endpoint: Endpoint,
    config: TransportConfig,
    pool: Option<Arc<WorkerPool>>,
    hooks: HookChain,
    tls: Option<TlsContext>,
}

impl HttpClientBuilder {
    /// Share an existing pool instead of starting one.
    pub fn pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Append a pre-send hook.
    pub fn hook(mut self, hook: impl RequestHook + 'static) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Use a custom TLS context instead of the web PKI roots.
    pub fn tls(mut self, tls: TlsContext) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn build(self) -> Result<HttpClient, CirrusError> {
        let pool = match self.pool {
            Some(pool) => pool,
            None => Arc::new(WorkerPool::new(self.config.worker_threads)?),
        };
        let tls = match self.tls {
            Some(tls) => Some(tls),
            None if self.endpoint.is_secure() => Some(TlsContext::with_webpki_roots()?),
            None => None,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            tls = tls.is_some(),
            hooks = self.hooks.len(),
            "http client ready"
        );
        Ok(HttpClient {
            inner: Arc::new(Inner {
                endpoint: self.endpoint,
                config: self.config,
                pool,
                hooks: self.hooks,
                tls,
            }),
        })
    }
}
