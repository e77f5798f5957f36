//! Typed service client.
//!
//! Composes the shape registry, a [`ShapeCodec`] and the HTTP transport
//! into `send(operation, input) -> output`, and drives paged operations
//! through the pagination engine.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CirrusError;
use crate::paginate::{paginate, paginate_on, PageFlow};
use crate::pool::ExecutionContext;
use crate::request::Method;
use crate::response::Response;
use crate::shape::{DecodableShape, EncodableShape, JsonCodec, ShapeCodec, ShapeRegistry};
use crate::transport::HttpClient;

/// Static description of one service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub method: Method,
    /// Path template with `{Label}` / `{Label+}` placeholders.
    pub path: &'static str,
}

impl Operation {
    pub const fn new(name: &'static str, method: Method, path: &'static str) -> Self {
        Self { name, method, path }
    }
}

#[derive(Debug)]
struct Inner<C> {
    http: HttpClient,
    codec: C,
    registry: ShapeRegistry,
}

/// Client for one service endpoint.
#[derive(Debug)]
pub struct ServiceClient<C = JsonCodec> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for ServiceClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ServiceClient<JsonCodec> {
    /// Client using the JSON body codec.
    pub fn json(http: HttpClient) -> Self {
        Self::new(http, JsonCodec::new())
    }
}

impl<C: ShapeCodec> ServiceClient<C> {
    pub fn new(http: HttpClient, codec: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                codec,
                registry: ShapeRegistry::new(),
            }),
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.inner.registry
    }

    /// Validate and cache the directives of `S` ahead of first use.
    pub fn register<S: crate::shape::Shape>(&self) -> Result<(), CirrusError> {
        self.inner.registry.register::<S>()?;
        Ok(())
    }

    /// Invoke `operation` with `input`.
    ///
    /// Error statuses are returned as [`CirrusError::Service`].
    pub async fn send<I, O>(&self, operation: &Operation, input: &I) -> Result<O, CirrusError>
    where
        I: EncodableShape,
        O: DecodableShape,
    {
        let input_directives = self.inner.registry.register::<I>()?;
        let output_directives = self.inner.registry.register::<O>()?;

        let request = self
            .inner
            .codec
            .encode(input, &input_directives)?
            .into_request(operation.method, operation.path)?;

        tracing::debug!(operation = operation.name, "invoking operation");
        let response = self.inner.http.connect(request).await?;
        if !response.is_success() {
            return Err(service_error(&response));
        }
        self.inner.codec.decode(&response, &output_directives)
    }

    /// Walk every page of `operation` on a worker picked from the pool.
    pub async fn paginate<I, O, Tok, T, N, P, PF>(
        &self,
        operation: Operation,
        input: I,
        token_of: T,
        next_input: N,
        on_page: P,
    ) -> Result<(), CirrusError>
    where
        I: EncodableShape + Clone + Send + Sync,
        O: DecodableShape + Send,
        Tok: Send + 'static,
        T: Fn(&O) -> Option<Tok> + Send + 'static,
        N: Fn(I, Tok) -> I + Send + 'static,
        P: FnMut(O, ExecutionContext) -> PF + Send + 'static,
        PF: Future<Output = Result<PageFlow, CirrusError>> + Send + 'static,
    {
        let client = self.clone();
        paginate(
            self.inner.http.pool(),
            input,
            move |input: I| {
                let client = client.clone();
                async move { client.send::<I, O>(&operation, &input).await }
            },
            token_of,
            next_input,
            on_page,
        )
        .await
    }

    /// Walk every page of `operation` with all work on `ctx`.
    pub async fn paginate_on<I, O, Tok, T, N, P, PF>(
        &self,
        ctx: ExecutionContext,
        operation: Operation,
        input: I,
        token_of: T,
        next_input: N,
        on_page: P,
    ) -> Result<(), CirrusError>
    where
        I: EncodableShape + Clone + Send + Sync,
        O: DecodableShape + Send,
        Tok: Send + 'static,
        T: Fn(&O) -> Option<Tok> + Send + 'static,
        N: Fn(I, Tok) -> I + Send + 'static,
        P: FnMut(O, ExecutionContext) -> PF + Send + 'static,
        PF: Future<Output = Result<PageFlow, CirrusError>> + Send + 'static,
    {
        let client = self.clone();
        paginate_on(
            ctx,
            input,
            move |input: I| {
                let client = client.clone();
                async move { client.send::<I, O>(&operation, &input).await }
            },
            token_of,
            next_input,
            on_page,
        )
        .await
    }

    /// Release the transport's worker pool.
    pub fn close(&self) {
        self.inner.http.close();
    }
}

/// Build a service error from an error response.
///
/// The code comes from `x-amzn-ErrorType`, `__type`, or `code`; a
/// `namespace#Code` form keeps only `Code`.
pub fn service_error(response: &Response) -> CirrusError {
    let body: Option<Value> = serde_json::from_slice(response.body()).ok();
    let field = |keys: &[&str]| -> Option<String> {
        let object = body.as_ref()?.as_object()?;
        keys.iter()
            .find_map(|k| object.get(*k))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let code = response
        .header("x-amzn-ErrorType")
        .map(str::to_string)
        .or_else(|| field(&["__type", "code", "Code"]))
        .map(|raw| {
            let raw = raw.split(':').next().unwrap_or(&raw);
            raw.rsplit('#').next().unwrap_or(raw).to_string()
        })
        .unwrap_or_else(|| response.status().to_string());
    let message = field(&["message", "Message", "errorMessage"])
        .unwrap_or_else(|| response.reason().to_string());

    CirrusError::Service {
        status: response.status(),
        code,
        message,
    }
}
