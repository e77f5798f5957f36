//! Pre-send request hooks.
//!
//! Hooks run in list order, once per request, before the fixed headers
//! are applied. Signing and similar middleware plug in here.

use std::fmt;
use std::sync::Arc;

use crate::request::Request;

pub trait RequestHook: Send + Sync {
    /// Transform `request` before it is sent.
    fn on_request(&self, request: Request) -> Request;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> RequestHook for F
where
    F: Fn(Request) -> Request + Send + Sync,
{
    fn on_request(&self, request: Request) -> Request {
        self(request)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Ordered hook list.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn RequestHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: impl RequestHook + 'static) {
        self.hooks.push(Arc::new(hook));
    }

    /// Run every hook in order.
    pub fn apply(&self, mut request: Request) -> Request {
        for hook in &self.hooks {
            request = hook.on_request(request);
            tracing::trace!(hook = hook.name(), "request hook applied");
        }
        request
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

/// Logs every outbound request at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHook;

impl RequestHook for LoggingHook {
    fn on_request(&self, request: Request) -> Request {
        tracing::debug!(
            method = %request.method(),
            target = %request.target(),
            headers = request.headers().len(),
            body = request.body().len(),
            "sending request"
        );
        request
    }

    fn name(&self) -> &str {
        "logging"
    }
}
