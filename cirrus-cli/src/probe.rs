//! One-shot request execution.

use cirrus_core::{CirrusError, Endpoint, HttpClient, LoggingHook, Method, Request, Response};

use crate::config::ProbeConfig;

/// What to send, as given on the command line.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: Method,
    pub path: String,
    /// `Name: value` pairs.
    pub headers: Vec<String>,
    /// `name=value` pairs.
    pub query: Vec<String>,
    pub data: Option<String>,
}

impl ProbeRequest {
    /// Build the transport request.
    pub fn to_request(&self) -> Result<Request, CirrusError> {
        let mut request = Request::new(self.method, self.path.clone());
        for header in &self.headers {
            let (name, value) = header.split_once(':').ok_or_else(|| {
                CirrusError::Encoding(format!("header `{header}` is not `Name: value`"))
            })?;
            request = request.with_header(name.trim(), value.trim());
        }
        for pair in &self.query {
            let (name, value) = pair.split_once('=').unwrap_or((pair.as_str(), ""));
            request = request.with_query(name, value);
        }
        if let Some(data) = &self.data {
            request = request.with_body(data.clone().into_bytes());
        }
        Ok(request)
    }
}

/// Send `probe` to the configured endpoint.
pub async fn run(config: &ProbeConfig, probe: &ProbeRequest) -> Result<Response, CirrusError> {
    let endpoint = Endpoint::parse(&config.endpoint.url)?;
    let mut builder = HttpClient::builder(endpoint, config.transport.clone());
    if config.endpoint.log_requests {
        builder = builder.hook(LoggingHook);
    }
    let client = builder.build()?;

    let result = client.send(probe.to_request()?).await;
    client.close();
    result
}

/// Render a response the way it came off the wire.
pub fn render(response: &Response) -> String {
    let mut out = format!("HTTP/1.1 {} {}\n", response.status(), response.reason());
    for (name, value) in response.headers().iter() {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(response.body()));
    out
}
