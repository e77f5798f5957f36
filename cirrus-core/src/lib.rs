//! # cirrus-core
//!
//! Transport and iteration core for a generated cloud-service SDK.
//!
//! This crate contains:
//! - **Shapes**: `MemberEncoding` directives, `ShapeRegistry`, and the `ShapeCodec` contract with a JSON codec
//! - **Transport**: `HttpClient` with one connection per request, TLS on port 443, and an explicit `ResponseState` machine
//! - **Pagination**: `paginate` / `paginate_on`, a token-driven sequential page loop
//! - **Pool**: `WorkerPool` of single-threaded event loops handed out as `ExecutionContext`s
//! - **Client**: `ServiceClient` tying shapes, codec and transport together
//! - **Error**: `CirrusError` and `ShapeError`, typed `thiserror` enums

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod paginate;
pub mod pool;
pub mod request;
pub mod response;
pub mod shape;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{Operation, ServiceClient, service_error};
pub use config::TransportConfig;
pub use endpoint::{Endpoint, SECURE_PORT};
pub use error::{BoxError, CirrusError, PageStage, ShapeError};
pub use headers::Headers;
pub use paginate::{PageFlow, paginate, paginate_on};
pub use pool::{ExecutionContext, WorkerPool};
pub use request::{Method, Request, expand_path};
pub use response::{Response, ResponseHead};
pub use shape::{
    DecodableShape, EncodableShape, Empty, JsonCodec, Location, MemberEncoding, MemberReader,
    MemberWriter, Shape, ShapeCodec, ShapeDirectives, ShapeEncoding, ShapeRegistry, ShapeRole,
};
pub use transport::{HttpClient, HttpClientBuilder, LoggingHook, RequestHook, ResponseFuture};
