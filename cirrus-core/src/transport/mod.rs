//! Asynchronous HTTP/1.1 transport.
//!
//! One connection per request: connect, optional TLS on port 443, write
//! the request, then parse the response through [`ResponseState`].

pub mod client;
pub mod codec;
pub mod connection;
pub mod hook;
pub mod settle;
pub mod state;
pub mod tls;

pub use client::{HttpClient, HttpClientBuilder};
pub use codec::{apply_fixed_headers, HttpCodec, ResponseEvent, DEFAULT_USER_AGENT};
pub use connection::{drive, execute, upgrade, DEFAULT_CONNECT_TIMEOUT};
pub use hook::{HookChain, LoggingHook, RequestHook};
pub use settle::{pending, ResponseFuture, ResultFuture, Settle};
pub use state::ResponseState;
pub use tls::TlsContext;
