//! # cirrus-cli
//!
//! `cirrus-probe` sends a single request through the cirrus transport
//! and prints the response. Useful for checking endpoint reachability,
//! TLS setup and hook wiring without generating a service client.

pub mod config;
pub mod probe;
