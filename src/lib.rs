//! Warden - minimal HTTP/1.0 static file server
//!
//! Core library: incremental request parsing, static file dispatch and the
//! connection / accept loops.

pub mod config;
pub mod http;
pub mod server;
