//! HTTP/1.0 protocol implementation.
//!
//! # Architecture
//!
//! - **`parser`**: Incremental request parser over a growable buffer
//! - **`request`**: Borrowed request view
//! - **`response`**: Response representation, builder and the fixed error responses
//! - **`writer`**: Serializes and writes responses to the client
//! - **`dispatch`**: Maps requests to files beneath the document root
//! - **`connection`**: Per-connection read / dispatch loop
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Feed socket reads to the parser
//!        └──────┬──────┘
//!               │ Request complete
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Write file or error response, reset parser
//!        └──────┬───────────┘
//!               └─ back to Reading
//!
//!   Malformed request, peer close, read timeout or I/O error → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden::config::Config;
//! use warden::http::connection::{Connection, ConnectionSettings};
//! use warden::http::dispatch::StaticFiles;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Config::default();
//!     let files = Arc::new(StaticFiles::new(&cfg.static_files)?);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let files = files.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, files, ConnectionSettings::default());
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod dispatch;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
