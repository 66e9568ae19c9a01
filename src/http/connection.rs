use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::time::timeout;

use crate::config::Config;
use crate::http::dispatch::StaticFiles;
use crate::http::parser::{RequestParser, Status};

/// Per-connection read settings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub read_chunk_size: usize,
    /// `None` waits on a silent peer forever.
    pub read_timeout: Option<Duration>,
    pub max_request_bytes: usize,
}

impl ConnectionSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            read_chunk_size: cfg.server.read_chunk_size,
            read_timeout: cfg.read_timeout(),
            max_request_bytes: cfg.server.max_request_bytes,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct Connection<S> {
    stream: S,
    parser: RequestParser,
    files: Arc<StaticFiles>,
    settings: ConnectionSettings,
    state: ConnectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Reading,
    Dispatching,
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, files: Arc<StaticFiles>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            parser: RequestParser::new().limit(settings.max_request_bytes),
            files,
            settings,
            state: ConnectionState::Reading,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Serves requests until the peer closes, a request is malformed, a read
    /// times out, or I/O fails. Only I/O failures are returned as errors.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut chunk = vec![0u8; self.settings.read_chunk_size.max(1)];

        loop {
            match self.state {
                ConnectionState::Reading => {
                    self.state = self.read_request(&mut chunk).await?;
                }

                ConnectionState::Dispatching => {
                    if let Some(request) = self.parser.request() {
                        let outcome = self.files.dispatch(&request, &mut self.stream).await?;
                        tracing::info!(
                            method = request.method,
                            path = request.path,
                            status = outcome.status().as_u16(),
                            "Request served"
                        );
                    }

                    self.parser.reset();
                    self.state = ConnectionState::Reading;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn read_request(&mut self, chunk: &mut [u8]) -> anyhow::Result<ConnectionState> {
        loop {
            let n = match self.settings.read_timeout {
                Some(limit) => match timeout(limit, self.stream.read(chunk)).await {
                    Ok(read) => read?,
                    Err(_) => {
                        tracing::debug!(
                            buffered = self.parser.buffered(),
                            "Read timed out, closing"
                        );
                        return Ok(ConnectionState::Closed);
                    }
                },
                None => self.stream.read(chunk).await?,
            };

            if n == 0 {
                // Client closed connection
                return Ok(ConnectionState::Closed);
            }

            match self.parser.feed(&chunk[..n]) {
                Ok(Status::Complete) => return Ok(ConnectionState::Dispatching),
                Ok(Status::Incomplete) => {}
                Err(e) => {
                    tracing::debug!(error = %e, state = ?self.parser.state(), "Malformed request, closing");
                    return Ok(ConnectionState::Closed);
                }
            }
        }
    }
}
