//! Static file dispatch.
//!
//! Maps a parsed [`Request`] to a file beneath the document root and writes
//! the response. Only `GET` is served; anything else receives the fixed
//! `400 Bad Message` response, and a path that does not resolve to a regular
//! file inside the root receives `404 Not Found`.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::StaticFilesConfig;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;

/// Why a request was answered with an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Method other than `GET` (400).
    MethodNotSupported,
    /// No servable file for the path (404).
    ResourceNotFound,
}

impl Rejection {
    pub fn response(&self, server: &str) -> Response {
        match self {
            Rejection::MethodNotSupported => Response::bad_message(server),
            Rejection::ResourceNotFound => Response::not_found(server),
        }
    }
}

/// What [`StaticFiles::dispatch`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Served { bytes: u64 },
    Rejected(Rejection),
}

impl Outcome {
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Served { .. } => StatusCode::Ok,
            Outcome::Rejected(Rejection::MethodNotSupported) => StatusCode::BadMessage,
            Outcome::Rejected(Rejection::ResourceNotFound) => StatusCode::NotFound,
        }
    }
}

/// Serves files from a fixed document root.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index: String,
    server_name: String,
    block_size: usize,
}

impl StaticFiles {
    /// Builds the dispatcher. The document root must exist; it is
    /// canonicalized once here and every served path must stay inside it.
    pub fn new(cfg: &StaticFilesConfig) -> anyhow::Result<Self> {
        let root = std::fs::canonicalize(&cfg.root)
            .with_context(|| format!("document root {}", cfg.root.display()))?;

        Ok(Self {
            root,
            index: cfg.index.clone(),
            server_name: cfg.server_name.clone(),
            block_size: cfg.block_size.max(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Resolves a request path to a file inside the document root.
    ///
    /// Query string and fragment are ignored and `/` maps to the index
    /// document. Returns `None` for paths containing `..`, for paths that do
    /// not exist, and for anything (including symlink targets) outside the root.
    pub async fn resolve(&self, path: &str) -> Option<PathBuf> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let relative = if path == "/" {
            self.index.as_str()
        } else {
            path.trim_start_matches('/')
        };

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        let canonical = tokio::fs::canonicalize(self.root.join(relative)).await.ok()?;
        canonical.starts_with(&self.root).then_some(canonical)
    }

    /// Writes the response for `request` to `stream`.
    ///
    /// Rejections are not errors; `Err` means the stream or the file failed
    /// and the connection should be dropped.
    pub async fn dispatch<W>(&self, request: &Request<'_>, stream: &mut W) -> anyhow::Result<Outcome>
    where
        W: AsyncWrite + Unpin,
    {
        if request.method != "GET" {
            return self.reject(Rejection::MethodNotSupported, stream).await;
        }

        let Some(file_path) = self.resolve(request.path).await else {
            return self.reject(Rejection::ResourceNotFound, stream).await;
        };

        let mut file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(path = %file_path.display(), error = %e, "Cannot open file");
                return self.reject(Rejection::ResourceNotFound, stream).await;
            }
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return self.reject(Rejection::ResourceNotFound, stream).await;
        }
        let len = metadata.len();

        ResponseWriter::new(&Response::ok_head(&self.server_name, len))
            .write_to_stream(stream)
            .await?;

        let mut block = vec![0u8; self.block_size];
        let mut remaining = len;
        while remaining > 0 {
            let n = file.read(&mut block).await?;
            if n == 0 {
                anyhow::bail!(
                    "{} ended {} bytes short of its size",
                    file_path.display(),
                    remaining
                );
            }
            // A file that grew while streaming is cut at the advertised length.
            let n = usize::try_from(remaining).map_or(n, |r| n.min(r));
            stream.write_all(&block[..n]).await?;
            remaining -= n as u64;
        }
        stream.flush().await?;

        Ok(Outcome::Served { bytes: len })
    }

    async fn reject<W>(&self, rejection: Rejection, stream: &mut W) -> anyhow::Result<Outcome>
    where
        W: AsyncWrite + Unpin,
    {
        ResponseWriter::new(&rejection.response(&self.server_name))
            .write_to_stream(stream)
            .await?;
        stream.flush().await?;
        Ok(Outcome::Rejected(rejection))
    }
}
