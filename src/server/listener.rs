use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{Instrument, info};

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::http::dispatch::StaticFiles;

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    serve(listener, cfg).await
}

/// Accepts connections on an already bound listener.
///
/// Each connection holds a semaphore permit for its whole lifetime, so at
/// most `server.max_connections` are served at once; further connections
/// wait in the accept backlog.
pub async fn serve(listener: TcpListener, cfg: &Config) -> anyhow::Result<()> {
    let files = Arc::new(StaticFiles::new(&cfg.static_files)?);
    let settings = ConnectionSettings::from_config(cfg);
    let admission = Arc::new(Semaphore::new(cfg.server.max_connections));

    info!(root = %files.root().display(), max_connections = cfg.server.max_connections, "Serving static files");

    let mut failures = 0u32;
    loop {
        let permit = admission.clone().acquire_owned().await?;

        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => {
                failures = 0;
                accepted
            }
            Err(e) => {
                let delay = accept_backoff(failures);
                failures = failures.saturating_add(1);
                tracing::warn!("Accept failed: {}, retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
                continue;
            }
        };
        tracing::debug!("Accepted connection from {}", peer);

        let files = files.clone();
        tokio::spawn(
            async move {
                let _permit = permit;
                let mut conn = Connection::new(socket, files, settings);
                if let Err(e) = conn.run().await {
                    tracing::error!("Connection error from {}: {}", peer, e);
                }
            }
            .instrument(tracing::info_span!("conn", %peer)),
        );
    }
}

/// Delay before retrying after `failures` consecutive accept errors.
///
/// Starts at 10ms and doubles up to one second.
pub fn accept_backoff(failures: u32) -> Duration {
    Duration::from_millis(10u64 << failures.min(7)).min(Duration::from_secs(1))
}
