//! TCP listener for management sessions.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{info, warn};
use tokio::net::{TcpListener, ToSocketAddrs};

use super::dispatcher::Dispatcher;
use super::session::{Session, SessionSettings};

/// Accepts connections and runs one [`Session`] task per connection. All
/// sessions share one dispatcher and therefore one topology.
pub struct NetconfServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    settings: SessionSettings,
    next_session_id: AtomicU32,
}

impl NetconfServer {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        dispatcher: Arc<Dispatcher>,
        settings: SessionSettings,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            dispatcher,
            settings,
            next_session_id: AtomicU32::new(1),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> std::io::Result<()> {
        info!("Listening for management sessions on {}", self.local_addr()?);

        loop {
            let (stream, peer) = self.listener.accept().await?;
            let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            let dispatcher = Arc::clone(&self.dispatcher);
            let settings = self.settings.clone();

            tokio::spawn(async move {
                info!("Session {} opened from {}", id, peer);
                let (reader, writer) = stream.into_split();
                match Session::new(id, reader, writer, dispatcher, settings).run().await {
                    Ok(()) => info!("Session {} ended", id),
                    Err(e) => warn!("Session {} terminated: {}", id, e),
                }
            });
        }
    }
}
