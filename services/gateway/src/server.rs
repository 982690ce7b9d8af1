//! TCP accept loop and bounded connection readers
//!
//! Each connection gets its own reader task, but a semaphore keeps at
//! most `workers` reads in flight at once; a reader holds a permit only
//! for the read-parse-enqueue of one message, so per-connection FIFO is
//! preserved while the pool stays bounded. The bounded dispatcher
//! channel provides backpressure into the engine.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{info, warn};
use wire::{Message, MAX_FRAME_SIZE};

use crate::dispatch::ClientMessage;
use crate::session::SessionRegistry;

pub struct Server {
    listener: TcpListener,
    sessions: Arc<SessionRegistry>,
    messages: mpsc::Sender<ClientMessage>,
    read_permits: Arc<Semaphore>,
    shutdown: watch::Receiver<bool>,
}

impl Server {
    /// Bind the listener; `workers` bounds concurrent connection reads
    pub async fn bind(
        address: &str,
        port: u16,
        workers: usize,
        sessions: Arc<SessionRegistry>,
        messages: mpsc::Sender<ClientMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind((address, port)).await?;
        info!(%address, port, workers, "listening for client connections");
        Ok(Self {
            listener,
            sessions,
            messages,
            read_permits: Arc::new(Semaphore::new(workers)),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            warn!(%err, "error accepting client");
                            continue;
                        }
                    };
                    info!(%peer, "new client connected");

                    let (read_half, write_half) = stream.into_split();
                    self.sessions.register(peer, write_half).await;
                    tokio::spawn(read_loop(
                        peer,
                        read_half,
                        Arc::clone(&self.read_permits),
                        self.messages.clone(),
                        Arc::clone(&self.sessions),
                        self.shutdown.clone(),
                    ));
                }
            }
        }
        info!("accept loop stopped");
    }
}

/// Read frames off one connection and enqueue them for dispatch
///
/// A read error or EOF means the client is gone: the session is evicted
/// and the reader exits. Parse failures are forwarded; the dispatcher
/// answers them with an error report and the session stays open.
async fn read_loop(
    peer: SocketAddr,
    mut stream: OwnedReadHalf,
    permits: Arc<Semaphore>,
    messages: mpsc::Sender<ClientMessage>,
    sessions: Arc<SessionRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_FRAME_SIZE];
    loop {
        let _permit = tokio::select! {
            _ = shutdown.changed() => break,
            permit = permits.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let n = tokio::select! {
            _ = shutdown.changed() => break,
            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    info!(%peer, "client disconnected");
                    sessions.evict(peer).await;
                    break;
                }
                Ok(n) => n,
                Err(err) => {
                    warn!(%peer, %err, "error reading from connection");
                    sessions.evict(peer).await;
                    break;
                }
            },
        };

        let frame = Message::parse(&buf[..n]);
        if messages.send(ClientMessage { addr: peer, frame }).await.is_err() {
            break;
        }
    }
}
