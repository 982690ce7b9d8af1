//! Client session registry and the engine-facing reporter
//!
//! Sessions are registered under their remote address when the
//! connection is accepted; reports are addressed by owner, so the
//! registry also keeps an owner index, bound on each NewOrder and kept
//! in sync with eviction. Both indices live behind one mutex, and
//! socket writes happen inside the critical section so a failed write
//! can evict the session before the error propagates.

use matching_engine::Reporter;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tracing::{debug, info};
use types::errors::{EngineError, ReportError};
use types::order::Order;
use types::trade::TradeReport;
use wire::Report;

/// State for one connected TCP client
struct ClientSession {
    writer: OwnedWriteHalf,
}

#[derive(Default)]
struct Inner {
    by_addr: HashMap<SocketAddr, ClientSession>,
    by_owner: HashMap<String, SocketAddr>,
}

/// Live sessions, indexed by remote address and by owner
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted connection
    pub async fn register(&self, addr: SocketAddr, writer: OwnedWriteHalf) {
        let mut inner = self.inner.lock().await;
        inner.by_addr.insert(addr, ClientSession { writer });
        info!(%addr, "client session registered");
    }

    /// Bind an owner to a session address
    ///
    /// At most one session per owner: a later binding replaces the
    /// earlier one, so reports follow the owner's newest connection.
    pub async fn bind_owner(&self, owner: &str, addr: SocketAddr) {
        let mut inner = self.inner.lock().await;
        let previous = inner.by_owner.insert(owner.to_string(), addr);
        if let Some(previous) = previous.filter(|p| p != &addr) {
            debug!(%owner, %previous, %addr, "owner re-bound to a new session");
        }
    }

    /// Remove a session and any owner bindings pointing at it
    pub async fn evict(&self, addr: SocketAddr) {
        let mut inner = self.inner.lock().await;
        evict_locked(&mut inner, addr);
    }

    /// Write raw report bytes to the session at an address
    pub async fn write_to_addr(&self, addr: SocketAddr, bytes: &[u8]) -> Result<(), ReportError> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .by_addr
            .get_mut(&addr)
            .ok_or_else(|| ReportError::ClientDoesNotExist(addr.to_string()))?;
        if let Err(err) = session.writer.write_all(bytes).await {
            evict_locked(&mut inner, addr);
            return Err(ReportError::Write(err));
        }
        Ok(())
    }

    /// Write raw report bytes to the session an owner is bound to
    pub async fn write_to_owner(&self, owner: &str, bytes: &[u8]) -> Result<(), ReportError> {
        let mut inner = self.inner.lock().await;
        let addr = *inner
            .by_owner
            .get(owner)
            .ok_or_else(|| ReportError::ClientDoesNotExist(owner.to_string()))?;
        let Some(session) = inner.by_addr.get_mut(&addr) else {
            // Stale binding; the session went away underneath the owner.
            inner.by_owner.remove(owner);
            return Err(ReportError::ClientDoesNotExist(owner.to_string()));
        };
        if let Err(err) = session.writer.write_all(bytes).await {
            evict_locked(&mut inner, addr);
            return Err(ReportError::Write(err));
        }
        Ok(())
    }
}

// Eviction path used when the lock is already held. Dropping the write
// half closes our direction of the socket.
fn evict_locked(inner: &mut Inner, addr: SocketAddr) {
    if inner.by_addr.remove(&addr).is_some() {
        info!(%addr, "client session evicted");
    }
    inner.by_owner.retain(|_, bound| bound != &addr);
}

/// Engine-facing reporter backed by the live session registry
#[derive(Clone)]
pub struct SessionReporter {
    sessions: Arc<SessionRegistry>,
}

impl SessionReporter {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }
}

impl Reporter for SessionReporter {
    async fn report_trade(&self, report: &TradeReport) -> Result<(), ReportError> {
        let bytes = Report::execution(report).serialize();
        self.sessions.write_to_owner(&report.owner, &bytes).await
    }

    async fn report_order_placed(&self, owner: &str, order: &Order) -> Result<(), ReportError> {
        let bytes = Report::order_placed(order, unix_now_secs()).serialize();
        self.sessions.write_to_owner(owner, &bytes).await
    }

    async fn report_error(&self, owner: &str, error: &EngineError) -> Result<(), ReportError> {
        let bytes = Report::rejection(&error.to_string(), unix_now_ns()).serialize();
        self.sessions.write_to_owner(owner, &bytes).await
    }
}

pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub(crate) fn unix_now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
