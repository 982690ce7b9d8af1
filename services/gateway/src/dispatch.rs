//! Single-consumer message dispatcher
//!
//! The dispatcher exclusively owns the engine: all placements and
//! cancels are serialized here, so the engine and its books need no
//! locking. Errors are reported back to the originating client on a
//! best-effort basis.

use matching_engine::{Engine, Reporter};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use types::errors::EngineError;
use types::ids::OrderId;
use types::order::Order;
use wire::{Message, NewOrderMessage, Report, WireError};

use crate::session::{unix_now_ns, SessionReporter, SessionRegistry};

/// A parsed (or unparseable) frame linked to the client that sent it
pub struct ClientMessage {
    pub addr: SocketAddr,
    pub frame: Result<Message, WireError>,
}

pub struct Dispatcher {
    messages: mpsc::Receiver<ClientMessage>,
    engine: Engine<SessionReporter>,
    reporter: SessionReporter,
    sessions: Arc<SessionRegistry>,
}

impl Dispatcher {
    pub fn new(
        messages: mpsc::Receiver<ClientMessage>,
        engine: Engine<SessionReporter>,
        reporter: SessionReporter,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            messages,
            engine,
            reporter,
            sessions,
        }
    }

    /// Consume messages until every sender is gone, then drain out
    pub async fn run(mut self) {
        while let Some(message) = self.messages.recv().await {
            self.handle(message).await;
        }
        info!("dispatcher drained");
    }

    async fn handle(&mut self, message: ClientMessage) {
        match message.frame {
            Err(err) => {
                warn!(addr = %message.addr, %err, "error parsing message");
                self.reject(message.addr, &err.to_string()).await;
            }
            Ok(Message::Heartbeat) => {
                debug!(addr = %message.addr, "heartbeat");
            }
            Ok(Message::NewOrder(new_order)) => {
                self.place(message.addr, new_order).await;
            }
            Ok(Message::CancelOrder(cancel)) => {
                if let Err(err) = self.engine.cancel_order(cancel.asset, cancel.order_id) {
                    warn!(addr = %message.addr, order_id = %cancel.order_id, %err, "error cancelling order");
                    self.reject(message.addr, &err.to_string()).await;
                }
            }
            Ok(Message::LogBook) => {
                self.engine.log_book();
            }
        }
    }

    async fn place(&mut self, addr: SocketAddr, message: NewOrderMessage) {
        let order = Order::new(
            OrderId::new(),
            message.asset,
            message.order_type,
            message.ticker,
            message.side,
            message.limit_price,
            message.quantity,
            unix_now_ns() as i64,
            message.username,
        );

        // Reports are addressed by owner but sessions arrive as
        // addresses; the first NewOrder on a connection binds the two.
        self.sessions.bind_owner(&order.owner, addr).await;

        let ack = order.clone();
        match self.engine.place_order(ack.asset, order).await {
            Ok(()) => self.acknowledge(&ack).await,
            Err(err @ EngineError::Report(_)) => {
                // The trades stand; only some report deliveries failed.
                warn!(owner = %ack.owner, %err, "partial report delivery");
                self.acknowledge(&ack).await;
            }
            Err(err) => {
                warn!(owner = %ack.owner, %err, "error while placing order");
                if let Err(report_err) = self.reporter.report_error(&ack.owner, &err).await {
                    debug!(owner = %ack.owner, %report_err, "unable to deliver error report");
                }
            }
        }
    }

    async fn acknowledge(&self, order: &Order) {
        if let Err(err) = self.reporter.report_order_placed(&order.owner, order).await {
            warn!(owner = %order.owner, %err, "unable to acknowledge placement");
        }
    }

    async fn reject(&self, addr: SocketAddr, message: &str) {
        let bytes = Report::rejection(message, unix_now_ns()).serialize();
        if let Err(err) = self.sessions.write_to_addr(addr, &bytes).await {
            debug!(%addr, %err, "unable to deliver error report");
        }
    }
}
