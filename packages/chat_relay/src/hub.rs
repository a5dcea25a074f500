//! Broadcast Hub
//!
//! A single actor task owns the [`Registry`] and consumes every client event
//! from one ordered queue, so events from all connections are applied in a
//! total order without locking. Other tasks talk to it through [`HubHandle`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::error::RelayError;
use crate::metrics::ServerMetrics;
use crate::protocol::{ClientAction, ConnectionId, InboundEvent, OutboundNotification};
use crate::registry::{ConnectionSender, Registry};

/// Commands that can be sent to the hub
#[derive(Debug)]
pub enum HubCommand {
    Register {
        conn: ConnectionId,
        sender: ConnectionSender,
    },
    Event(InboundEvent),
    /// The connection's read side ended
    Disconnect {
        conn: ConnectionId,
    },
    Users {
        respond_to: oneshot::Sender<UserSnapshot>,
    },
}

/// Current registry view served to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub connected_users: Vec<String>,
    pub connections: usize,
}

/// The hub actor that runs in its own task
pub struct Hub {
    registry: Registry,
    receiver: mpsc::Receiver<HubCommand>,
    metrics: Arc<ServerMetrics>,
    /// A named connection was dropped by fan-out since the last user list.
    list_stale: bool,
}

impl Hub {
    pub fn spawn(config: &HubConfig, metrics: Arc<ServerMetrics>) -> HubHandle {
        let (sender, receiver) = mpsc::channel(config.event_capacity);

        let hub = Self {
            registry: Registry::new(),
            receiver,
            metrics,
            list_stale: false,
        };

        tokio::spawn(hub.run());

        HubHandle { sender }
    }

    async fn run(mut self) {
        info!("Relay hub started");

        while let Some(command) = self.receiver.recv().await {
            self.handle(command);
        }

        info!(connections = self.registry.len(), "Relay hub shutting down");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { conn, sender } => {
                self.registry.insert(conn, sender);
                debug!(conn_id = %conn, connections = self.registry.len(), "Connection registered");
            }
            HubCommand::Event(event) => self.handle_event(event),
            HubCommand::Disconnect { conn } => {
                let was_member = self.registry.remove(conn).is_some();
                if was_member {
                    debug!(conn_id = %conn, "Connection deregistered after disconnect");
                }
                if was_member || self.list_stale {
                    self.broadcast_user_list();
                }
            }
            HubCommand::Users { respond_to } => {
                let _ = respond_to.send(UserSnapshot {
                    connected_users: self.registry.user_list(),
                    connections: self.registry.member_count(),
                });
            }
        }
    }

    fn handle_event(&mut self, event: InboundEvent) {
        match event.kind {
            ClientAction::Identify => {
                if !self.registry.set_name(event.source, event.username) {
                    debug!(conn_id = %event.source, "Identify from unregistered connection");
                }
                self.broadcast_user_list();
            }
            ClientAction::Leave => {
                if let Some(name) = self.registry.leave(event.source) {
                    info!(conn_id = %event.source, user = %name, "Client left");
                }
                self.broadcast_user_list();
            }
            ClientAction::Broadcast => {
                let notification = OutboundNotification::chat(
                    &event.username,
                    &event.message,
                    self.registry.user_list(),
                );
                self.broadcast(&notification);
            }
        }
    }

    fn broadcast_user_list(&mut self) {
        let notification = OutboundNotification::user_list(self.registry.user_list());
        self.list_stale = false;
        self.broadcast(&notification);
    }

    fn broadcast(&mut self, notification: &OutboundNotification) {
        let fan_out = self.registry.send_all(notification);
        self.metrics.notifications_sent(fan_out.delivered);
        self.list_stale |= fan_out.list_changed;
        if !fan_out.dropped.is_empty() {
            self.metrics.send_failed(fan_out.dropped.len());
            for conn in &fan_out.dropped {
                warn!(conn_id = %conn, "Send failed, connection closed and removed");
            }
        }
    }
}

/// Handle to communicate with the hub actor
#[derive(Clone, Debug)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn register(
        &self,
        conn: ConnectionId,
        sender: ConnectionSender,
    ) -> Result<(), RelayError> {
        self.send(HubCommand::Register { conn, sender }).await
    }

    /// Queue a client event. Waits while the hub's queue is full.
    pub async fn submit(&self, event: InboundEvent) -> Result<(), RelayError> {
        self.send(HubCommand::Event(event)).await
    }

    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RelayError> {
        self.send(HubCommand::Disconnect { conn }).await
    }

    /// Current user list. Every command queued before this one has been applied
    /// by the time it returns.
    pub async fn users(&self) -> Result<UserSnapshot, RelayError> {
        let (respond_to, response) = oneshot::channel();
        self.send(HubCommand::Users { respond_to }).await?;
        response.await.map_err(|_| RelayError::HubClosed)
    }

    async fn send(&self, command: HubCommand) -> Result<(), RelayError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| RelayError::HubClosed)
    }
}
