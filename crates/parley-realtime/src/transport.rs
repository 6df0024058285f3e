//! Client-side transport seam.
//!
//! The adapter talks to the hub through [`Transport`] so it can be driven
//! in-process ([`HubTransport`]) or replaced in tests.

use crate::client::{ClientId, ClientReceiver};
use crate::error::RealtimeError;
use crate::hub::{ClientCommand, EventHub, ServerMessage};
use std::sync::Arc;

/// A live transport connection.
#[derive(Debug)]
pub struct Connection {
    /// Hub-side connection id.
    pub client_id: ClientId,
    /// Frames pushed by the hub.
    pub receiver: ClientReceiver,
}

/// A realtime transport.
pub trait Transport: Send + Sync {
    /// Open a connection authenticated by a grant token.
    fn open(&self, token: &str) -> Result<Connection, RealtimeError>;

    /// Send a command over an open connection.
    fn command(
        &self,
        connection: &Connection,
        command: ClientCommand,
    ) -> Result<ServerMessage, RealtimeError>;

    /// Tear a connection down.
    fn close(&self, connection: Connection);
}

/// In-process transport backed by an [`EventHub`].
#[derive(Debug, Clone)]
pub struct HubTransport {
    hub: Arc<EventHub>,
}

impl HubTransport {
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self { hub }
    }
}

impl Transport for HubTransport {
    fn open(&self, token: &str) -> Result<Connection, RealtimeError> {
        let (client, receiver) = self.hub.connect(token)?;
        Ok(Connection {
            client_id: client.id.clone(),
            receiver,
        })
    }

    fn command(
        &self,
        connection: &Connection,
        command: ClientCommand,
    ) -> Result<ServerMessage, RealtimeError> {
        let client = self
            .hub
            .get_client(&connection.client_id)
            .ok_or_else(|| RealtimeError::ClientNotFound(connection.client_id.clone()))?;
        self.hub.handle_command(&client, command)
    }

    fn close(&self, connection: Connection) {
        self.hub.disconnect(&connection.client_id);
    }
}
