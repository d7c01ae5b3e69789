//! Client connection registry
//!
//! Tracks connected clients and their outbound send queues, enabling
//! targeted delivery and whole-server broadcast. All outgoing bytes for a
//! connection flow through its single mpsc sender; the connection's writer
//! task is the only writer on the socket, so frames are never interleaved.

use std::sync::atomic::{AtomicU16, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use etcord_protocol::ClientInfo;

/// Unique client identifier, assigned at connect time
///
/// Ids increase monotonically for the server's lifetime and are never
/// reused after disconnect; the u16 counter wraps after 65536 connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u16);

impl ClientId {
    #[cfg(test)]
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Get the raw wire value
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Client({})", self.0)
    }
}

/// Entry for a connected client
pub struct ClientEntry {
    /// Queue of pre-encoded frames for this client's writer task
    sender: mpsc::Sender<Bytes>,
    /// Display name; empty until a login is processed
    name: String,
}

impl std::fmt::Debug for ClientEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientEntry")
            .field("name", &self.name)
            .field("sender_closed", &self.sender.is_closed())
            .finish()
    }
}

/// Registry tracking all connected clients
///
/// Thread-safe for concurrent access from every connection task.
pub struct ClientRegistry {
    clients: DashMap<u16, ClientEntry>,
    next_client_id: AtomicU16,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            next_client_id: AtomicU16::new(1),
        }
    }

    /// Register a new client connection, returning its assigned id
    pub fn register(&self, sender: mpsc::Sender<Bytes>) -> ClientId {
        let id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        self.clients.insert(
            id,
            ClientEntry {
                sender,
                name: String::new(),
            },
        );
        debug!("Registered client {}", id);
        ClientId(id)
    }

    /// Remove a client from the registry
    pub fn unregister(&self, client_id: ClientId) {
        if self.clients.remove(&client_id.0).is_some() {
            debug!("Unregistered client {}", client_id);
        }
    }

    /// Set a client's display name; returns false if the client is gone
    pub fn set_name(&self, client_id: ClientId, name: &str) -> bool {
        match self.clients.get_mut(&client_id.0) {
            Some(mut entry) => {
                entry.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// A client's display name, if registered
    pub fn name(&self, client_id: ClientId) -> Option<String> {
        self.clients.get(&client_id.0).map(|e| e.name.clone())
    }

    /// Whether a client has completed login
    pub fn is_named(&self, client_id: ClientId) -> bool {
        self.clients
            .get(&client_id.0)
            .map(|e| !e.name.is_empty())
            .unwrap_or(false)
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Point-in-time copy of all live senders, in id order
    ///
    /// Broadcast iterates this copy, never the live map, so concurrent
    /// register/unregister cannot corrupt the fan-out.
    pub fn snapshot(&self) -> Vec<(ClientId, mpsc::Sender<Bytes>)> {
        let mut entries: Vec<_> = self
            .clients
            .iter()
            .map(|e| (ClientId(*e.key()), e.sender.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| id.0);
        entries
    }

    /// Client infos for a GetClients response, in id order
    pub fn client_infos(&self, filter: Option<&[u16]>) -> Vec<ClientInfo> {
        let mut infos: Vec<ClientInfo> = self
            .clients
            .iter()
            .filter(|e| filter.map(|ids| ids.contains(e.key())).unwrap_or(true))
            .map(|e| ClientInfo {
                id: *e.key(),
                name: e.name.clone(),
            })
            .collect();
        infos.sort_by_key(|c| c.id);
        infos
    }

    /// Queue a frame for one client (non-blocking)
    ///
    /// A closed queue means the writer task is gone; the client is treated
    /// as disconnected and unregistered. A full queue drops this frame for
    /// this client so a stalled peer cannot hold anyone else up.
    pub fn try_send_to(&self, client_id: ClientId, frame: Bytes) -> bool {
        let sender = match self.clients.get(&client_id.0) {
            Some(entry) => entry.sender.clone(),
            None => return false,
        };

        match sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Client {} send queue closed, removing", client_id);
                self.unregister(client_id);
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Client {} send queue full, frame dropped", client_id);
                false
            }
        }
    }

    /// Send one pre-encoded frame to every connected client
    ///
    /// The frame is encoded once by the caller; each entry in a snapshot
    /// gets the same bytes. Returns the number of successful deliveries;
    /// failures are removed individually and never block the rest.
    pub fn broadcast(&self, frame: Bytes) -> usize {
        self.broadcast_inner(None, frame)
    }

    /// Broadcast to every client except one (used for notifications that
    /// the originator does not need to hear)
    pub fn broadcast_except(&self, except: ClientId, frame: Bytes) -> usize {
        self.broadcast_inner(Some(except), frame)
    }

    fn broadcast_inner(&self, except: Option<ClientId>, frame: Bytes) -> usize {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return 0;
        }

        debug!("Broadcasting {} bytes to {} clients", frame.len(), snapshot.len());

        let mut delivered = 0;
        for (client_id, sender) in snapshot {
            if Some(client_id) == except {
                continue;
            }
            match sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!("Client {} send queue closed, removing", client_id);
                    self.unregister(client_id);
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Client {} send queue full, frame dropped", client_id);
                }
            }
        }
        delivered
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("client_count", &self.clients.len())
            .field(
                "next_client_id",
                &self.next_client_id.load(Ordering::SeqCst),
            )
            .finish()
    }
}
