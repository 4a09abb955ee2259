//! Registry of live websocket sessions.
//!
//! Each session owns the receiving half of an unbounded channel; the registry
//! keeps the sending half keyed by session id. Delivery never touches a socket
//! directly, so a slow or dead browser cannot hold up anyone else.

use crate::messages::ServerMessage;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::debug;

/// Receiving side handed to the websocket task on registration.
pub type SessionHandle = mpsc::UnboundedReceiver<ServerMessage>;

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<ServerMessage>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return the handle its task drains.
    ///
    /// An existing entry under the same id is replaced; its receiver then
    /// sees a closed channel.
    pub fn register(&self, id: &str) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), tx);
        if previous.is_some() {
            debug!(session_id = %id, "Replaced existing session handle");
        }
        debug!(session_id = %id, "Registered session");
        rx
    }

    /// Remove a session. Absent ids are ignored.
    pub fn unregister(&self, id: &str) {
        if self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
        {
            debug!(session_id = %id, "Unregistered session");
        }
    }

    /// Hand `message` to one session, or to all of them when `recipient` is
    /// `None`. Returns how many sessions accepted it.
    ///
    /// Unknown recipients are a silent no-op. A closed channel on one session
    /// does not affect the others.
    pub fn deliver(&self, message: ServerMessage, recipient: Option<&str>) -> usize {
        let sessions = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        match recipient {
            Some(id) => match sessions.get(id) {
                Some(tx) => usize::from(tx.send(message).is_ok()),
                None => {
                    debug!(session_id = %id, "No live session for recipient, dropping");
                    0
                }
            },
            None => {
                let mut sent = 0;
                for (id, tx) in sessions.iter() {
                    if tx.send(message.clone()).is_ok() {
                        sent += 1;
                    } else {
                        debug!(session_id = %id, "Session channel closed, skipping");
                    }
                }
                debug!(sent, total = sessions.len(), "Broadcast delivered");
                sent
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
