//! Per-client serialization of conversation turns.
//!
//! Reading the active step and then advancing it (or appending media) is
//! not atomic in the store, so two turns for the same client must never
//! overlap. Turns for different clients run in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::ClientId;

/// A client's mutex plus the number of turns holding or waiting for it.
struct LockEntry {
    lock: Arc<AsyncMutex<()>>,
    turns: usize,
}

type LockTable = HashMap<ClientId, LockEntry>;

/// Table of per-client async mutexes.
///
/// Entries are created on demand and removed once no turn for the client
/// holds or waits for its mutex, including waiters that were cancelled.
#[derive(Clone, Default)]
pub struct ClientLocks {
    table: Arc<Mutex<LockTable>>,
}

impl ClientLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other turn for `client_id` is running.
    ///
    /// Waiters are served in FIFO order, so turns run in arrival order.
    pub async fn acquire(&self, client_id: &ClientId) -> ClientTurnGuard {
        let (lock, registration) = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            let entry = table.entry(client_id.clone()).or_insert_with(|| LockEntry {
                lock: Arc::new(AsyncMutex::new(())),
                turns: 0,
            });
            entry.turns += 1;
            let registration = Registration {
                client_id: client_id.clone(),
                table: Arc::clone(&self.table),
            };
            (Arc::clone(&entry.lock), registration)
        };

        let guard = lock.lock_owned().await;
        ClientTurnGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of clients with a running or waiting turn.
    pub fn active_clients(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held for the duration of one client turn.
///
/// The mutex is released before the turn is deregistered.
pub struct ClientTurnGuard {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}

/// Counts one turn against its table entry until dropped.
///
/// Created before waiting, so a cancelled `acquire` is deregistered too.
struct Registration {
    client_id: ClientId,
    table: Arc<Mutex<LockTable>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = table.get_mut(&self.client_id) else {
            return;
        };
        entry.turns = entry.turns.saturating_sub(1);
        if entry.turns == 0 {
            table.remove(&self.client_id);
        }
    }
}
