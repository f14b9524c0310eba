use crate::domain_model::*;
use crate::domain_port::{StorageBackend, StorageTx, TxManager};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub(super) friendships: BTreeMap<FriendshipId, FriendshipEdge>,
    /// Unique index on `(owner_id, counterpart_id)`.
    pub(super) pairs: HashMap<(UserId, UserId), FriendshipId>,
}

/// Shared handle to the in-process store. One transaction at a time holds
/// the lock, so transactions are serializable.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state only; waits for an open transaction to finish.
    pub(super) async fn read(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().await
    }
}

pub struct MemoryTxManager {
    store: MemoryStore,
}

impl MemoryTxManager {
    pub fn new(store: MemoryStore) -> Self {
        MemoryTxManager { store }
    }
}

#[async_trait::async_trait]
impl TxManager for MemoryTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let guard = self.store.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTx::new(guard)))
    }
}

/// Writes go to `staged`; commit swaps it in, drop discards it.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryTx {
    pub fn new(guard: OwnedMutexGuard<MemoryState>) -> Self {
        let staged = guard.clone();
        MemoryTx { guard, staged }
    }

    pub(super) fn state(&mut self) -> &mut MemoryState {
        &mut self.staged
    }
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MemoryTx {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Memory
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}
