use super::repo_tx_memory::{MemoryState, MemoryStore};
use super::util::downcast;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;

pub struct MemoryFriendshipRepo {
    store: MemoryStore,
}

impl MemoryFriendshipRepo {
    pub fn new(store: MemoryStore) -> Self {
        MemoryFriendshipRepo { store }
    }

    /// Total records across all owners.
    pub async fn count(&self) -> usize {
        self.store.read().await.friendships.len()
    }
}

fn state<'a>(tx: &'a mut dyn StorageTx<'_>) -> Result<&'a mut MemoryState, FriendshipError> {
    downcast(tx)
        .map(|tx| tx.state())
        .map_err(|e| FriendshipError::Store(e.to_string()))
}

fn by_pair(state: &MemoryState, owner: UserId, counterpart: UserId) -> Option<FriendshipEdge> {
    state
        .pairs
        .get(&(owner, counterpart))
        .and_then(|id| state.friendships.get(id))
        .cloned()
}

#[async_trait::async_trait]
impl FriendshipRepo for MemoryFriendshipRepo {
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        edge: &FriendshipEdge,
    ) -> Result<(), FriendshipError> {
        let state = state(tx)?;
        if edge.owner_id() == edge.counterpart_id() {
            return Err(FriendshipError::SelfRelationship);
        }

        let key = (edge.owner_id(), edge.counterpart_id());
        if state.pairs.contains_key(&key) || state.friendships.contains_key(&edge.id()) {
            return Err(FriendshipError::DuplicateRelationship);
        }

        state.pairs.insert(key, edge.id());
        state.friendships.insert(edge.id(), edge.clone());
        Ok(())
    }

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        Ok(state(tx)?.friendships.get(&id).cloned())
    }

    async fn find_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        // the transaction already holds the store lock
        self.find_in_tx(tx, id).await
    }

    async fn find_by_pair_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        Ok(by_pair(state(tx)?, owner, counterpart))
    }

    async fn lock_pair_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<MirrorPair, FriendshipError> {
        let state = state(tx)?;
        Ok((
            by_pair(state, owner, counterpart),
            by_pair(state, counterpart, owner),
        ))
    }

    async fn update_state_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        edge: &FriendshipEdge,
    ) -> Result<(), FriendshipError> {
        let state = state(tx)?;
        match state.friendships.get_mut(&edge.id()) {
            Some(stored) => {
                *stored = FriendshipEdge::from_parts(
                    stored.id(),
                    stored.owner_id(),
                    stored.counterpart_id(),
                    edge.state(),
                    stored.initiator(),
                    stored.created_at(),
                    edge.updated_at(),
                );
                Ok(())
            }
            None => Err(FriendshipError::NotFound),
        }
    }

    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<bool, FriendshipError> {
        let state = state(tx)?;
        match state.friendships.remove(&id) {
            Some(edge) => {
                state.pairs.remove(&(edge.owner_id(), edge.counterpart_id()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, id: FriendshipId) -> Result<Option<FriendshipEdge>, FriendshipError> {
        Ok(self.store.read().await.friendships.get(&id).cloned())
    }

    async fn find_by_pair(
        &self,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        Ok(by_pair(&*self.store.read().await, owner, counterpart))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let state = self.store.read().await;
        let mut edges: Vec<FriendshipEdge> = state
            .friendships
            .values()
            .filter(|edge| edge.owner_id() == owner)
            .cloned()
            .collect();
        edges.sort_by_key(|edge| (edge.created_at(), edge.id()));
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::MemoryTxManager;
    use chrono::Utc;
    use rstest::rstest;

    fn setup() -> (MemoryTxManager, MemoryFriendshipRepo) {
        let store = MemoryStore::new();
        (
            MemoryTxManager::new(store.clone()),
            MemoryFriendshipRepo::new(store),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn uncommitted_writes_are_discarded_on_drop() {
        let (tx_manager, repo) = setup();
        let edge = FriendshipEdge::initiate(UserId::generate(), UserId::generate(), Utc::now());

        {
            let mut tx = tx_manager.begin().await.unwrap();
            repo.insert_in_tx(&mut *tx, &edge).await.unwrap();
            assert!(repo.find_in_tx(&mut *tx, edge.id()).await.unwrap().is_some());
        }

        assert_eq!(repo.count().await, 0);
        assert!(repo.find(edge.id()).await.unwrap().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn rollback_discards_writes_and_releases_the_store() {
        let (tx_manager, repo) = setup();
        let edge = FriendshipEdge::initiate(UserId::generate(), UserId::generate(), Utc::now());

        let mut tx = tx_manager.begin().await.unwrap();
        repo.insert_in_tx(&mut *tx, &edge).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = tx_manager.begin().await.unwrap();
        assert!(repo.find_in_tx(&mut *tx, edge.id()).await.unwrap().is_none());
        repo.insert_in_tx(&mut *tx, &edge).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.count().await, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn ordered_pair_is_unique() {
        let (tx_manager, repo) = setup();
        let (alice, bob) = (UserId::generate(), UserId::generate());
        let first = FriendshipEdge::initiate(alice, bob, Utc::now());
        let again = FriendshipEdge::initiate(alice, bob, Utc::now());

        let mut tx = tx_manager.begin().await.unwrap();
        repo.insert_in_tx(&mut *tx, &first).await.unwrap();
        let err = repo.insert_in_tx(&mut *tx, &again).await.unwrap_err();
        assert!(matches!(err, FriendshipError::DuplicateRelationship));

        // the reverse direction is a different ordered pair
        repo.insert_in_tx(&mut *tx, &first.mirror()).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.count().await, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_frees_the_pair() {
        let (tx_manager, repo) = setup();
        let edge = FriendshipEdge::initiate(UserId::generate(), UserId::generate(), Utc::now());

        let mut tx = tx_manager.begin().await.unwrap();
        repo.insert_in_tx(&mut *tx, &edge).await.unwrap();
        assert!(repo.delete_in_tx(&mut *tx, edge.id()).await.unwrap());
        assert!(!repo.delete_in_tx(&mut *tx, edge.id()).await.unwrap());
        repo.insert_in_tx(&mut *tx, &edge).await.unwrap();
        tx.commit().await.unwrap();

        let found = repo
            .find_by_pair(edge.owner_id(), edge.counterpart_id())
            .await
            .unwrap();
        assert_eq!(found, Some(edge));
    }
}
