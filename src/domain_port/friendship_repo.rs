use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;

/// Both sides of an edge as `(owner -> counterpart, counterpart -> owner)`.
pub type MirrorPair = (Option<FriendshipEdge>, Option<FriendshipEdge>);

#[async_trait::async_trait]
pub trait FriendshipRepo: Send + Sync {
    /// Fails with `DuplicateRelationship` when the ordered pair is taken.
    async fn insert_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        edge: &FriendshipEdge,
    ) -> Result<(), FriendshipError>;

    async fn find_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError>;

    async fn find_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError>;

    async fn find_by_pair_for_update_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError>;

    /// Locks both mirrors with a single statement so that two callers
    /// working on the same edge always take the locks in the same order.
    async fn lock_pair_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<MirrorPair, FriendshipError>;

    /// Persists `state` and `updated_at`.
    async fn update_state_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        edge: &FriendshipEdge,
    ) -> Result<(), FriendshipError>;

    /// Returns whether a row was removed.
    async fn delete_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        id: FriendshipId,
    ) -> Result<bool, FriendshipError>;

    async fn find(&self, id: FriendshipId) -> Result<Option<FriendshipEdge>, FriendshipError>;

    async fn find_by_pair(
        &self,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError>;

    /// Ordered by `(created_at, id)` ascending.
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<FriendshipEdge>, FriendshipError>;
}
