use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;

pub struct RealFriendshipService {
    user_service: Arc<dyn UserService>,
    friendship_repo: Arc<dyn FriendshipRepo>,
    notification_hook: Arc<dyn NotificationHook>,
    tx_manager: Arc<dyn TxManager>,
}

fn store_error(e: anyhow::Error) -> FriendshipError {
    FriendshipError::Store(e.to_string())
}

impl RealFriendshipService {
    pub fn new(
        user_service: Arc<dyn UserService>,
        friendship_repo: Arc<dyn FriendshipRepo>,
        notification_hook: Arc<dyn NotificationHook>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            user_service,
            friendship_repo,
            notification_hook,
            tx_manager,
        }
    }

    /// The counterpart's record of the same edge, if it exists.
    pub async fn mirror_of(
        &self,
        edge: &FriendshipEdge,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        self.friendship_repo
            .find_by_pair(edge.counterpart_id(), edge.owner_id())
            .await
    }

    async fn owned_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<FriendshipEdge, FriendshipError> {
        self.friendship_repo
            .find_in_tx(tx, id)
            .await?
            .filter(|edge| edge.owner_id() == owner)
            .ok_or(FriendshipError::NotFound)
    }

    /// Re-reads both mirrors under lock. The owner's side must still be the
    /// record the caller asked for.
    async fn lock_mirrors_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<(FriendshipEdge, Option<FriendshipEdge>), FriendshipError> {
        let record = self.owned_in_tx(tx, owner, id).await?;
        let (record, mirror) = self
            .friendship_repo
            .lock_pair_in_tx(tx, record.owner_id(), record.counterpart_id())
            .await?;
        let record = record
            .filter(|edge| edge.id() == id)
            .ok_or(FriendshipError::NotFound)?;
        Ok((record, mirror))
    }

    async fn accept_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let now = Utc::now();
        let (mut record, mirror) = self.lock_mirrors_in_tx(tx, owner, id).await?;
        let Some(mut mirror) = mirror else {
            error!(
                friendship_id = %id,
                owner = %record.owner_id(),
                counterpart = %record.counterpart_id(),
                "mirror record missing, friendship is half-written"
            );
            return Err(FriendshipError::NoMirror(id));
        };

        record
            .transition(FriendshipOp::Accept, now)
            .map_err(|e| rejected(&record, e))?;
        mirror
            .transition(FriendshipOp::Accept, now)
            .map_err(|e| rejected(&mirror, e))?;

        self.friendship_repo.update_state_in_tx(tx, &record).await?;
        self.friendship_repo.update_state_in_tx(tx, &mirror).await?;
        Ok(record)
    }

    async fn block_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<FriendshipEdge, FriendshipError> {
        // the mirror is never read
        let mut record = self
            .friendship_repo
            .find_for_update_in_tx(tx, id)
            .await?
            .filter(|edge| edge.owner_id() == owner)
            .ok_or(FriendshipError::NotFound)?;
        record
            .transition(FriendshipOp::Block, Utc::now())
            .map_err(|e| rejected(&record, e))?;

        self.friendship_repo.update_state_in_tx(tx, &record).await?;
        Ok(record)
    }

    async fn block_user_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        counterpart: UserId,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let now = Utc::now();
        let existing = self
            .friendship_repo
            .find_by_pair_for_update_in_tx(tx, owner, counterpart)
            .await?;
        match existing {
            Some(mut record) => {
                record
                    .transition(FriendshipOp::Block, now)
                    .map_err(|e| rejected(&record, e))?;
                self.friendship_repo.update_state_in_tx(tx, &record).await?;
                Ok(record)
            }
            None => {
                let record = FriendshipEdge::blocked(owner, counterpart, now);
                // a concurrent request took the pair after our read
                self.friendship_repo
                    .insert_in_tx(tx, &record)
                    .await
                    .map_err(|e| match e {
                        FriendshipError::DuplicateRelationship => FriendshipError::Conflict,
                        other => other,
                    })?;
                Ok(record)
            }
        }
    }

    async fn destroy_in_tx(
        &self,
        tx: &mut dyn StorageTx<'_>,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let (record, mirror) = self.lock_mirrors_in_tx(tx, owner, id).await?;
        record
            .state()
            .apply(FriendshipOp::Destroy)
            .map_err(|e| rejected(&record, e))?;
        if !self.friendship_repo.delete_in_tx(tx, id).await? {
            return Err(FriendshipError::NotFound);
        }

        match mirror {
            // The counterpart's own block outlives the friendship, so their
            // ListFor(blocked) keeps listing this owner after the destroy.
            Some(mirror) if mirror.state() == FriendshipState::Blocked => {
                debug!(friendship_id = %mirror.id(), "keeping counterpart's block");
            }
            Some(mirror) => {
                mirror
                    .state()
                    .apply(FriendshipOp::Destroy)
                    .map_err(|e| rejected(&mirror, e))?;
                self.friendship_repo.delete_in_tx(tx, mirror.id()).await?;
            }
            None => {}
        }
        Ok(record)
    }

    async fn resolve_counterpart(
        &self,
        owner: UserId,
        counterpart: &str,
    ) -> Result<UserId, FriendshipError> {
        let counterpart = self.user_service.resolve(counterpart).await?;
        if counterpart == owner {
            warn!(%owner, "rejected relationship with self");
            return Err(FriendshipError::SelfRelationship);
        }
        Ok(counterpart)
    }
}

fn rejected(edge: &FriendshipEdge, e: TransitionRejected) -> FriendshipError {
    warn!(friendship_id = %edge.id(), owner = %edge.owner_id(), "{e}");
    FriendshipError::InvalidTransition(e)
}

/// Commits on success. On failure rolls back and hands the original error on.
async fn finish<'t, T>(
    tx: Box<dyn StorageTx<'t> + 't>,
    result: Result<T, FriendshipError>,
) -> Result<T, FriendshipError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(store_error)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!("rollback after `{e}` failed: {rollback:#}");
            }
            Err(e)
        }
    }
}

#[async_trait::async_trait]
impl FriendshipService for RealFriendshipService {
    async fn request(
        &self,
        initiator: UserId,
        recipient: &str,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let recipient = self.resolve_counterpart(initiator, recipient).await?;

        let edge = FriendshipEdge::initiate(initiator, recipient, Utc::now());
        let mirror = edge.mirror();

        // a taken pair on either side aborts both inserts
        let mut tx = self.tx_manager.begin().await.map_err(store_error)?;
        let inserted = match self.friendship_repo.insert_in_tx(&mut *tx, &edge).await {
            Ok(()) => self.friendship_repo.insert_in_tx(&mut *tx, &mirror).await,
            Err(e) => Err(e),
        };
        finish(tx, inserted).await?;

        info!(friendship_id = %edge.id(), %initiator, %recipient, "friend request sent");

        if let Err(e) = self
            .notification_hook
            .notify_requested(recipient, initiator)
            .await
        {
            warn!(%recipient, "request notification failed: {e:#}");
        }

        Ok(edge)
    }

    async fn accept(
        &self,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let mut tx = self.tx_manager.begin().await.map_err(store_error)?;
        let accepted = self.accept_in_tx(&mut *tx, owner, id).await;
        let record = finish(tx, accepted).await?;

        let counterpart = record.counterpart_id();
        info!(friendship_id = %id, %owner, %counterpart, "friend request accepted");

        if let Err(e) = self
            .notification_hook
            .notify_accepted(counterpart, owner)
            .await
        {
            warn!(%counterpart, "acceptance notification failed: {e:#}");
        }

        Ok(record)
    }

    async fn block(
        &self,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let mut tx = self.tx_manager.begin().await.map_err(store_error)?;
        let blocked = self.block_in_tx(&mut *tx, owner, id).await;
        let record = finish(tx, blocked).await?;

        info!(friendship_id = %id, %owner, counterpart = %record.counterpart_id(), "blocked");
        Ok(record)
    }

    async fn block_user(
        &self,
        owner: UserId,
        counterpart: &str,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let counterpart = self.resolve_counterpart(owner, counterpart).await?;

        let mut tx = self.tx_manager.begin().await.map_err(store_error)?;
        let blocked = self.block_user_in_tx(&mut *tx, owner, counterpart).await;
        let record = finish(tx, blocked).await?;

        info!(friendship_id = %record.id(), %owner, %counterpart, "blocked");
        Ok(record)
    }

    async fn destroy_mutual(&self, owner: UserId, id: FriendshipId) -> Result<(), FriendshipError> {
        let mut tx = self.tx_manager.begin().await.map_err(store_error)?;
        let destroyed = self.destroy_in_tx(&mut *tx, owner, id).await;
        let record = finish(tx, destroyed).await?;

        info!(friendship_id = %id, %owner, counterpart = %record.counterpart_id(), "friendship destroyed");
        Ok(())
    }

    async fn find_mutual(
        &self,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError> {
        let record = self
            .friendship_repo
            .find(id)
            .await?
            .filter(|edge| edge.owner_id() == owner)
            .ok_or(FriendshipError::NotFound)?;
        self.mirror_of(&record).await
    }

    async fn show(
        &self,
        owner: UserId,
        counterpart: &str,
    ) -> Result<FriendshipEdge, FriendshipError> {
        let counterpart = self.user_service.resolve(counterpart).await?;
        self.friendship_repo
            .find_by_pair(owner, counterpart)
            .await?
            .ok_or(FriendshipError::NotFound)
    }

    async fn list_for(
        &self,
        owner: UserId,
        category: FriendshipCategory,
    ) -> Result<Vec<FriendshipEdge>, FriendshipError> {
        let mut edges = self.friendship_repo.list_by_owner(owner).await?;
        edges.retain(|edge| category.matches(edge.status()));
        Ok(edges)
    }
}
