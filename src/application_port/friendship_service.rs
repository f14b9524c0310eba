use crate::application_port::UserError;
use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum FriendshipError {
    #[error("cannot befriend yourself")]
    SelfRelationship,
    #[error("friendship already exists")]
    DuplicateRelationship,
    #[error("friendship not found")]
    NotFound,
    #[error("mirror record missing for friendship {0}")]
    NoMirror(FriendshipId),
    #[error("unknown counterpart")]
    UnknownCounterpart,
    #[error(transparent)]
    InvalidTransition(#[from] TransitionRejected),
    #[error("conflicting concurrent update, retry")]
    Conflict,
    #[error("store error: {0}")]
    Store(String),
}

impl From<UserError> for FriendshipError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::UserNotFound => FriendshipError::UnknownCounterpart,
            UserError::Store(e) => FriendshipError::Store(e),
        }
    }
}

/// Every operation is scoped to `owner`: an id that belongs to somebody
/// else resolves as [`FriendshipError::NotFound`].
#[async_trait::async_trait]
pub trait FriendshipService: Send + Sync {
    /// Creates both mirrors and notifies the recipient once.
    async fn request(
        &self,
        initiator: UserId,
        recipient: &str,
    ) -> Result<FriendshipEdge, FriendshipError>;

    /// Accepts both mirrors and notifies the counterpart once.
    async fn accept(
        &self,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<FriendshipEdge, FriendshipError>;

    /// Blocks the owner's record only.
    async fn block(&self, owner: UserId, id: FriendshipId)
    -> Result<FriendshipEdge, FriendshipError>;

    /// Blocks a user whether or not a relationship exists yet.
    async fn block_user(
        &self,
        owner: UserId,
        counterpart: &str,
    ) -> Result<FriendshipEdge, FriendshipError>;

    async fn destroy_mutual(&self, owner: UserId, id: FriendshipId)
    -> Result<(), FriendshipError>;

    async fn find_mutual(
        &self,
        owner: UserId,
        id: FriendshipId,
    ) -> Result<Option<FriendshipEdge>, FriendshipError>;

    /// The owner's record for a counterpart given by handle or id.
    async fn show(&self, owner: UserId, counterpart: &str)
    -> Result<FriendshipEdge, FriendshipError>;

    /// Ordered by creation time, oldest first.
    async fn list_for(
        &self,
        owner: UserId,
        category: FriendshipCategory,
    ) -> Result<Vec<FriendshipEdge>, FriendshipError>;
}
