use crate::domain_model::UserId;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found")]
    UserNotFound,
    #[error("store error: {0}")]
    Store(String),
}

/// Read-only view of the external user directory.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Accepts either a user id or a username.
    async fn resolve(&self, handle_or_id: &str) -> Result<UserId, UserError>;
}
