use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_username(&self, user_id: UserId) -> Result<String, UserError>;

    async fn get_id_by_username(&self, username: &str) -> Result<UserId, UserError>;

    async fn id_exists(&self, user_id: UserId) -> Result<bool, UserError>;
}
