use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::{MySqlPool, Row};

/// Read-only adapter over the directory's `user` table.
pub struct MySqlUserRepo {
    pool: MySqlPool,
}
impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn get_username(&self, user_id: UserId) -> Result<String, UserError> {
        if let Some(row) =
            sqlx::query("SELECT username FROM user WHERE user_id = ? AND is_active = 1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| UserError::Store(format!("query username: {e}")))?
        {
            return row
                .try_get::<String, _>("username")
                .map_err(|e| UserError::Store(format!("decode username: {e}")));
        }

        Err(UserError::UserNotFound)
    }

    async fn get_id_by_username(&self, username: &str) -> Result<UserId, UserError> {
        if let Some(row) =
            sqlx::query("SELECT user_id FROM user WHERE username = ? AND is_active = 1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| UserError::Store(format!("query user_id: {e}")))?
        {
            return row
                .try_get::<UserId, _>("user_id")
                .map_err(|e| UserError::Store(format!("decode user_id: {e}")));
        }

        Err(UserError::UserNotFound)
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, UserError> {
        let count: i64 = sqlx::query_scalar(
            r#"
SELECT COUNT(1)
FROM user
WHERE user_id = ? AND is_active = 1
"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| UserError::Store(e.to_string()))?;

        Ok(count > 0)
    }
}
