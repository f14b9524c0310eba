use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// Stand-in for the external user directory.
#[derive(Debug, Default)]
pub struct MemoryUserRepo {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users<'a>(usernames: impl IntoIterator<Item = &'a str>) -> Result<Self, UserError> {
        let repo = Self::new();
        for username in usernames {
            repo.insert(username)?;
        }
        Ok(repo)
    }

    pub fn insert(&self, username: &str) -> Result<UserId, UserError> {
        let user_id = UserId::generate();
        let record = UserRecord {
            user_id,
            username: username.to_owned(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.write(|users| users.insert(user_id, record))?;
        Ok(user_id)
    }

    /// Keeps the record but hides it from every lookup.
    pub fn deactivate(&self, user_id: UserId) -> Result<bool, UserError> {
        self.write(|users| match users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = false;
                true
            }
            None => false,
        })
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<UserId, UserRecord>) -> T) -> Result<T, UserError> {
        self.users
            .write()
            .map(|mut users| f(&mut users))
            .map_err(|e| UserError::Store(e.to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<UserId, UserRecord>) -> T) -> Result<T, UserError> {
        self.users
            .read()
            .map(|users| f(&users))
            .map_err(|e| UserError::Store(e.to_string()))
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn get_username(&self, user_id: UserId) -> Result<String, UserError> {
        self.read(|users| {
            users
                .get(&user_id)
                .filter(|u| u.is_active)
                .map(|u| u.username.clone())
        })?
        .ok_or(UserError::UserNotFound)
    }

    async fn get_id_by_username(&self, username: &str) -> Result<UserId, UserError> {
        self.read(|users| {
            users
                .values()
                .find(|u| u.is_active && u.username == username)
                .map(|u| u.user_id)
        })?
        .ok_or(UserError::UserNotFound)
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, UserError> {
        self.read(|users| users.get(&user_id).is_some_and(|u| u.is_active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn deactivated_user_disappears_from_every_lookup() {
        let repo = MemoryUserRepo::with_users(["anna"]).unwrap();
        let fred = repo.insert("fred").unwrap();
        assert!(repo.id_exists(fred).await.unwrap());

        assert!(repo.deactivate(fred).unwrap());

        assert!(!repo.id_exists(fred).await.unwrap());
        assert!(matches!(repo.get_username(fred).await, Err(UserError::UserNotFound)));
        assert!(matches!(
            repo.get_id_by_username("fred").await,
            Err(UserError::UserNotFound)
        ));
        assert!(repo.get_id_by_username("anna").await.is_ok());
    }

    #[rstest]
    fn deactivating_an_unknown_user_is_a_no_op() {
        let repo = MemoryUserRepo::new();
        assert!(!repo.deactivate(UserId::generate()).unwrap());
    }
}
