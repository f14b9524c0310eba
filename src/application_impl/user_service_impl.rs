use crate::application_port::{UserError, UserService};
use crate::domain_model::UserId;
use crate::domain_port::UserRepo;
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>) -> RealUserService {
        RealUserService { user_repo }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn resolve(&self, handle_or_id: &str) -> Result<UserId, UserError> {
        let handle_or_id = handle_or_id.trim();

        if let Ok(user_id) = handle_or_id.parse::<UserId>() {
            return match self.user_repo.id_exists(user_id).await? {
                true => Ok(user_id),
                false => Err(UserError::UserNotFound),
            };
        }

        self.user_repo.get_id_by_username(handle_or_id).await
    }
}
