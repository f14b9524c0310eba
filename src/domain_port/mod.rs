mod friendship_repo;
mod notification_hook;
mod user_repo;

mod repo_tx;

pub use friendship_repo::*;
pub use notification_hook::*;
pub use user_repo::*;

pub use repo_tx::*;
