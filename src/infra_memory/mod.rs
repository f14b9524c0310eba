//! In-process storage used by the `memory` store backend and by tests.

mod friendship_repo_memory;
mod user_repo_memory;

pub use friendship_repo_memory::*;
pub use user_repo_memory::*;

mod repo_tx_memory;

pub use repo_tx_memory::*;

mod util;
