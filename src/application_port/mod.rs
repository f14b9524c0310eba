mod friendship_service;
mod user_service;

pub use friendship_service::*;
pub use user_service::*;
