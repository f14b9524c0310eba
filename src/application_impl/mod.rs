mod friendship_service_impl;
mod notification_hook_fake;
mod user_service_impl;

pub use friendship_service_impl::*;
pub use notification_hook_fake::*;
pub use user_service_impl::*;
