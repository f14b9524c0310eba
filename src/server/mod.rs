mod mail_transport_impl;
mod notifier;
mod port;
mod server;

pub use mail_transport_impl::*;
pub use notifier::*;
pub use port::*;
pub use server::*;
