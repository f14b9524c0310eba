use crate::domain_model::*;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMail {
    pub message_id: String,
    pub from: String,
    pub to: UserId,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}

/// Delivery mechanics live behind this trait.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}
