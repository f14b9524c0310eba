use crate::server::{MailTransport, OutgoingMail};
use crate::logger::*;

/// Writes each mail to the log as one JSON line instead of handing it to an MTA.
pub struct LogMailTransport;

#[async_trait::async_trait]
impl MailTransport for LogMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let payload = serde_json::to_string(mail)?;
        info!(message_id = %mail.message_id, to = %mail.to, %payload, "mail sent");
        Ok(())
    }
}
