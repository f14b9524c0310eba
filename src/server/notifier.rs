use crate::domain_model::UserId;
use crate::domain_port::*;
use crate::logger::*;
use crate::server::{MailTransport, OutgoingMail};
use nanoid::nanoid;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;

/// Hands notices to the [`Mailer`] without waiting for delivery.
pub struct MailQueueHook {
    queue: Sender<Notice>,
}

impl MailQueueHook {
    pub fn new(capacity: usize) -> (Self, Receiver<Notice>) {
        let (queue, receiver) = mpsc::channel(capacity);
        (Self { queue }, receiver)
    }
}

#[async_trait::async_trait]
impl NotificationHook for MailQueueHook {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()> {
        // a full queue drops the notice rather than stalling the caller
        self.queue
            .try_send(notice)
            .map_err(|e| anyhow::anyhow!("mail queue: {e}"))
    }
}

pub struct Mailer {
    queue: Receiver<Notice>,
    user_repo: Arc<dyn UserRepo>,
    transport: Arc<dyn MailTransport>,
    sender: String,
    cancellation_token: CancellationToken,
}

impl Mailer {
    pub fn new(
        queue: Receiver<Notice>,
        user_repo: Arc<dyn UserRepo>,
        transport: Arc<dyn MailTransport>,
        sender: &str,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            queue,
            user_repo,
            transport,
            sender: sender.to_owned(),
            cancellation_token,
        }
    }

    async fn display_name(&self, user_id: UserId) -> String {
        match self.user_repo.get_username(user_id).await {
            Ok(username) => username,
            Err(e) => {
                debug!(%user_id, "no username for mail: {e}");
                user_id.to_string()
            }
        }
    }

    async fn render(&self, notice: Notice) -> OutgoingMail {
        let to = notice.recipient();
        let to_name = self.display_name(to).await;

        let (subject, body) = match notice {
            Notice::Requested { initiator, .. } => {
                let name = self.display_name(initiator).await;
                (
                    format!("{name} wants to be your friend"),
                    format!("Hi {to_name},\n\n{name} sent you a friend request."),
                )
            }
            Notice::Accepted { accepter, .. } => {
                let name = self.display_name(accepter).await;
                (
                    format!("{name} accepted your friend request"),
                    format!("Hi {to_name},\n\nYou are now friends with {name}."),
                )
            }
        };

        OutgoingMail {
            message_id: nanoid!(),
            from: self.sender.clone(),
            to,
            to_name,
            subject,
            body,
        }
    }

    async fn deliver(&self, notice: Notice) {
        let mail = self.render(notice).await;
        if let Err(e) = self.transport.send(&mail).await {
            error!(message_id = %mail.message_id, to = %mail.to, "mail delivery failed: {e:#}");
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!("Mailer shutting down...");
                    break;
                }
                notice = self.queue.recv() => {
                    match notice {
                        Some(notice) => self.deliver(notice).await,
                        None => break,
                    }
                }
            }
        }

        // flush what was queued before shutdown
        self.queue.close();
        while let Ok(notice) = self.queue.try_recv() {
            self.deliver(notice).await;
        }
        Ok(())
    }
}
