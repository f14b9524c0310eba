use crate::domain_model::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Requested { recipient: UserId, initiator: UserId },
    Accepted { recipient: UserId, accepter: UserId },
}

impl Notice {
    pub fn recipient(&self) -> UserId {
        match self {
            Notice::Requested { recipient, .. } | Notice::Accepted { recipient, .. } => *recipient,
        }
    }
}

/// Called once per committed transition, never from inside a transaction.
#[async_trait::async_trait]
pub trait NotificationHook: Send + Sync {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()>;

    async fn notify_requested(&self, recipient: UserId, initiator: UserId) -> anyhow::Result<()> {
        self.notify(Notice::Requested {
            recipient,
            initiator,
        })
        .await
    }

    async fn notify_accepted(&self, recipient: UserId, accepter: UserId) -> anyhow::Result<()> {
        self.notify(Notice::Accepted {
            recipient,
            accepter,
        })
        .await
    }
}
