use crate::domain_port::{Notice, NotificationHook};
use std::sync::Mutex;

/// Records every notice instead of delivering it.
#[derive(Debug, Default)]
pub struct FakeNotificationHook {
    sent: Mutex<Vec<Notice>>,
}

impl FakeNotificationHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl NotificationHook for FakeNotificationHook {
    async fn notify(&self, notice: Notice) -> anyhow::Result<()> {
        self.sent
            .lock()
            .map_err(|e| anyhow::anyhow!("fake hook poisoned: {e}"))?
            .push(notice);
        Ok(())
    }
}
