use crate::config::Settings;
use crate::mailbox::Mailbox;
use crate::outbox::Outbox;

/// Read-only access to the configured records.
pub trait RecordStore {
    fn mailbox(&self, id: u64) -> Option<Mailbox>;
    /// All mailboxes, in storage order.
    fn mailboxes(&self) -> Vec<Mailbox>;
    fn outbox(&self, id: u64) -> Option<Outbox>;
    /// All outboxes, in storage order.
    fn outboxes(&self) -> Vec<Outbox>;
}

/// Records held in memory, usually loaded from the settings file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    mailboxes: Vec<Mailbox>,
    outboxes: Vec<Outbox>,
}

impl MemoryStore {
    pub fn new(mailboxes: Vec<Mailbox>, outboxes: Vec<Outbox>) -> Self {
        Self {
            mailboxes,
            outboxes,
        }
    }
}

impl From<Settings> for MemoryStore {
    fn from(settings: Settings) -> Self {
        Self::new(settings.mailboxes, settings.outboxes)
    }
}

impl RecordStore for MemoryStore {
    fn mailbox(&self, id: u64) -> Option<Mailbox> {
        self.mailboxes.iter().find(|m| m.id == id).cloned()
    }

    fn mailboxes(&self) -> Vec<Mailbox> {
        self.mailboxes.clone()
    }

    fn outbox(&self, id: u64) -> Option<Outbox> {
        self.outboxes.iter().find(|o| o.id == id).cloned()
    }

    fn outboxes(&self) -> Vec<Outbox> {
        self.outboxes.clone()
    }
}
