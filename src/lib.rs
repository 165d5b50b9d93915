//! Connectivity checks for configured mail accounts.
//!
//! Each check opens one connection with the stored credentials, performs the
//! smallest handshake the transport allows, closes the connection and reports
//! a [`ConnectionTestResult`].

pub mod cli;
pub mod config;
pub mod connections;
pub mod error;
pub mod local;
pub mod logging;
pub mod mailbox;
pub mod outbox;
pub mod result;
pub mod store;
pub mod tester;
pub mod transport;

pub mod imap {
    pub mod client;
    pub mod types;
}

pub mod pop3 {
    pub mod client;
    pub mod types;
}

pub mod smtp {
    pub mod client;
    pub mod types;
}

pub mod office365 {
    pub mod client;
    pub mod types;
}

pub use config::{ProbeOptions, Settings};
pub use error::{ProbeError, Result};
pub use mailbox::{Mailbox, MailboxKind};
pub use outbox::Outbox;
pub use result::ConnectionTestResult;
pub use store::{MemoryStore, RecordStore};
pub use tester::{MailboxConnectionTester, OutboxConnectionTester};
pub use transport::{Connection, Connector, NetworkConnector};
