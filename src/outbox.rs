//! Outgoing account records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::{ProbeError, Result};
use crate::result::ConnectionTestResult;
use crate::tester::OutboxConnectionTester;
use crate::transport::{Connector, NetworkConnector, Security};

fn default_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

/// A configured SMTP-style sending account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbox {
    pub id: u64,
    pub name: String,
    pub email_host: String,
    #[serde(default = "default_port")]
    pub email_port: u16,
    pub email_host_user: String,
    #[serde(default)]
    pub email_host_password: String,
    #[serde(default = "default_true")]
    pub email_use_tls: bool,
    #[serde(default)]
    pub email_use_ssl: bool,
    /// Seconds; falls back to the global probe timeout.
    #[serde(default)]
    pub email_timeout: Option<u64>,
    #[serde(default)]
    pub email_ssl_keyfile: Option<String>,
    #[serde(default)]
    pub email_ssl_certfile: Option<String>,
    /// `smtp`, `office365` or `gmail`. Inferred from `email_host` when absent.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl Outbox {
    /// TLS and SSL cannot both be requested.
    pub fn validate(&self) -> Result<()> {
        if self.email_use_tls && self.email_use_ssl {
            return Err(ProbeError::Config(
                "EMAIL_USE_TLS and EMAIL_USE_SSL are mutually exclusive, set only one of them"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn security(&self) -> Security {
        if self.email_use_ssl {
            Security::Tls
        } else if self.email_use_tls {
            Security::StartTls
        } else {
            Security::None
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.email_timeout.map(Duration::from_secs)
    }

    /// Test with the network connector and default options.
    pub async fn test_connection(&self) -> ConnectionTestResult {
        OutboxConnectionTester::<NetworkConnector>::default().test(self).await
    }

    pub async fn test_connection_with<C: Connector>(
        &self,
        tester: &OutboxConnectionTester<C>,
    ) -> ConnectionTestResult {
        tester.test(self).await
    }
}

impl fmt::Display for Outbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}",
            self.email_host_user, self.email_host, self.email_port
        )
    }
}
