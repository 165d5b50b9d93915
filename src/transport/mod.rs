//! The seam between the testers and the network.
//!
//! A [`Connector`] turns a [`ConnectRequest`] into an open [`Connection`].
//! [`probe`] drives one connection through open, verify and close, and always
//! closes what it opened.

use async_trait::async_trait;
use std::{fmt, future::Future, time::Duration};

use crate::error::{ProbeError, Result};
use crate::imap::client::ImapConnection;
use crate::imap::types::ImapConfig;
use crate::office365::client::GraphConnection;
use crate::office365::types::GraphConfig;
use crate::pop3::client::Pop3Connection;
use crate::pop3::types::Pop3Config;
use crate::smtp::client::SmtpConnection;
use crate::smtp::types::SmtpConfig;

pub(crate) mod stream;

/// How the TCP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// TLS from the first byte (IMAPS 993, POP3S 995, SMTPS 465).
    Tls,
    /// Plain connection upgraded with STARTTLS/STLS.
    StartTls,
    /// No encryption at all.
    None,
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Security::Tls => "tls",
            Security::StartTls => "starttls",
            Security::None => "none",
        })
    }
}

/// Stored credentials, already resolved to what goes over the wire.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Password { username: String, password: String },
    OAuth2 { username: String, access_token: String },
}

impl Auth {
    pub fn username(&self) -> &str {
        match self {
            Auth::Password { username, .. } | Auth::OAuth2 { username, .. } => username,
        }
    }

    /// The secret sent to the server: a password or a bearer token.
    pub fn secret(&self) -> &str {
        match self {
            Auth::Password { password, .. } => password,
            Auth::OAuth2 { access_token, .. } => access_token,
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Auth::OAuth2 { username, .. } => f
                .debug_struct("OAuth2")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Everything needed to open one connection to one account.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectRequest {
    Imap(ImapConfig),
    Pop3(Pop3Config),
    Smtp(SmtpConfig),
    Office365(GraphConfig),
}

impl ConnectRequest {
    /// Short human-readable description of the endpoint, used in logs.
    pub fn target(&self) -> String {
        match self {
            ConnectRequest::Imap(c) => format!("imap {}:{} ({})", c.host, c.port, c.security),
            ConnectRequest::Pop3(c) => format!("pop3 {}:{} ({})", c.host, c.port, c.security),
            ConnectRequest::Smtp(c) => format!("smtp {}:{} ({})", c.host, c.port, c.security),
            ConnectRequest::Office365(c) => format!("office365 {}", c.owner),
        }
    }
}

/// An open, authenticated connection.
#[async_trait]
pub trait Connection: Send {
    /// Cheapest round trip proving the session is usable. Must not change
    /// anything on the server.
    async fn verify(&mut self) -> Result<()>;

    /// Politely end the session (LOGOUT, QUIT, ...).
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens connections. The testers only ever talk to this trait.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, request: &ConnectRequest) -> Result<Box<dyn Connection>>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for std::sync::Arc<T> {
    async fn open(&self, request: &ConnectRequest) -> Result<Box<dyn Connection>> {
        (**self).open(request).await
    }
}

/// Real network connector backed by async-imap, lettre and reqwest.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkConnector;

#[async_trait]
impl Connector for NetworkConnector {
    async fn open(&self, request: &ConnectRequest) -> Result<Box<dyn Connection>> {
        log::debug!("opening {}", request.target());
        let connection: Box<dyn Connection> = match request {
            ConnectRequest::Imap(config) => Box::new(ImapConnection::open(config).await?),
            ConnectRequest::Pop3(config) => Box::new(Pop3Connection::open(config).await?),
            ConnectRequest::Smtp(config) => Box::new(SmtpConnection::open(config)?),
            ConnectRequest::Office365(config) => Box::new(GraphConnection::open(config).await?),
        };
        Ok(connection)
    }
}

/// Open, verify and close one connection.
///
/// The connection is closed whether or not verification succeeded; a failing
/// close is logged and does not change the outcome. Each step is bounded by
/// `limit`.
pub async fn probe<C>(connector: &C, request: &ConnectRequest, limit: Duration) -> Result<()>
where
    C: Connector + ?Sized,
{
    let mut connection = within(limit, connector.open(request)).await?;
    let verified = within(limit, connection.verify()).await;
    if let Err(e) = within(limit, connection.close()).await {
        log::warn!("closing {} failed: {e}", request.target());
    }
    verified
}

async fn within<T>(limit: Duration, step: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, step)
        .await
        .map_err(|_| ProbeError::Timeout(limit))?
}
