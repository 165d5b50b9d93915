//! Error type shared by every transport probe.
//!
//! None of these ever reach a caller of the testers: they are rendered into
//! the message of a failed [`ConnectionTestResult`](crate::ConnectionTestResult).

use std::{io, time::Duration};
use thiserror::Error;

/// Everything that can go wrong while loading records or probing an account.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The stored record cannot be turned into a connection attempt.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The record names a transport or provider this crate does not know.
    #[error("unsupported transport kind: {0}")]
    UnsupportedKind(String),

    /// The mailbox URI could not be parsed (bad scheme, bad port, ...).
    #[error("invalid URI: {0}")]
    Uri(#[from] url::ParseError),

    /// Socket or file system error, with what we were doing at the time.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// TLS connector setup or handshake failure.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// The server rejected the stored credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// IMAP protocol error after the session was established.
    #[error("IMAP error: {0}")]
    Imap(String),

    /// POP3 server answered `-ERR` or broke the dialogue.
    #[error("POP3 error: {0}")]
    Pop3(String),

    /// Error raised by the SMTP transport.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// SMTP server answered, but not the way a healthy server does.
    #[error("SMTP error: {0}")]
    SmtpReply(String),

    /// Error raised by the HTTP client talking to Office365.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Office365 answered with an error document.
    #[error("Office365 error: {0}")]
    Office365(String),

    /// A local mailbox path is missing or not in the expected format.
    #[error("local mailbox error: {0}")]
    LocalPath(String),

    /// The attempt did not finish in time.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The records file is not valid TOML for our schema.
    #[error("configuration file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ProbeError {
    /// Wrap an I/O error with a short description of the failed step.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ProbeError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
