use std::time::Duration;

use crate::transport::{Auth, Security};

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub security: Security, // "tls" = implicit (465), "starttls" (587), "none" (25)
    pub auth: Auth,         // PLAIN/LOGIN for passwords, XOAUTH2 for tokens
    pub timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
}
