use crate::transport::{Auth, Security};

#[derive(Debug, Clone, PartialEq)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub auth: Auth, // LOGIN for passwords, XOAUTH2 for tokens
    /// Folder opened read-only (EXAMINE) after login, in UTF-8.
    pub folder: Option<String>,
    pub accept_invalid_certs: bool,
}

impl ImapConfig {
    pub const PORT: u16 = 143;
    pub const TLS_PORT: u16 = 993;
}
