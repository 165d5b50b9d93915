use crate::transport::{Auth, Security};

#[derive(Debug, Clone, PartialEq)]
pub struct Pop3Config {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub auth: Auth, // USER/PASS for passwords, AUTH XOAUTH2 for tokens
    pub accept_invalid_certs: bool,
}

impl Pop3Config {
    pub const PORT: u16 = 110;
    pub const TLS_PORT: u16 = 995;
}
