use std::fmt;
use std::time::Duration;

/// Client-credentials access to Microsoft Graph on behalf of one account.
#[derive(Clone, PartialEq)]
pub struct GraphConfig {
    /// Token authority, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    /// Graph root, e.g. `https://graph.microsoft.com/v1.0`.
    pub graph_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Mailbox owner whose profile must be readable.
    pub owner: String,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("authority", &self.authority)
            .field("graph_url", &self.graph_url)
            .field("client_id", &self.client_id)
            .field("owner", &self.owner)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
