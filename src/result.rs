use serde::Serialize;
use std::fmt;

use crate::error::ProbeError;

/// Outcome of one connection test.
///
/// Built fresh for every call and handed to the caller, which decides how to
/// display it. The fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTestResult {
    success: bool,
    message: String,
}

impl ConnectionTestResult {
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Render a probe error the way every tester reports it.
    pub fn from_error(error: &ProbeError) -> Self {
        Self::failed(format!("Connection failed: {error}"))
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_parts(self) -> (bool, String) {
        (self.success, self.message)
    }
}

impl From<ConnectionTestResult> for (bool, String) {
    fn from(result: ConnectionTestResult) -> Self {
        result.into_parts()
    }
}

impl fmt::Display for ConnectionTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        write!(f, "{status}: {}", self.message)
    }
}
