//! Session configuration surface.
//!
//! Parsing configuration files or command-line arguments is out of
//! scope; `SessionConfig` only validates the values the caller already
//! assembled.

use std::time::Duration;

use crate::error::{RemoteError, Result};

/// Parameters for [`crate::session::Session::connect`]. Fields are
/// private; [`SessionConfig::new`] is the only constructor path, so a
/// validated instance can't be bypassed via struct-literal syntax.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    host: String,
    port: u16,
    user: String,
    password: String,
    connect_timeout: Duration,
    auth_timeout: Duration,
    body_timeout: Duration,
}

impl SessionConfig {
    /// Builds a config with timeout defaults "on the order of seconds",
    /// matching the design notes' constants.
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let host = host.into();
        let user = user.into();

        if host.trim().is_empty() {
            return Err(RemoteError::Config("host must not be empty".into()));
        }
        if user.trim().is_empty() {
            return Err(RemoteError::Config("user must not be empty".into()));
        }
        if port == 0 {
            return Err(RemoteError::Config("port must be in 1..=65535".into()));
        }

        Ok(Self {
            host,
            port,
            user,
            password: password.into(),
            connect_timeout: Duration::from_secs(5),
            auth_timeout: Duration::from_secs(5),
            body_timeout: Duration::from_secs(10),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_body_timeout(mut self, timeout: Duration) -> Self {
        self.body_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn auth_timeout(&self) -> Duration {
        self.auth_timeout
    }

    pub fn body_timeout(&self) -> Duration {
        self.body_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_host() {
        assert!(SessionConfig::new("", 1234, "alice", "s3cret").is_err());
    }

    #[test]
    fn rejects_empty_user() {
        assert!(SessionConfig::new("radio.local", 1234, "", "s3cret").is_err());
    }

    #[test]
    fn rejects_zero_port() {
        assert!(SessionConfig::new("radio.local", 0, "alice", "s3cret").is_err());
    }

    #[test]
    fn accepts_well_formed_config() {
        let cfg = SessionConfig::new("radio.local", 28000, "alice", "s3cret").unwrap();
        assert_eq!(cfg.port(), 28000);
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(5));
    }
}
