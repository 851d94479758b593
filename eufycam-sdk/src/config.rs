//! Client construction inputs

use crate::error::{EufyError, Result};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://mysecurity.eufylife.com/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Account credentials and transport settings for one client
#[derive(Clone)]
pub struct ClientConfig {
    pub email: String,
    pub password: String,
    /// Code received out-of-band after a previous verification challenge
    pub verify_code: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            verify_code: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_verify_code(mut self, code: impl Into<String>) -> Self {
        self.verify_code = Some(code.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(EufyError::Config("email is empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(EufyError::Config("password is empty".to_string()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(EufyError::Config(format!(
                "base url must be http(s): {}",
                self.base_url
            )));
        }
        Ok(())
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("verify_code", &self.verify_code.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let config = ClientConfig::new("a@b.c", "pw").with_base_url("http://127.0.0.1:8080/");
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert!(matches!(
            ClientConfig::new("", "pw").validate(),
            Err(EufyError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::new("a@b.c", "").validate(),
            Err(EufyError::Config(_))
        ));
        assert!(ClientConfig::new("a@b.c", "pw").validate().is_ok());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = ClientConfig::new("a@b.c", "hunter2").with_verify_code("123456");
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("123456"));
    }
}
