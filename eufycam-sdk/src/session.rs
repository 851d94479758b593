//! In-memory authentication state for one account

use chrono::{DateTime, Utc};

/// Where the auth flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
    /// Credentials were accepted but a one-time code was sent out-of-band
    AwaitingVerification,
}

/// Credentials plus whatever the last login left behind.
///
/// Only the auth flow mutates a session. The `record_*` methods keep the
/// token and the auth message mutually exclusive: a token is present only
/// while there is no message.
#[derive(Clone)]
pub struct Session {
    pub email: String,
    pub password: String,
    auth_token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    pending_verify_code: Option<String>,
    last_auth_message: Option<String>,
    // Short-lived token handed out with a verification challenge; only
    // good for sending the code and retrying login.
    challenge_token: Option<String>,
    state: AuthState,
}

impl Session {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            auth_token: None,
            token_expires_at: None,
            pending_verify_code: None,
            last_auth_message: None,
            challenge_token: None,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.token_expires_at
    }

    pub fn pending_verify_code(&self) -> Option<&str> {
        self.pending_verify_code.as_deref()
    }

    pub fn last_auth_message(&self) -> Option<&str> {
        self.last_auth_message.as_deref()
    }

    /// Token usable at `now`: present and not past its advertised expiry
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        match self.token_expires_at {
            Some(expires_at) if expires_at <= now => None,
            _ => self.auth_token.as_deref(),
        }
    }

    /// Token to attach to a request: the session token, or the challenge
    /// token while awaiting verification
    pub(crate) fn request_token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .or(self.challenge_token.as_deref())
    }

    pub fn set_verify_code(&mut self, code: impl Into<String>) {
        self.pending_verify_code = Some(code.into());
    }

    pub(crate) fn record_success(&mut self, token: String, expires_at: Option<DateTime<Utc>>) {
        self.auth_token = Some(token);
        self.token_expires_at = expires_at;
        self.pending_verify_code = None;
        self.last_auth_message = None;
        self.challenge_token = None;
        self.state = AuthState::Authenticated;
    }

    pub(crate) fn record_failure(&mut self, message: String) {
        self.clear_token();
        // A code that was just rejected cannot be reused.
        self.pending_verify_code = None;
        self.last_auth_message = Some(message);
        self.challenge_token = None;
        self.state = AuthState::Unauthenticated;
    }

    /// The login request never got an answer; any pending code was not
    /// rejected and is kept for the next attempt
    pub(crate) fn record_request_failure(&mut self, message: String) {
        self.clear_token();
        self.challenge_token = None;
        self.last_auth_message = Some(message);
        self.state = AuthState::Unauthenticated;
    }

    pub(crate) fn record_verification_required(
        &mut self,
        message: String,
        challenge_token: Option<String>,
    ) {
        self.clear_token();
        self.pending_verify_code = None;
        self.last_auth_message = Some(message);
        self.challenge_token = challenge_token;
        self.state = AuthState::AwaitingVerification;
    }

    /// Forget the token but keep credentials and any pending code
    pub fn logout(&mut self) {
        self.clear_token();
        self.challenge_token = None;
        self.last_auth_message = None;
        self.state = AuthState::Unauthenticated;
    }

    fn clear_token(&mut self) {
        self.auth_token = None;
        self.token_expires_at = None;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.email)
            .field("state", &self.state)
            .field("has_token", &self.auth_token.is_some())
            .field("token_expires_at", &self.token_expires_at)
            .field("has_pending_verify_code", &self.pending_verify_code.is_some())
            .field("last_auth_message", &self.last_auth_message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> Session {
        Session::new("user@example.com", "secret")
    }

    #[test]
    fn success_clears_previous_failure() {
        let mut s = session();
        s.record_failure("bad password".into());
        s.set_verify_code("123456");

        s.record_success("tok".into(), None);

        assert_eq!(s.state(), AuthState::Authenticated);
        assert_eq!(s.auth_token(), Some("tok"));
        assert!(s.last_auth_message().is_none());
        assert!(s.pending_verify_code().is_none());
    }

    #[test]
    fn failure_clears_token() {
        let mut s = session();
        s.record_success("tok".into(), Some(Utc::now() + Duration::days(30)));

        s.record_failure("Account or password incorrect".into());

        assert_eq!(s.state(), AuthState::Unauthenticated);
        assert!(s.auth_token().is_none());
        assert!(s.token_expires_at().is_none());
        assert_eq!(s.last_auth_message(), Some("Account or password incorrect"));
    }

    #[test]
    fn verification_keeps_invariant() {
        let mut s = session();
        s.record_success("tok".into(), None);

        s.record_verification_required("check your email".into(), Some("challenge".into()));

        assert_eq!(s.state(), AuthState::AwaitingVerification);
        assert!(s.auth_token().is_none());
        assert!(s.last_auth_message().is_some());
        assert_eq!(s.request_token(), Some("challenge"));

        s.record_success("tok".into(), None);
        assert_eq!(s.request_token(), Some("tok"));
    }

    #[test]
    fn request_failure_drops_token_but_keeps_code() {
        let mut s = session();
        s.record_success("tok".into(), None);
        s.set_verify_code("123456");

        s.record_request_failure("Login request failed: timeout".into());

        assert_eq!(s.state(), AuthState::Unauthenticated);
        assert!(s.auth_token().is_none());
        assert_eq!(s.pending_verify_code(), Some("123456"));
        assert_eq!(s.last_auth_message(), Some("Login request failed: timeout"));
    }

    #[test]
    fn expired_token_is_not_valid() {
        let now = Utc::now();
        let mut s = session();

        s.record_success("tok".into(), Some(now - Duration::seconds(1)));
        assert!(s.valid_token(now).is_none());

        s.record_success("tok".into(), Some(now + Duration::hours(1)));
        assert_eq!(s.valid_token(now), Some("tok"));

        s.record_success("tok".into(), None);
        assert_eq!(s.valid_token(now), Some("tok"));
    }

    #[test]
    fn logout_keeps_pending_code() {
        let mut s = session();
        s.record_success("tok".into(), None);
        s.set_verify_code("654321");

        s.logout();

        assert_eq!(s.state(), AuthState::Unauthenticated);
        assert!(s.auth_token().is_none());
        assert_eq!(s.pending_verify_code(), Some("654321"));
    }

    #[test]
    fn debug_hides_credentials() {
        let mut s = session();
        s.record_success("very-secret-token".into(), None);
        let printed = format!("{:?}", s);
        assert!(!printed.contains("secret\""));
        assert!(!printed.contains("very-secret-token"));
    }
}
