//! Core Eufy Security API client: request gateway and auth flow

use crate::config::ClientConfig;
use crate::error::{EufyError, Result};
use crate::session::{AuthState, Session};
use crate::types::{ApiResponse, LoginData, CODE_NEED_VERIFY_CODE};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client as HttpClient;
use serde::Serialize;

pub const AUTH_HEADER: &str = "x-auth-token";

pub(crate) const LOGIN_PATH: &str = "passport/login";
pub(crate) const SEND_VERIFY_CODE_PATH: &str = "sms/send/verify_code";

/// Delivery channel for verification codes (2 = email)
const VERIFY_CODE_BY_EMAIL: u8 = 2;

/// Client for one Eufy account.
///
/// Holds its own [`Session`]; nothing is shared between clients. Methods take
/// `&self` so the client can sit in an `Arc` next to a running timelapse.
pub struct EufyClient {
    http: HttpClient,
    base_url: String,
    session: RwLock<Session>,
}

impl EufyClient {
    /// Create a new client from credentials
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::builder().timeout(config.timeout).build()?;

        let mut session = Session::new(config.email, config.password);
        if let Some(code) = config.verify_code {
            session.set_verify_code(code);
        }

        Ok(Self {
            http,
            base_url: config.base_url,
            session: RwLock::new(session),
        })
    }

    /// POST a JSON body to `path` and unwrap the response envelope.
    ///
    /// The session token goes in the auth header whenever there is one.
    /// Vendor error codes come back inside the `ApiResponse`; only transport
    /// and decoding failures are errors here.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let url = format!("{}/{}", self.base_url, path);
        let token = self.session.read().request_token().map(str::to_owned);

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = token {
            request = request.header(AUTH_HEADER, token);
        }

        tracing::debug!(path = %path, "POST");
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(EufyError::Api {
                code: i64::from(status),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ApiResponse = serde_json::from_slice(&bytes)?;
        tracing::debug!(path = %path, code = parsed.code, "Response");
        Ok(parsed)
    }

    /// Log in with the stored credentials (and pending verify code, if any).
    ///
    /// Vendor rejections come back as `Ok` with the resulting state. When the
    /// request itself fails the error is returned and the session is left
    /// unauthenticated with the failure as its auth message.
    pub async fn login(&self) -> Result<AuthState> {
        #[derive(Serialize)]
        struct LoginRequest {
            email: String,
            password: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            verify_code: Option<String>,
        }

        let request = {
            let session = self.session.read();
            LoginRequest {
                email: session.email.clone(),
                password: session.password.clone(),
                verify_code: session.pending_verify_code().map(str::to_owned),
            }
        };
        let email = request.email.clone();

        let response = match self.post(LOGIN_PATH, &request).await {
            Ok(response) => response,
            Err(err) => {
                self.session
                    .write()
                    .record_request_failure(format!("Login request failed: {}", err));
                return Err(err);
            }
        };

        if response.code == CODE_NEED_VERIFY_CODE {
            let challenge: Option<LoginData> = response
                .data
                .clone()
                .and_then(|data| serde_json::from_value(data).ok());
            let message = format!(
                "{}. A verification code has been sent to {}; log in again with that code.",
                response.message().trim_end_matches('.'),
                email
            );
            self.session.write().record_verification_required(
                message,
                challenge.and_then(|data| data.auth_token),
            );

            if let Err(err) = self.request_verification_code().await {
                self.session
                    .write()
                    .record_failure(format!("Could not send verification code: {}", err));
                return Err(err);
            }

            tracing::info!(email = %email, "Login needs a verification code");
            return Ok(AuthState::AwaitingVerification);
        }

        if !response.is_success() {
            tracing::warn!(email = %email, code = response.code, "Login rejected");
            self.session.write().record_failure(response.message());
            return Ok(AuthState::Unauthenticated);
        }

        let data: LoginData = match response.into_data() {
            Ok(data) => data,
            Err(err) => {
                self.session.write().record_failure(err.to_string());
                return Err(err);
            }
        };

        let Some(token) = data.auth_token.filter(|token| !token.is_empty()) else {
            let message = "login response carried no auth token".to_string();
            self.session.write().record_failure(message.clone());
            return Err(EufyError::Protocol(message));
        };

        let expires_at = data
            .token_expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        self.session.write().record_success(token, expires_at);

        tracing::info!(email = %email, expires_at = ?expires_at, "Logged in");
        Ok(AuthState::Authenticated)
    }

    /// Ask the vendor to send a fresh verification code.
    ///
    /// Every call sends a new code and invalidates the previous one.
    pub async fn request_verification_code(&self) -> Result<()> {
        #[derive(Serialize)]
        struct VerifyCodeRequest {
            message_type: u8,
        }

        let response = self
            .post(
                SEND_VERIFY_CODE_PATH,
                &VerifyCodeRequest {
                    message_type: VERIFY_CODE_BY_EMAIL,
                },
            )
            .await?;

        if !response.is_success() {
            tracing::debug!(code = response.code, "Verification code request not acknowledged");
        }
        Ok(())
    }

    /// Return a usable token, logging in once if there is none.
    ///
    /// A token past its advertised expiry counts as none. A token the server
    /// rejects mid-session is not detected here; call [`login`](Self::login)
    /// again after such a failure.
    pub async fn ensure_authenticated(&self) -> Result<String> {
        {
            let session = self.session.read();
            if let Some(token) = session.valid_token(Utc::now()) {
                return Ok(token.to_string());
            }

            // Logging in again would send a new code and void the one
            // already on its way.
            if session.state() == AuthState::AwaitingVerification
                && session.pending_verify_code().is_none()
            {
                return Err(EufyError::VerificationRequired(auth_message(&session)));
            }
        }

        let state = self.login().await?;
        let session = self.session.read();

        match state {
            AuthState::Authenticated => session
                .auth_token()
                .map(str::to_owned)
                .ok_or_else(|| EufyError::AuthRequired(auth_message(&session))),
            AuthState::AwaitingVerification => {
                Err(EufyError::VerificationRequired(auth_message(&session)))
            }
            AuthState::Unauthenticated => Err(EufyError::AuthRequired(auth_message(&session))),
        }
    }

    /// Supply a verification code received out-of-band; the next
    /// [`login`](Self::login) sends it
    pub fn set_verify_code(&self, code: impl Into<String>) {
        self.session.write().set_verify_code(code);
    }

    pub fn logout(&self) {
        self.session.write().logout();
    }

    pub fn state(&self) -> AuthState {
        self.session.read().state()
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn auth_message(session: &Session) -> String {
    session
        .last_auth_message()
        .unwrap_or("not logged in")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected_before_any_request() {
        let result = EufyClient::new(ClientConfig::new("", "pw"));
        assert!(matches!(result, Err(EufyError::Config(_))));
    }

    #[test]
    fn construction_carries_verify_code_into_session() {
        let client =
            EufyClient::new(ClientConfig::new("a@b.c", "pw").with_verify_code("123456")).unwrap();
        let session = client.session();

        assert_eq!(session.pending_verify_code(), Some("123456"));
        assert_eq!(client.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn awaiting_verification_without_code_does_not_relogin() {
        // Port 9 is discard; any request would fail with a transport error.
        let client = EufyClient::new(
            ClientConfig::new("a@b.c", "pw").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        client
            .session
            .write()
            .record_verification_required("check your inbox".into(), None);

        match client.ensure_authenticated().await {
            Err(EufyError::VerificationRequired(message)) => {
                assert_eq!(message, "check your inbox")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
