//! Credential checks for the sample authentication service.

use serde::{Deserialize, Serialize};
use switchboard::{CallContext, ContextError, DomainError, MethodTable, Service};
use thiserror::Error;
use tracing::{debug, info};

const AUTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::auth");

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "password";
const STATUS_OK: &str = "OK";

/// Credentials presented to `Login`.
///
/// Absent fields decode as empty strings, so incomplete credentials fail the
/// credential check rather than the body decode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Account name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Successful `Login` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    /// Human-readable result.
    pub message: String,
    /// Always `OK`.
    pub status: String,
}

/// Account details presented to `Register`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    /// Requested account name.
    pub username: String,
    /// Requested password.
    pub password: String,
}

/// Successful `Register` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterResponse {
    /// Human-readable result.
    pub message: String,
    /// Always `OK`.
    pub status: String,
}

/// Failures raised by [`AuthService`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username and password did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The call was cancelled or timed out before it ran.
    #[error(transparent)]
    Inactive(#[from] ContextError),
}

impl From<AuthError> for DomainError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => Self::new(401, error.to_string()),
            AuthError::Inactive(inner) => inner.into(),
        }
    }
}

/// Sample service authenticating a single built-in account.
#[derive(Debug, Default)]
pub struct AuthService;

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Accepts `admin`/`password` and rejects everything else.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for any other credentials and
    /// [`AuthError::Inactive`] when the call is no longer wanted.
    pub fn login(
        &self,
        ctx: &CallContext,
        request: LoginRequest,
    ) -> Result<LoginResponse, AuthError> {
        ctx.ensure_active()?;
        if request.username != ADMIN_USERNAME || request.password != ADMIN_PASSWORD {
            info!(
                target: AUTH_TARGET,
                username = %request.username,
                request_id = ctx.request_id(),
                "login rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }
        info!(
            target: AUTH_TARGET,
            username = %request.username,
            request_id = ctx.request_id(),
            "login accepted"
        );
        Ok(LoginResponse {
            message: "Login successful".to_owned(),
            status: STATUS_OK.to_owned(),
        })
    }

    /// Acknowledges every registration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Inactive`] when the call is no longer wanted.
    pub fn register(
        &self,
        ctx: &CallContext,
        request: RegisterRequest,
    ) -> Result<RegisterResponse, AuthError> {
        ctx.ensure_active()?;
        debug!(
            target: AUTH_TARGET,
            username = %request.username,
            password_len = request.password.len(),
            "registration accepted"
        );
        Ok(RegisterResponse {
            message: "Registered successful".to_owned(),
            status: STATUS_OK.to_owned(),
        })
    }
}

impl Service for AuthService {
    const NAME: &'static str = "AuthService";

    fn methods(table: &mut MethodTable<Self>) {
        table
            .method("Login", Self::login)
            .method("Register", Self::register);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn login(username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        AuthService::new().login(
            &CallContext::new(),
            LoginRequest {
                username: username.to_owned(),
                password: password.to_owned(),
            },
        )
    }

    #[test]
    fn admin_credentials_log_in() {
        let response = login("admin", "password").expect("admin logs in");
        assert_eq!(response.message, "Login successful");
        assert_eq!(response.status, "OK");
    }

    #[rstest]
    #[case::wrong_password("admin", "hunter2")]
    #[case::wrong_user("root", "password")]
    #[case::case_sensitive("Admin", "password")]
    #[case::empty("", "")]
    fn other_credentials_are_rejected(#[case] username: &str, #[case] password: &str) {
        let error = login(username, password).expect_err("must be rejected");
        let domain = DomainError::from(error);
        assert_eq!(domain.code(), 401);
        assert_eq!(domain.message(), "Invalid credentials");
    }

    #[test]
    fn register_always_succeeds() {
        let response = AuthService::new()
            .register(
                &CallContext::new(),
                RegisterRequest {
                    username: "someone".to_owned(),
                    password: "anything".to_owned(),
                },
            )
            .expect("registration succeeds");
        assert_eq!(response.message, "Registered successful");
    }

    #[test]
    fn expired_calls_map_to_gateway_timeout() {
        let ctx = CallContext::new().with_deadline(std::time::Instant::now());
        let error = AuthService::new()
            .login(
                &ctx,
                LoginRequest {
                    username: "admin".to_owned(),
                    password: "password".to_owned(),
                },
            )
            .expect_err("deadline passed");
        assert_eq!(DomainError::from(error).code(), 504);
    }

    #[rstest]
    #[case::missing_password(r#"{"username":"admin"}"#)]
    #[case::empty_object("{}")]
    #[case::capitalised_keys(r#"{"Username":"admin","Password":"password"}"#)]
    fn incomplete_credentials_fail_the_check(#[case] body: &str) {
        let request: LoginRequest = serde_json::from_str(body).expect("decodes with defaults");
        let error = AuthService::new()
            .login(&CallContext::new(), request)
            .expect_err("must be rejected");
        assert_eq!(DomainError::from(error).code(), 401);
    }

    #[test]
    fn registration_without_fields_succeeds() {
        let request: RegisterRequest = serde_json::from_str("{}").expect("decodes with defaults");
        assert!(request.username.is_empty());
        let response = AuthService::new()
            .register(&CallContext::new(), request)
            .expect("registration succeeds");
        assert_eq!(response.status, "OK");
    }

    #[test]
    fn login_response_field_order_is_stable() {
        let body = serde_json::to_string(&login("admin", "password").expect("login"))
            .expect("encode response");
        assert_eq!(body, r#"{"message":"Login successful","status":"OK"}"#);
    }
}
