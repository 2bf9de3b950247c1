use tracing::{info, warn};

use crate::error::ApiError;

use super::http::ApiClient;
use super::types::{
    AuthToken, LoginCredentials, MessageReceipt, PasswordChange, PasswordReset, RegisterData,
    RegisterReceipt, TempPassword, User,
};

/// Account endpoints. The bearer token lives in the shared [`TokenStore`]
/// so the survey facade picks up a login without further wiring.
///
/// [`TokenStore`]: super::token::TokenStore
#[derive(Clone, Debug)]
pub struct AuthApi {
    api: ApiClient,
}

impl AuthApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.tokens().is_set()
    }

    pub async fn register(&self, data: &RegisterData) -> Result<RegisterReceipt, ApiError> {
        self.api.post_form("/auth/register", data).await
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthToken, ApiError> {
        let token: AuthToken = self.api.post_form("/auth/token", credentials).await?;
        self.api
            .tokens()
            .set(&token.access_token, &token.token_type)?;
        info!(username = %credentials.username, "signed in");
        Ok(token)
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        self.api.get_json("/auth/profile").await
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageReceipt, ApiError> {
        let form = PasswordChange {
            current_password,
            new_password,
        };
        self.api.post_form("/auth/change-password", &form).await
    }

    /// Returns the temporary password issued by the backend.
    pub async fn reset_password(&self, email: &str) -> Result<String, ApiError> {
        let form = PasswordReset {
            email: email.trim(),
        };
        let reply: TempPassword = self.api.post_form("/auth/reset-password", &form).await?;
        Ok(reply.temp_password)
    }

    pub async fn delete_account(&self) -> Result<(), ApiError> {
        self.api.delete("/auth/delete-account").await?;
        self.logout();
        Ok(())
    }

    /// Forgets the token locally; the backend keeps no session to end.
    pub fn logout(&self) {
        if let Err(e) = self.api.tokens().clear() {
            warn!("unable to remove cached token: {e}");
        }
    }
}
