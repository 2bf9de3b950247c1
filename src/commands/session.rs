use tracing::{info, warn};

use crate::client::types::{LoginCredentials, User};
use crate::error::ApiError;
use crate::state::{AppState, SurveyListState};

/// Logs in, then loads the profile. A failed profile fetch leaves the
/// session signed out even though the token was issued.
pub async fn sign_in(state: &mut AppState, credentials: &LoginCredentials) -> Result<User, ApiError> {
    state.auth.login(credentials).await?;
    match state.auth.profile().await {
        Ok(user) => {
            state.session.signed_in(user.clone());
            Ok(user)
        }
        Err(e) => {
            warn!("profile fetch after login failed: {e}");
            state.auth.logout();
            state.session.signed_out();
            Err(e)
        }
    }
}

/// Picks up a token saved by an earlier run. Returns `Ok(None)` when there
/// is no token or it has expired.
pub async fn restore_session(state: &mut AppState) -> Result<Option<User>, ApiError> {
    if !state.auth.is_authenticated() {
        state.session.signed_out();
        return Ok(None);
    }
    match state.auth.profile().await {
        Ok(user) => {
            info!(username = %user.username, "session restored");
            state.session.signed_in(user.clone());
            Ok(Some(user))
        }
        Err(ApiError::Auth) => {
            state.session.signed_out();
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn sign_out(state: &mut AppState) {
    state.auth.logout();
    state.session.signed_out();
    state.list.detach();
    state.list = SurveyListState::new();
}

pub async fn delete_account(state: &mut AppState) -> Result<(), ApiError> {
    state.auth.delete_account().await?;
    sign_out(state);
    Ok(())
}
