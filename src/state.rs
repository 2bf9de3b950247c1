use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::client::auth::AuthApi;
use crate::client::config::ClientConfig;
use crate::client::http::ApiClient;
use crate::client::surveys::SurveyRepository;
use crate::client::token::TokenStore;
use crate::client::types::User;
use crate::error::ApiError;
use crate::survey::types::{Survey, SurveyId};

/// Hands out tickets for in-flight requests. Starting a newer request or
/// tearing the view down invalidates every older ticket.
#[derive(Clone, Debug, Default)]
pub struct LivenessGuard {
    generation: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
}

impl LivenessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket { generation }
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Cached dashboard list. Only list/create/delete touch it.
#[derive(Debug, Default)]
pub struct SurveyListState {
    surveys: Vec<Survey>,
    loading: bool,
    error: Option<String>,
    guard: LivenessGuard,
}

impl SurveyListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surveys(&self) -> &[Survey] {
        &self.surveys
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Handle on the list's liveness counter. It can be moved into a task
    /// that awaits the fetch without borrowing the list.
    pub fn guard(&self) -> LivenessGuard {
        self.guard.clone()
    }

    pub fn begin_load(&mut self) -> RequestTicket {
        self.loading = true;
        self.error = None;
        self.guard.begin()
    }

    /// Applies a finished list fetch. Returns false when the ticket went
    /// stale in the meantime and the result was dropped.
    pub fn finish_load(&mut self, ticket: RequestTicket, result: Result<Vec<Survey>, ApiError>) -> bool {
        if !self.guard.is_current(ticket) {
            debug!("discarding stale survey list result");
            return false;
        }
        self.loading = false;
        match result {
            Ok(surveys) => {
                self.surveys = surveys;
                self.error = None;
            }
            Err(e) => self.error = Some(e.user_message()),
        }
        true
    }

    pub fn apply_created(&mut self, survey: Survey) {
        self.surveys.retain(|s| s.id != survey.id);
        self.surveys.push(survey);
    }

    pub fn apply_deleted(&mut self, survey_id: SurveyId) {
        self.surveys.retain(|s| s.id != survey_id);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Drops any pending load, e.g. when the dashboard is closed.
    pub fn detach(&mut self) {
        self.guard.invalidate();
        self.loading = false;
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub authenticated: bool,
}

impl SessionState {
    pub fn signed_in(&mut self, user: User) {
        self.user = Some(user);
        self.authenticated = true;
    }

    pub fn signed_out(&mut self) {
        self.user = None;
        self.authenticated = false;
    }
}

/// Everything a screen needs, built once and passed in explicitly.
#[derive(Debug)]
pub struct AppState {
    pub surveys: SurveyRepository,
    pub auth: AuthApi,
    pub list: SurveyListState,
    pub session: SessionState,
}

impl AppState {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let api = ApiClient::new(config, tokens)?;
        let session = SessionState {
            user: None,
            authenticated: api.tokens().is_set(),
        };
        Ok(Self {
            surveys: SurveyRepository::new(api.clone()),
            auth: AuthApi::new(api),
            list: SurveyListState::new(),
            session,
        })
    }
}
