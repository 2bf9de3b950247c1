use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;

use super::config::ClientConfig;
use super::token::TokenStore;

const CLIENT_AGENT: &str = concat!("survey-client/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP plumbing: base URL, bearer token, status classification.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(USER_AGENT, CLIENT_AGENT)
            .header(ACCEPT, "application/json");
        if let Some(token) = self.tokens.get() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        request
    }

    /// Sends the request and turns any non-2xx status into an [`ApiError`].
    /// A 401 drops the cached token so the next screen asks for a login.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request_id = Uuid::new_v4();
        let built = request.build()?;
        let method = built.method().clone();
        let path = built.url().path().to_string();
        debug!(%request_id, %method, %path, "sending request");

        let response = self.http.execute(built).await.map_err(|e| {
            warn!(%request_id, %method, %path, "request failed: {e}");
            ApiError::Network(e.to_string())
        })?;
        let status = response.status();
        debug!(%request_id, status = status.as_u16(), "response received");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), &body);
        if err.is_auth() {
            warn!(%request_id, %path, "unauthorized; clearing cached token");
            if let Err(e) = self.tokens.clear() {
                warn!("unable to remove cached token: {e}");
            }
        }
        Err(err)
    }

    pub(crate) async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.json(self.request(Method::GET, path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(self.request(Method::POST, path).json(body)).await
    }

    pub async fn post_form<B, T>(&self, path: &str, form: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.json(self.request(Method::POST, path).form(form)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: Option<&str>) -> ApiClient {
        let tokens = TokenStore::in_memory();
        if let Some(t) = token {
            tokens.set(t, "bearer").expect("set");
        }
        let mut config = ClientConfig::default_for(std::path::Path::new("/tmp"));
        config.api_url = "http://api.test/".to_string();
        ApiClient::new(&config, tokens).expect("client")
    }

    #[test]
    fn joins_paths_without_double_slashes() {
        let api = client(None);
        assert_eq!(api.url("/surveys/list"), "http://api.test/surveys/list");
        assert_eq!(api.url("auth/profile"), "http://api.test/auth/profile");
    }

    #[test]
    fn attaches_bearer_only_when_token_held() {
        let anonymous = client(None).request(Method::GET, "/surveys/1").build().expect("build");
        assert!(anonymous.headers().get(AUTHORIZATION).is_none());

        let signed_in = client(Some("tok")).request(Method::GET, "/surveys/1").build().expect("build");
        assert_eq!(
            signed_in.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer tok")
        );
    }
}
