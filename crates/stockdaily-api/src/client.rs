use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::models::{AuthResponse, CompanySearchResult, Digest, NewCompany, WatchedCompany};
use crate::retry::{with_retry, RetryConfig};
use crate::{ApiError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the transport gets the current bearer credential, and who it tells
/// when the backend declares that credential dead.
///
/// This is the single seam between the transport and the session store: call
/// sites never look at 401s themselves. The session store implements this
/// trait; `invalidate` must be idempotent.
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> Option<String>;
    fn invalidate(&self);
}

/// HTTP client for the StockDaily backend.
///
/// One shared `reqwest::Client`; every protected request carries the bearer
/// token obtained from the credential source at send time. Idempotent reads
/// go through the retry helper; writes and auth calls are single-shot.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
    retry_config: RetryConfig,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self::with_timeout(
            base_url,
            credentials,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("stockdaily/0.1.0"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    // ---- auth endpoints (no bearer attached) ----

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let url = format!("{}/api/auth/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::classify_unauthenticated(status, &body));
        }

        Ok(response.json().await?)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthResponse> {
        let url = format!("{}/api/auth/register", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::classify_unauthenticated(status, &body));
        }

        Ok(response.json().await?)
    }

    // ---- watchlist ----

    pub async fn watchlist(&self) -> Result<Vec<WatchedCompany>> {
        with_retry(&self.retry_config, || async {
            self.get_json("/api/user/companies", &[]).await
        })
        .await
    }

    pub async fn add_company(&self, company: &NewCompany) -> Result<WatchedCompany> {
        let url = format!("{}/api/user/companies", self.base_url);
        debug!("adding {} to watchlist", company.ticker);
        let response = self.authed(self.http.post(&url).json(company)).send().await?;
        self.handle(response).await
    }

    pub async fn remove_company(&self, id: &str) -> Result<()> {
        let url = format!(
            "{}/api/user/companies/{}",
            self.base_url,
            urlencoding::encode(id)
        );
        debug!("removing watchlist entry {}", id);
        let response = self.authed(self.http.delete(&url)).send().await?;

        if !response.status().is_success() {
            return Err(self.fail(response).await);
        }
        // Response body is a throwaway confirmation message
        Ok(())
    }

    // ---- search ----

    pub async fn search_companies(&self, query: &str) -> Result<Vec<CompanySearchResult>> {
        with_retry(&self.retry_config, || async {
            self.get_json("/api/companies/search", &[("q", query.to_string())])
                .await
        })
        .await
    }

    // ---- digests ----

    pub async fn today_digest(&self) -> Result<Digest> {
        with_retry(&self.retry_config, || async {
            self.get_json("/api/digests/today", &[]).await
        })
        .await
    }

    pub async fn digest_history(&self, limit: u32) -> Result<Vec<Digest>> {
        with_retry(&self.retry_config, || async {
            self.get_json("/api/digests", &[("limit", limit.to_string())])
                .await
        })
        .await
    }

    pub async fn generate_digest(&self, send_email: bool) -> Result<Digest> {
        let url = format!("{}/api/digests/generate", self.base_url);
        let response = self
            .authed(self.http.post(&url).json(&json!({ "send_email": send_email })))
            .send()
            .await?;
        self.handle(response).await
    }

    // ---- plumbing ----

    /// Attach the current bearer credential, if any.
    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.credential() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.authed(request).send().await?;
        self.handle(response).await
    }

    async fn handle<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.fail(response).await)
        }
    }

    async fn fail(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        self.classify_protected(status, &body)
    }

    /// Classify a failed protected response and, on an authentication
    /// failure, notify the credential source. One notification per failing
    /// response; the source's clear is idempotent.
    fn classify_protected(&self, status: reqwest::StatusCode, body: &str) -> ApiError {
        let err = ApiError::classify(status, body);
        if err.is_auth_failure() {
            warn!("backend rejected credential, invalidating session");
            self.credentials.invalidate();
        }
        err
    }
}
