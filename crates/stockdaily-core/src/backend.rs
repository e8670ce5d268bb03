use async_trait::async_trait;
use stockdaily_api::{
    ApiClient, AuthResponse, CompanySearchResult, Digest, NewCompany, Result as ApiResult,
    WatchedCompany,
};

/// The backend surface the client logic depends on.
///
/// `ApiClient` is the real implementation; the trait exists so the session,
/// watchlist and search logic can be exercised against a mock without a
/// network in sight.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse>;
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> ApiResult<AuthResponse>;
    async fn watchlist(&self) -> ApiResult<Vec<WatchedCompany>>;
    async fn add_company(&self, company: &NewCompany) -> ApiResult<WatchedCompany>;
    async fn remove_company(&self, id: &str) -> ApiResult<()>;
    async fn search_companies(&self, query: &str) -> ApiResult<Vec<CompanySearchResult>>;
    async fn today_digest(&self) -> ApiResult<Digest>;
    async fn digest_history(&self, limit: u32) -> ApiResult<Vec<Digest>>;
    async fn generate_digest(&self, send_email: bool) -> ApiResult<Digest>;
}

#[async_trait]
impl Backend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        ApiClient::login(self, email, password).await
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> ApiResult<AuthResponse> {
        ApiClient::register(self, email, password, name.as_deref()).await
    }

    async fn watchlist(&self) -> ApiResult<Vec<WatchedCompany>> {
        ApiClient::watchlist(self).await
    }

    async fn add_company(&self, company: &NewCompany) -> ApiResult<WatchedCompany> {
        ApiClient::add_company(self, company).await
    }

    async fn remove_company(&self, id: &str) -> ApiResult<()> {
        ApiClient::remove_company(self, id).await
    }

    async fn search_companies(&self, query: &str) -> ApiResult<Vec<CompanySearchResult>> {
        ApiClient::search_companies(self, query).await
    }

    async fn today_digest(&self) -> ApiResult<Digest> {
        ApiClient::today_digest(self).await
    }

    async fn digest_history(&self, limit: u32) -> ApiResult<Vec<Digest>> {
        ApiClient::digest_history(self, limit).await
    }

    async fn generate_digest(&self, send_email: bool) -> ApiResult<Digest> {
        ApiClient::generate_digest(self, send_email).await
    }
}
