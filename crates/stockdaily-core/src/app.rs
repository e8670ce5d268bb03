use std::sync::Arc;
use std::time::Duration;

use stockdaily_api::{
    ApiClient, CompanySearchResult, Digest, Identity, WatchedCompany,
};
use tracing::info;

use crate::backend::Backend;
use crate::config::Config;
use crate::gate;
use crate::search::CompanySearch;
use crate::session::SessionStore;
use crate::watchlist::Watchlist;
use crate::{Result, Route};

/// The whole client, wired together.
///
/// Owns the session store, one watchlist synchronizer and one company
/// search, all sharing the same backend transport. This is the single UI
/// surface the concurrency model assumes; cross-component side effects
/// (a successful add clears the search box) live here.
pub struct StockDaily {
    session: Arc<SessionStore>,
    api: Arc<dyn Backend>,
    pub watchlist: Watchlist,
    pub search: CompanySearch,
}

impl StockDaily {
    /// Build from config: real transport, session persisted under the
    /// platform data dir, durable session restored if one exists.
    pub fn new(config: &Config) -> Result<Self> {
        let session = Arc::new(SessionStore::open(SessionStore::default_path()?));
        session.restore()?;

        let api = Arc::new(ApiClient::with_timeout(
            config.api.base_url.clone(),
            session.clone(),
            Duration::from_secs(config.http.timeout_secs),
        ));

        Ok(Self::with_parts(session, api))
    }

    /// Assemble from explicit parts. Used by tests to swap in a mock backend.
    pub fn with_parts(session: Arc<SessionStore>, api: Arc<dyn Backend>) -> Self {
        let watchlist = Watchlist::new(api.clone());
        let search = CompanySearch::new(api.clone());
        Self {
            session,
            api,
            watchlist,
            search,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Gate decision for the current render. Never cached.
    pub fn route(&self) -> Route {
        gate::route_for(&self.session)
    }

    // ---- auth ----

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let identity = self.session.login(self.api.as_ref(), email, password).await?;
        info!("logged in as {}", identity.email);
        Ok(identity)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<Identity> {
        let identity = self
            .session
            .register(self.api.as_ref(), email, password, name)
            .await?;
        info!("registered as {}", identity.email);
        Ok(identity)
    }

    pub fn logout(&self) {
        self.session.logout();
    }

    pub fn whoami(&self) -> Option<Identity> {
        self.session.identity()
    }

    // ---- watchlist ----

    pub async fn load_watchlist(&mut self) -> Result<()> {
        gate::require_login(&self.session)?;
        self.watchlist.load().await
    }

    /// Add a search candidate and, on success, reset the search state so the
    /// next render shows an empty search box over the grown watchlist.
    pub async fn add_from_search(
        &mut self,
        candidate: &CompanySearchResult,
    ) -> Result<WatchedCompany> {
        gate::require_login(&self.session)?;
        let added = self.watchlist.add(candidate).await?;
        self.search.clear();
        Ok(added)
    }

    pub async fn remove_company(&mut self, id: &str) -> Result<()> {
        gate::require_login(&self.session)?;
        self.watchlist.remove(id).await
    }

    // ---- search ----

    pub async fn search_companies(&mut self, query: &str) -> Result<()> {
        gate::require_login(&self.session)?;
        self.search.search(query).await
    }

    // ---- digests ----

    pub async fn today_digest(&self) -> Result<Digest> {
        gate::require_login(&self.session)?;
        Ok(self.api.today_digest().await?)
    }

    pub async fn digest_history(&self, limit: u32) -> Result<Vec<Digest>> {
        gate::require_login(&self.session)?;
        Ok(self.api.digest_history(limit).await?)
    }

    pub async fn generate_digest(&self, send_email: bool) -> Result<Digest> {
        gate::require_login(&self.session)?;
        Ok(self.api.generate_digest(send_email).await?)
    }
}
