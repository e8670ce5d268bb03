use std::sync::Arc;

use stockdaily_api::{CompanySearchResult, NewCompany, WatchedCompany};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::{Error, Result};

/// Where the local mirror stands relative to the server.
///
/// Re-entrant: a refresh takes Loaded back through Loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    LoadFailed,
}

/// Local mirror of the server-held watchlist.
///
/// The mirror is replaced wholesale by `load` and patched incrementally by
/// successful `add`/`remove` calls. Order is server order followed by
/// locally appended entries. One logical owner mutates this; there is no
/// concurrent external mutation path.
pub struct Watchlist {
    api: Arc<dyn Backend>,
    state: LoadState,
    mirror: Vec<WatchedCompany>,
    last_error: Option<String>,
}

impl Watchlist {
    pub fn new(api: Arc<dyn Backend>) -> Self {
        Self {
            api,
            state: LoadState::Idle,
            mirror: Vec::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn companies(&self) -> &[WatchedCompany] {
        &self.mirror
    }

    /// Message from the most recent failed operation, for display next to it.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Client-side duplicate check. UX optimization only: the server remains
    /// the final arbiter of ticker uniqueness.
    pub fn is_watched(&self, ticker: &str) -> bool {
        self.mirror
            .iter()
            .any(|c| c.ticker.eq_ignore_ascii_case(ticker))
    }

    /// Fetch the full remote watchlist and replace the mirror.
    ///
    /// A failed refresh keeps the previous mirror: a list the user already
    /// saw must not vanish because one reload hit a bad gateway.
    pub async fn load(&mut self) -> Result<()> {
        self.state = LoadState::Loading;

        match self.api.watchlist().await {
            Ok(companies) => {
                debug!("watchlist loaded: {} companies", companies.len());
                self.mirror = companies;
                self.state = LoadState::Loaded;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("watchlist load failed: {}", err);
                self.state = LoadState::LoadFailed;
                self.last_error =
                    Some(err.user_message("Could not load your watchlist. Please try again."));
                Err(err.into())
            }
        }
    }

    /// Add a search candidate to the watchlist.
    ///
    /// Duplicates are rejected here without a round trip. On success the
    /// mirror is appended with the full company the server returned; the
    /// server-assigned id is the only id the client ever holds.
    pub async fn add(&mut self, candidate: &CompanySearchResult) -> Result<WatchedCompany> {
        if self.is_watched(&candidate.ticker) {
            return Err(Error::AlreadyWatched(candidate.ticker.clone()));
        }

        match self.api.add_company(&NewCompany::from(candidate)).await {
            Ok(company) => {
                debug!("added {} ({})", company.ticker, company.id);
                self.mirror.push(company.clone());
                self.last_error = None;
                Ok(company)
            }
            Err(err) => {
                warn!("add failed for {}: {}", candidate.ticker, err);
                self.last_error =
                    Some(err.user_message("Could not add the company. Please try again."));
                Err(err.into())
            }
        }
    }

    /// Drop a company from the watchlist.
    ///
    /// The mirror is filtered before the remote call; a remote failure is
    /// surfaced but not rolled back, so a failed remove leaves the item
    /// hidden until the next `load` reconciles with the server.
    pub async fn remove(&mut self, id: &str) -> Result<()> {
        self.mirror.retain(|c| c.id != id);

        match self.api.remove_company(id).await {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("remove failed for {}: {}", id, err);
                self.last_error =
                    Some(err.user_message("Could not remove the company. Please try again."));
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use stockdaily_api::ApiError;

    fn company(id: &str, ticker: &str, name: &str) -> WatchedCompany {
        WatchedCompany {
            id: id.into(),
            ticker: ticker.into(),
            name: name.into(),
            industry: None,
            created_at: None,
        }
    }

    fn candidate(ticker: &str, name: &str) -> CompanySearchResult {
        CompanySearchResult {
            ticker: ticker.into(),
            name: name.into(),
            industry: None,
        }
    }

    #[tokio::test]
    async fn test_load_replaces_mirror_wholesale() {
        let mut api = MockBackend::new();
        api.expect_watchlist()
            .returning(|| Ok(vec![company("1", "AAPL", "Apple Inc.")]));

        let mut watchlist = Watchlist::new(Arc::new(api));
        assert_eq!(watchlist.state(), LoadState::Idle);

        watchlist.load().await.unwrap();
        assert_eq!(watchlist.state(), LoadState::Loaded);
        assert_eq!(watchlist.companies().len(), 1);
        assert!(watchlist.is_watched("AAPL"));
    }

    #[tokio::test]
    async fn test_failed_refresh_preserves_previous_mirror() {
        let mut api = MockBackend::new();
        let mut calls = 0;
        api.expect_watchlist().returning_st(move || {
            calls += 1;
            if calls == 1 {
                Ok(vec![company("1", "AAPL", "Apple Inc.")])
            } else {
                Err(ApiError::RequestFailed {
                    status: 502,
                    body: String::new(),
                })
            }
        });

        let mut watchlist = Watchlist::new(Arc::new(api));
        watchlist.load().await.unwrap();

        let result = watchlist.load().await;
        assert!(result.is_err());
        assert_eq!(watchlist.state(), LoadState::LoadFailed);
        // Previous mirror survives the failed refresh
        assert_eq!(watchlist.companies().len(), 1);
        assert_eq!(
            watchlist.last_error(),
            Some("Could not load your watchlist. Please try again.")
        );
    }

    #[tokio::test]
    async fn test_load_auth_failure_asks_for_login() {
        let mut api = MockBackend::new();
        api.expect_watchlist()
            .returning(|| Err(ApiError::AuthenticationFailed));

        let mut watchlist = Watchlist::new(Arc::new(api));
        let result = watchlist.load().await;

        assert!(result.is_err());
        assert_eq!(watchlist.last_error(), Some("Please log in."));
    }

    #[tokio::test]
    async fn test_add_appends_server_assigned_company() {
        let mut api = MockBackend::new();
        api.expect_watchlist()
            .returning(|| Ok(vec![company("1", "AAPL", "Apple Inc.")]));
        api.expect_add_company().returning(|c| {
            assert_eq!(c.ticker, "TSLA");
            Ok(company("2", "TSLA", "Tesla Inc."))
        });

        let mut watchlist = Watchlist::new(Arc::new(api));
        watchlist.load().await.unwrap();

        let added = watchlist.add(&candidate("TSLA", "Tesla Inc.")).await.unwrap();
        assert_eq!(added.id, "2");
        assert_eq!(watchlist.companies().len(), 2);
        assert_eq!(watchlist.companies()[1].id, "2");
    }

    #[tokio::test]
    async fn test_duplicate_add_rejected_without_network() {
        // No expect_add_company: any backend call would panic the mock
        let mut api = MockBackend::new();
        api.expect_watchlist()
            .returning(|| Ok(vec![company("1", "AAPL", "Apple Inc.")]));

        let mut watchlist = Watchlist::new(Arc::new(api));
        watchlist.load().await.unwrap();

        let result = watchlist.add(&candidate("aapl", "Apple Inc.")).await;
        assert!(matches!(result, Err(Error::AlreadyWatched(_))));
        assert_eq!(watchlist.companies().len(), 1);
    }

    #[tokio::test]
    async fn test_server_duplicate_rejection_is_an_ordinary_error() {
        // Two concurrent adds can both pass the client check; the second
        // one's server rejection surfaces verbatim and nothing crashes.
        let mut api = MockBackend::new();
        api.expect_add_company()
            .returning(|_| Err(ApiError::Validation("您已关注该公司".into())));

        let mut watchlist = Watchlist::new(Arc::new(api));
        let result = watchlist.add(&candidate("TSLA", "Tesla Inc.")).await;

        assert!(result.is_err());
        assert!(watchlist.companies().is_empty());
        assert_eq!(watchlist.last_error(), Some("您已关注该公司"));
    }

    #[tokio::test]
    async fn test_remove_filters_mirror_before_remote_confirmation() {
        let mut api = MockBackend::new();
        api.expect_watchlist().returning(|| {
            Ok(vec![
                company("1", "AAPL", "Apple Inc."),
                company("2", "TSLA", "Tesla Inc."),
            ])
        });
        api.expect_remove_company().returning(|_| {
            Err(ApiError::RequestFailed {
                status: 503,
                body: String::new(),
            })
        });

        let mut watchlist = Watchlist::new(Arc::new(api));
        watchlist.load().await.unwrap();

        let result = watchlist.remove("1").await;
        assert!(result.is_err());
        // Removed locally even though the remote call failed; next load reconciles
        assert_eq!(watchlist.companies().len(), 1);
        assert_eq!(watchlist.companies()[0].id, "2");
        assert!(watchlist.last_error().is_some());
    }

    #[tokio::test]
    async fn test_remove_success_clears_exactly_the_matching_entry() {
        let mut api = MockBackend::new();
        api.expect_watchlist().returning(|| {
            Ok(vec![
                company("1", "AAPL", "Apple Inc."),
                company("2", "TSLA", "Tesla Inc."),
            ])
        });
        api.expect_remove_company().returning(|_| Ok(()));

        let mut watchlist = Watchlist::new(Arc::new(api));
        watchlist.load().await.unwrap();

        watchlist.remove("2").await.unwrap();
        assert_eq!(watchlist.companies().len(), 1);
        assert_eq!(watchlist.companies()[0].ticker, "AAPL");
    }
}
