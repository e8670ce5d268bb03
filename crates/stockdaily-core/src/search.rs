use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use stockdaily_api::CompanySearchResult;
use tracing::debug;

use crate::backend::Backend;
use crate::Result;

/// Remote company lookup with a last-request-wins display contract.
///
/// Overlapping searches are allowed. Each request carries a sequence tag;
/// a response is applied only if its tag is newer than the newest response
/// applied so far, so a slow "Apple" response can never clobber the "Tesla"
/// results the user asked for afterwards.
pub struct CompanySearch {
    api: Arc<dyn Backend>,
    query: String,
    results: Vec<CompanySearchResult>,
    next_seq: u64,
    applied_seq: u64,
    pending: Arc<AtomicU32>,
    last_error: Option<String>,
}

/// An issued search, tagged with its submission order.
///
/// Counts as in flight until its response is produced or the request is
/// dropped unexecuted, so `is_searching` cannot get stuck.
pub struct SearchRequest {
    api: Arc<dyn Backend>,
    seq: u64,
    query: String,
    pending: Arc<AtomicU32>,
}

impl Drop for SearchRequest {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The outcome of a search request, ready to be applied (or discarded as
/// stale).
pub struct SearchResponse {
    seq: u64,
    outcome: stockdaily_api::Result<Vec<CompanySearchResult>>,
}

impl CompanySearch {
    pub fn new(api: Arc<dyn Backend>) -> Self {
        Self {
            api,
            query: String::new(),
            results: Vec::new(),
            next_seq: 0,
            applied_seq: 0,
            pending: Arc::new(AtomicU32::new(0)),
            last_error: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[CompanySearchResult] {
        &self.results
    }

    pub fn is_searching(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Issue a tagged request. Blank queries are a no-op.
    pub fn begin(&mut self, query: &str) -> Option<SearchRequest> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }

        self.next_seq += 1;
        self.pending.fetch_add(1, Ordering::SeqCst);
        // The stored query mirrors what the server will actually see
        self.query = trimmed.to_string();

        Some(SearchRequest {
            api: self.api.clone(),
            seq: self.next_seq,
            query: trimmed.to_string(),
            pending: self.pending.clone(),
        })
    }

    /// Apply a completed request. Stale responses (older than the newest
    /// applied one) are discarded; a failure surfaces a generic message and
    /// never clears results the user is already looking at.
    pub fn apply(&mut self, response: SearchResponse) {
        if response.seq <= self.applied_seq {
            debug!("discarding stale search response (seq {})", response.seq);
            return;
        }
        self.applied_seq = response.seq;

        match response.outcome {
            Ok(results) => {
                self.results = results;
                self.last_error = None;
            }
            Err(err) => {
                debug!("search failed: {}", err);
                self.last_error = Some("Search failed. Please try again.".to_string());
            }
        }
    }

    /// Convenience for the common non-overlapping case.
    pub async fn search(&mut self, query: &str) -> Result<()> {
        let Some(request) = self.begin(query) else {
            return Ok(());
        };
        let response = request.execute().await;
        self.apply(response);
        Ok(())
    }

    /// Reset results and query text, e.g. after a successful add.
    pub fn clear(&mut self) {
        self.query.clear();
        self.results.clear();
        self.last_error = None;
    }
}

impl SearchRequest {
    pub async fn execute(self) -> SearchResponse {
        let outcome = self.api.search_companies(&self.query).await;
        SearchResponse {
            seq: self.seq,
            outcome,
        }
    }
}
