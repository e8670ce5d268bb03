use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Who the server says we are. Issued wholesale on login/register, never
/// mutated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response from the auth endpoints: an opaque bearer token plus the identity
/// it proves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: Identity,
}

/// A company on the user's watchlist. `id` is server-assigned; the client
/// never invents one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedCompany {
    pub id: String,
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Candidate company returned by search. Ephemeral: replaced wholesale by
/// each new search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySearchResult {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
}

/// Request body for adding a company to the watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCompany {
    pub ticker: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

impl From<&CompanySearchResult> for NewCompany {
    fn from(candidate: &CompanySearchResult) -> Self {
        Self {
            ticker: candidate.ticker.clone(),
            name: candidate.name.clone(),
            industry: candidate.industry.clone(),
        }
    }
}

/// One daily digest. `content` is an opaque document assembled by the digest
/// job; the client only displays it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Digest {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_deserializes() {
        let json = r#"{
            "token": "eyJhbGciOi.abc.def",
            "user": {"id": "u-1", "email": "a@b.com", "name": null}
        }"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.token, "eyJhbGciOi.abc.def");
        assert_eq!(resp.user.email, "a@b.com");
        assert!(resp.user.name.is_none());
    }

    #[test]
    fn test_watched_company_deserializes_with_timestamp() {
        let json = r#"{
            "id": "c-42",
            "ticker": "AAPL",
            "name": "Apple Inc.",
            "industry": "Technology",
            "created_at": "2026-01-03T08:00:00Z"
        }"#;
        let company: WatchedCompany = serde_json::from_str(json).unwrap();
        assert_eq!(company.id, "c-42");
        assert_eq!(company.industry.as_deref(), Some("Technology"));
        assert!(company.created_at.is_some());
    }

    #[test]
    fn test_watched_company_tolerates_missing_optionals() {
        let json = r#"{"id": "c-1", "ticker": "TSLA", "name": "Tesla Inc."}"#;
        let company: WatchedCompany = serde_json::from_str(json).unwrap();
        assert!(company.industry.is_none());
        assert!(company.created_at.is_none());
    }

    #[test]
    fn test_new_company_omits_absent_industry() {
        let body = NewCompany {
            ticker: "TSLA".into(),
            name: "Tesla Inc.".into(),
            industry: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("industry"));
    }

    #[test]
    fn test_digest_with_null_content() {
        let json = r#"{
            "id": "d-1",
            "date": "2026-01-03",
            "content": null,
            "sent_at": null,
            "created_at": "2026-01-03T12:00:00Z"
        }"#;
        let digest: Digest = serde_json::from_str(json).unwrap();
        assert_eq!(digest.date.to_string(), "2026-01-03");
        assert!(digest.content.is_none());
    }
}
