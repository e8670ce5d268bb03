// HTTP transport and wire types for the StockDaily backend
pub mod client;
pub mod error;
pub mod models;
pub mod retry;

// Re-export common types
pub use client::{ApiClient, CredentialSource};
pub use error::ApiError;
pub use models::{
    AuthResponse, CompanySearchResult, Digest, Identity, NewCompany, WatchedCompany,
};
pub use retry::RetryConfig;

/// Result type alias because typing Result<T, ApiError> everywhere is tedious
pub type Result<T> = std::result::Result<T, ApiError>;
