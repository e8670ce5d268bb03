// Client-side state and synchronization logic lives here - the brain of the operation
pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod gate;
pub mod search;
pub mod session;
pub mod watchlist;

pub use app::StockDaily;
pub use backend::Backend;
pub use config::Config;
pub use error::Error;
pub use gate::Route;
pub use search::CompanySearch;
pub use session::{Session, SessionStore};
pub use watchlist::{LoadState, Watchlist};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
