use thiserror::Error;

/// All the ways things can go wrong in the StockDaily client
///
/// We use thiserror here because it generates the boilerplate for us.
/// Life's too short to manually implement Display and Error traits.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] stockdaily_api::ApiError),

    #[error("{0} is already on your watchlist")]
    AlreadyWatched(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
