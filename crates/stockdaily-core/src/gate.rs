use crate::session::SessionStore;
use crate::{Error, Result};

/// Where a protected surface should send the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Login,
}

/// Decide the route from the store's state right now.
///
/// Deliberately not cached anywhere: logout or a transport-forced clear can
/// happen between two evaluations, so callers must ask again on every render.
pub fn route_for(session: &SessionStore) -> Route {
    if session.is_authenticated() {
        Route::Dashboard
    } else {
        Route::Login
    }
}

/// Guard for protected operations.
pub fn require_login(session: &SessionStore) -> Result<()> {
    match route_for(session) {
        Route::Dashboard => Ok(()),
        Route::Login => Err(Error::NotLoggedIn),
    }
}
