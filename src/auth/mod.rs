use crate::state::AppState;
use axum::Router;

mod claims;
pub mod extractors;
pub mod handlers;
pub mod session;

pub use claims::{Identity, SessionClaims};
pub use extractors::{Session, SessionUser};
pub use session::SessionKeys;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
