use axum::{
    extract::{FromRef, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, instrument};

use crate::{
    auth::{Session, SessionKeys, SessionUser},
    error::AppError,
    state::AppState,
    users::UserRecord,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/api/auth/logout", get(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/api/me", get(get_me))
}

/// Drop the session cookie and go home.
#[instrument(skip(state, session, jar))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let keys = SessionKeys::from_ref(&state);
    if let Some(user) = session.user() {
        info!(user_id = %user.id, "user logged out");
    }
    let mut cookie = Cookie::build((keys.cookie_name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    (jar.add(cookie), Redirect::to("/"))
}

#[instrument(skip(state, identity))]
pub async fn get_me(
    State(state): State<AppState>,
    SessionUser(identity): SessionUser,
) -> Result<Json<UserRecord>, AppError> {
    let user = state
        .users
        .find_by_id(&identity.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn user_record_serialization_uses_theme_tags() {
        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: "u1".into(),
            email: "test@example.com".into(),
            name: "Jane Doe".into(),
            color_scheme: Some(crate::users::ColorScheme::Green),
            billing_customer_id: Some("cus_1".into()),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["email"], "test@example.com");
        assert_eq!(json["color_scheme"], "theme-green");
        assert_eq!(json["billing_customer_id"], "cus_1");
        assert!(json["created_at"].is_string());
    }
}
