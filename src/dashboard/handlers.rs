use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tracing::{error, instrument, warn};

use super::views::{self, Layout, NavItem, SettingsView};
use crate::{
    auth::{Identity, Session},
    provisioning::{provision_user, ProvisionError, ProvisionRequest},
    settings::{load_settings, save_settings, ProfileSettings, SettingsForm},
    state::AppState,
    users::UserRecord,
};

const BILLING_PENDING: &str =
    "Billing setup is pending. We'll finish it on your next visit.";

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/dashboard", get(dashboard_index))
        .route(
            "/dashboard/settings",
            get(settings_page).post(submit_settings),
        )
        .route("/dashboard/billing", get(billing_page))
}

/// Everything a dashboard page needs once the layout has run.
struct Entered {
    identity: Identity,
    record: UserRecord,
    banner: Option<&'static str>,
}

fn error_response(state: &AppState, session: &Session, status: StatusCode, msg: &str) -> Response {
    (
        status,
        Html(views::error_page(session, &state.config.auth_links, msg)),
    )
        .into_response()
}

/// Dashboard layout: require a session, then provision the user.
async fn enter_dashboard(state: &AppState, session: &Session) -> Result<Entered, Response> {
    let Some(identity) = session.user().cloned() else {
        return Err(Redirect::to("/").into_response());
    };

    let req = ProvisionRequest::from(&identity);
    match provision_user(state.users.as_ref(), state.billing.as_ref(), &req).await {
        Ok(p) => Ok(Entered {
            identity,
            record: p.record,
            banner: None,
        }),
        Err(ProvisionError::BillingLink { .. }) => {
            match state.users.find_by_id(&identity.id).await {
                Ok(Some(record)) => Ok(Entered {
                    identity,
                    record,
                    banner: Some(BILLING_PENDING),
                }),
                Ok(None) => Err(error_response(
                    state,
                    session,
                    StatusCode::BAD_GATEWAY,
                    "Unable to set up your account.",
                )),
                Err(e) => {
                    error!(error = %e, "reload after billing failure");
                    Err(error_response(
                        state,
                        session,
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Unable to load your account.",
                    ))
                }
            }
        }
        Err(e) => {
            error!(error = %e, "provisioning failed");
            let msg = match &e {
                ProvisionError::MissingIdentity => "User session is not available.",
                ProvisionError::MissingEmail => "Your account has no usable email address.",
                _ => "Unable to load your account.",
            };
            Err(error_response(state, session, e.status(), msg))
        }
    }
}

fn layout<'a>(
    state: &'a AppState,
    session: &'a Session,
    entered: &'a Entered,
    active: NavItem,
) -> Layout<'a> {
    Layout {
        session,
        links: &state.config.auth_links,
        theme: entered.record.color_scheme,
        active,
        banner: entered.banner,
    }
}

/// Serve from the page cache, or render and store. Pages carrying a banner
/// are never cached.
async fn cached_page<F>(state: &AppState, entered: &Entered, path: &str, render: F) -> Response
where
    F: FnOnce() -> String,
{
    let cacheable = entered.banner.is_none();
    if cacheable {
        if let Some(html) = state.pages.get(&entered.identity.id, path).await {
            return Html(html).into_response();
        }
    }
    let html = render();
    if cacheable {
        state
            .pages
            .put(&entered.identity.id, path, html.clone())
            .await;
    }
    Html(html).into_response()
}

#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> Html<String> {
    Html(views::home_page(&session, &state.config.auth_links))
}

#[instrument(skip(state, session))]
pub async fn dashboard_index(State(state): State<AppState>, session: Session) -> Response {
    let entered = match enter_dashboard(&state, &session).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    cached_page(&state, &entered, "/dashboard", || {
        views::dashboard_page(
            &layout(&state, &session, &entered, NavItem::Dashboard),
            "Dashboard",
            &views::dashboard_index(&entered.record),
        )
    })
    .await
}

#[instrument(skip(state, session))]
pub async fn billing_page(State(state): State<AppState>, session: Session) -> Response {
    let entered = match enter_dashboard(&state, &session).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };
    cached_page(&state, &entered, "/dashboard/billing", || {
        views::dashboard_page(
            &layout(&state, &session, &entered, NavItem::Billing),
            "Billing",
            &views::billing_content(&entered.record),
        )
    })
    .await
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsQuery {
    #[serde(default)]
    pub saved: Option<String>,
}

#[instrument(skip(state, session))]
pub async fn settings_page(
    State(state): State<AppState>,
    session: Session,
    Query(q): Query<SettingsQuery>,
) -> Response {
    let entered = match enter_dashboard(&state, &session).await {
        Ok(e) => e,
        Err(resp) => return resp,
    };

    let settings = match load_settings(state.users.as_ref(), &entered.identity.id).await {
        Ok(s) => s,
        Err(e) => {
            let page = views::dashboard_page(
                &layout(&state, &session, &entered, NavItem::Settings),
                "Settings",
                &format!(
                    r#"<p class="error" role="alert">Error: {}</p>"#,
                    views::escape(e.user_message())
                ),
            );
            return (e.status(), Html(page)).into_response();
        }
    };

    let render = || {
        views::dashboard_page(
            &layout(&state, &session, &entered, NavItem::Settings),
            "Settings",
            &views::settings_content(&SettingsView {
                settings: &settings,
                saved: q.saved.is_some(),
                error: None,
            }),
        )
    };
    if q.saved.is_some() {
        return Html(render()).into_response();
    }
    cached_page(&state, &entered, "/dashboard/settings", render).await
}

#[instrument(skip(state, session, form))]
pub async fn submit_settings(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SettingsForm>,
) -> Response {
    let Some(identity) = session.user() else {
        return Redirect::to("/").into_response();
    };

    let err = match save_settings(
        state.users.as_ref(),
        state.pages.as_ref(),
        &identity.id,
        form,
    )
    .await
    {
        Ok(_) => return Redirect::to("/dashboard/settings?saved=1").into_response(),
        Err(e) => e,
    };
    warn!(error = %err, "settings not saved");

    // Show the form again with what is actually stored.
    let record = match state.users.find_by_id(&identity.id).await {
        Ok(Some(r)) => r,
        _ => return error_response(&state, &session, err.status(), err.user_message()),
    };
    let entered = Entered {
        identity: identity.clone(),
        banner: None,
        record,
    };
    let settings = ProfileSettings::from(entered.record.clone());
    let page = views::dashboard_page(
        &layout(&state, &session, &entered, NavItem::Settings),
        "Settings",
        &views::settings_content(&SettingsView {
            settings: &settings,
            saved: false,
            error: Some(err.user_message()),
        }),
    );
    (err.status(), Html(page)).into_response()
}
