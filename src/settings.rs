use axum::http::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    cache::{PageCache, Scope},
    users::{ColorScheme, ProfileUpdate, UnknownColorScheme, UserRecord, UserStore},
};

/// Fields shown on the settings page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSettings {
    pub name: String,
    pub email: String,
    pub color_scheme: Option<ColorScheme>,
}

impl From<UserRecord> for ProfileSettings {
    fn from(r: UserRecord) -> Self {
        Self {
            name: r.name,
            email: r.email,
            color_scheme: r.color_scheme,
        }
    }
}

/// Raw settings form. `email` is displayed read-only and never accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("no user record for this account")]
    NotFound,
    #[error("invalid color scheme")]
    InvalidColorScheme(#[from] UnknownColorScheme),
    #[error("loading settings failed: {0:#}")]
    Load(#[source] anyhow::Error),
    #[error("saving settings failed: {0:#}")]
    Save(#[source] anyhow::Error),
}

impl SettingsError {
    pub fn status(&self) -> StatusCode {
        match self {
            SettingsError::NotFound => StatusCode::NOT_FOUND,
            SettingsError::InvalidColorScheme(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SettingsError::Load(_) | SettingsError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show on the page.
    pub fn user_message(&self) -> &'static str {
        match self {
            SettingsError::NotFound => "We couldn't find your profile.",
            SettingsError::InvalidColorScheme(_) => "Please pick one of the listed colors.",
            SettingsError::Load(_) => "Unable to load your settings.",
            SettingsError::Save(_) => "Unable to save your settings. Please try again.",
        }
    }
}

impl SettingsForm {
    /// Validate into a store update. Blank fields leave columns unchanged.
    pub fn into_update(self) -> Result<ProfileUpdate, SettingsError> {
        let color_scheme = match self.color.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(tag) => Some(tag.parse::<ColorScheme>()?),
        };
        Ok(ProfileUpdate {
            name: self.name,
            color_scheme,
        })
    }
}

#[instrument(skip(store))]
pub async fn load_settings(
    store: &dyn UserStore,
    user_id: &str,
) -> Result<ProfileSettings, SettingsError> {
    match store.find_by_id(user_id).await {
        Ok(Some(r)) => Ok(r.into()),
        Ok(None) => {
            warn!("no user record");
            Err(SettingsError::NotFound)
        }
        Err(e) => {
            error!(error = %e, "loading settings failed");
            Err(SettingsError::Load(e))
        }
    }
}

#[instrument(skip(store, cache, form))]
pub async fn save_settings(
    store: &dyn UserStore,
    cache: &PageCache,
    user_id: &str,
    form: SettingsForm,
) -> Result<ProfileSettings, SettingsError> {
    let update = form.into_update().map_err(|e| {
        warn!(error = %e, "settings rejected");
        e
    })?;
    if update.is_empty() {
        debug!("nothing to save");
        return load_settings(store, user_id).await;
    }

    let record = match store.update_profile(user_id, update).await {
        Ok(Some(r)) => r,
        Ok(None) => return Err(SettingsError::NotFound),
        Err(e) => {
            error!(error = %e, "updating settings failed");
            return Err(SettingsError::Save(e));
        }
    };

    cache.revalidate("/", Scope::Layout).await;
    info!(color_scheme = ?record.color_scheme, "settings saved");
    Ok(record.into())
}
