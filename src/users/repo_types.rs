use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Theme tag a user can pick on the settings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorScheme {
    #[serde(rename = "theme-green")]
    Green,
    #[serde(rename = "theme-blue")]
    Blue,
    #[serde(rename = "theme-violet")]
    Violet,
    #[serde(rename = "theme-yellow")]
    Yellow,
    #[default]
    #[serde(rename = "theme-orange")]
    Orange,
    #[serde(rename = "theme-red")]
    Red,
    #[serde(rename = "theme-rose")]
    Rose,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 7] = [
        ColorScheme::Green,
        ColorScheme::Blue,
        ColorScheme::Violet,
        ColorScheme::Yellow,
        ColorScheme::Orange,
        ColorScheme::Red,
        ColorScheme::Rose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorScheme::Green => "theme-green",
            ColorScheme::Blue => "theme-blue",
            ColorScheme::Violet => "theme-violet",
            ColorScheme::Yellow => "theme-yellow",
            ColorScheme::Orange => "theme-orange",
            ColorScheme::Red => "theme-red",
            ColorScheme::Rose => "theme-rose",
        }
    }

    /// Human label shown in the settings select.
    pub fn label(self) -> &'static str {
        match self {
            ColorScheme::Green => "Green",
            ColorScheme::Blue => "Blue",
            ColorScheme::Violet => "Violet",
            ColorScheme::Yellow => "Yellow",
            ColorScheme::Orange => "Orange",
            ColorScheme::Red => "Red",
            ColorScheme::Rose => "Rose",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color scheme: {0:?}")]
pub struct UnknownColorScheme(pub String);

impl FromStr for ColorScheme {
    type Err = UnknownColorScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColorScheme::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownColorScheme(s.to_string()))
    }
}

/// Raw `users` row as stored in Postgres.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub color_scheme: Option<String>,
    pub billing_customer_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// User record keyed by the identity provider's subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub color_scheme: Option<ColorScheme>,
    pub billing_customer_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(r: UserRow) -> Self {
        let color_scheme = match r.color_scheme.as_deref() {
            None | Some("") => None,
            Some(raw) => match raw.parse() {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(user_id = %r.id, error = %e, "ignoring stored color scheme");
                    None
                }
            },
        };
        Self {
            id: r.id,
            email: r.email,
            name: r.name,
            color_scheme,
            billing_customer_id: r.billing_customer_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Fields written when a user record is first created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Partial update from the settings form. `None` leaves the column alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub color_scheme: Option<ColorScheme>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color_scheme.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_scheme_parses_every_palette_tag() {
        for c in ColorScheme::ALL {
            assert_eq!(c.as_str().parse::<ColorScheme>(), Ok(c));
        }
    }

    #[test]
    fn color_scheme_rejects_unknown_tags() {
        let err = "theme-purple".parse::<ColorScheme>().unwrap_err();
        assert_eq!(err, UnknownColorScheme("theme-purple".into()));
        assert!("Theme-Red".parse::<ColorScheme>().is_err());
        assert!("".parse::<ColorScheme>().is_err());
    }

    #[test]
    fn color_scheme_serializes_as_tag() {
        let json = serde_json::to_string(&ColorScheme::Rose).unwrap();
        assert_eq!(json, "\"theme-rose\"");
    }

    #[test]
    fn row_with_garbage_color_maps_to_none() {
        let now = OffsetDateTime::now_utc();
        let row = UserRow {
            id: "u1".into(),
            email: "a@x.com".into(),
            name: "Jane".into(),
            color_scheme: Some("neon".into()),
            billing_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        let rec = UserRecord::from(row);
        assert_eq!(rec.color_scheme, None);
    }
}
