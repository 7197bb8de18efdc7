use serde::{Deserialize, Serialize};

/// Signed session payload issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // identity subject, doubles as the user record id
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Identity attributes of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl From<SessionClaims> for Identity {
    fn from(c: SessionClaims) -> Self {
        Self {
            id: c.sub,
            email: c.email,
            given_name: c.given_name,
            family_name: c.family_name,
            picture: c.picture,
        }
    }
}
