use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Identity, SessionClaims};
use crate::{config::SessionConfig, state::AppState};

/// Keys and settings for the session token.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub cookie_name: String,
}

impl SessionKeys {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            cookie_name: cfg.cookie_name.clone(),
        }
    }

    pub fn sign(&self, identity: &Identity, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            given_name: identity.given_name.clone(),
            family_name: identity.family_name.clone(),
            picture: identity.picture.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %identity.id, "session signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        SessionKeys::from_config(&state.config.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn keys(issuer: &str, audience: &str) -> SessionKeys {
        let mut cfg = AppConfig::for_tests().session;
        cfg.issuer = issuer.into();
        cfg.audience = audience.into();
        SessionKeys::from_config(&cfg)
    }

    fn jane() -> Identity {
        Identity {
            id: "kp_123".into(),
            email: Some("jane@example.com".into()),
            given_name: Some("Jane".into()),
            family_name: Some("Doe".into()),
            picture: None,
        }
    }

    #[test]
    fn sign_and_verify_session() {
        let keys = keys("iss", "aud");
        let token = keys.sign(&jane(), Duration::from_secs(300)).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "kp_123");
        assert_eq!(claims.iss, "iss");
        assert_eq!(claims.aud, "aud");
        assert_eq!(Identity::from(claims), jane());
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = keys("good-iss", "good-aud");
        let bad = keys("bad-iss", "bad-aud");
        let token = good.sign(&jane(), Duration::from_secs(300)).expect("sign");
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = keys("iss", "aud");
        assert!(keys.verify("not-a-jwt").is_err());
    }
}
