use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub cookie_name: String,
}

/// Where the navbar sends people to authenticate.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthLinks {
    pub login_url: String,
    pub register_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    pub stripe_secret_key: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl BillingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: Option<String>,
    pub session: SessionConfig,
    pub auth_links: AuthLinks,
    pub billing: BillingConfig,
    pub page_cache_ttl_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")
                .map_err(|_| anyhow::anyhow!("SESSION_SECRET must be set"))?,
            issuer: env_or("SESSION_ISSUER", "saasdash"),
            audience: env_or("SESSION_AUDIENCE", "saasdash-web"),
            cookie_name: env_or("SESSION_COOKIE", "session"),
        };
        let auth_links = AuthLinks {
            login_url: env_or("AUTH_LOGIN_URL", "/api/auth/login"),
            register_url: env_or("AUTH_REGISTER_URL", "/api/auth/register"),
        };
        let billing = BillingConfig {
            stripe_secret_key: env_opt("STRIPE_SECRET_KEY"),
            api_base: env_or("STRIPE_API_BASE", "https://api.stripe.com"),
            timeout_secs: env_u64("BILLING_TIMEOUT_SECS", 10),
        };
        let port = env_or("APP_PORT", "8080");
        let server = ServerConfig {
            host: env_or("APP_HOST", "0.0.0.0"),
            port: port
                .parse()
                .with_context(|| format!("APP_PORT must be a port number, got {port:?}"))?,
        };
        Ok(Self {
            server,
            database_url: env_opt("DATABASE_URL"),
            session,
            auth_links,
            billing,
            page_cache_ttl_secs: env_u64("PAGE_CACHE_TTL_SECS", 60),
        })
    }

    /// Config used by `AppState::fake` and tests.
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
            database_url: None,
            session: SessionConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                cookie_name: "session".into(),
            },
            auth_links: AuthLinks {
                login_url: "/api/auth/login".into(),
                register_url: "/api/auth/register".into(),
            },
            billing: BillingConfig {
                stripe_secret_key: None,
                api_base: "http://localhost:12111".into(),
                timeout_secs: 5,
            },
            page_cache_ttl_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_addr_joins_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: 8080,
        };
        assert_eq!(server.addr().unwrap(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn server_addr_rejects_bad_host() {
        let server = ServerConfig {
            host: "not a host".into(),
            port: 8080,
        };
        assert!(server.addr().is_err());
    }
}
