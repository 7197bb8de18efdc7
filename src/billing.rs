use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BillingCustomer {
    pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("billing provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("billing provider returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

#[async_trait]
pub trait BillingClient: Send + Sync {
    /// Create a customer for `email`. Calls sharing an `idempotency_key`
    /// yield the same customer.
    async fn create_customer(
        &self,
        email: &str,
        idempotency_key: &str,
    ) -> Result<BillingCustomer, BillingError>;
}

/// Idempotency key for the one customer a user should ever have.
pub fn customer_idempotency_key(user_id: &str) -> String {
    let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, user_id.as_bytes());
    format!("customer-create-{}", id.simple())
}

#[derive(Clone)]
pub struct StripeBilling {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeBilling {
    pub fn new(api_base: &str, secret_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}

#[async_trait]
impl BillingClient for StripeBilling {
    #[instrument(skip(self, email))]
    async fn create_customer(
        &self,
        email: &str,
        idempotency_key: &str,
    ) -> Result<BillingCustomer, BillingError> {
        let res = self
            .client
            .post(format!("{}/v1/customers", self.api_base))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", idempotency_key)
            .form(&[("email", email)])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            return Err(BillingError::Api { status, message });
        }

        let customer = res.json::<BillingCustomer>().await?;
        debug!(customer_id = %customer.id, "billing customer created");
        Ok(customer)
    }
}

/// Offline provider that mints local customer ids. Honors idempotency keys.
#[derive(Default)]
pub struct LocalBilling {
    customers: Mutex<HashMap<String, BillingCustomer>>,
    calls: AtomicUsize,
}

impl LocalBilling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create_customer` calls received, replays included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of distinct customers created.
    pub async fn customer_count(&self) -> usize {
        self.customers.lock().await.len()
    }
}

#[async_trait]
impl BillingClient for LocalBilling {
    async fn create_customer(
        &self,
        email: &str,
        idempotency_key: &str,
    ) -> Result<BillingCustomer, BillingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut customers = self.customers.lock().await;
        let customer = customers
            .entry(idempotency_key.to_string())
            .or_insert_with(|| BillingCustomer {
                id: format!("cus_local_{}", Uuid::new_v4().simple()),
            })
            .clone();
        debug!(customer_id = %customer.id, %email, "local billing customer");
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_string_contains, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[test]
    fn idempotency_key_is_stable_per_user() {
        assert_eq!(customer_idempotency_key("u1"), customer_idempotency_key("u1"));
        assert_ne!(customer_idempotency_key("u1"), customer_idempotency_key("u2"));
        assert!(customer_idempotency_key("u1").starts_with("customer-create-"));
    }

    #[tokio::test]
    async fn local_billing_replays_same_customer_for_same_key() {
        let billing = LocalBilling::new();
        let a = billing.create_customer("a@x.com", "k1").await.unwrap();
        let b = billing.create_customer("a@x.com", "k1").await.unwrap();
        let c = billing.create_customer("b@x.com", "k2").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(billing.calls(), 3);
        assert_eq!(billing.customer_count().await, 2);
    }

    #[tokio::test]
    async fn stripe_create_customer_posts_form_with_idempotency_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(header("idempotency-key", "key-1"))
            .and(body_string_contains("email=a%40x.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "cus_123", "object": "customer"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let billing =
            StripeBilling::new(&server.uri(), "sk_test_123", Duration::from_secs(5)).unwrap();
        let customer = billing.create_customer("a@x.com", "key-1").await.unwrap();
        assert_eq!(customer.id, "cus_123");
    }

    #[tokio::test]
    async fn stripe_error_body_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": {"message": "Your card was declined.", "type": "card_error"}
            })))
            .mount(&server)
            .await;

        let billing = StripeBilling::new(&server.uri(), "sk", Duration::from_secs(5)).unwrap();
        let err = billing.create_customer("a@x.com", "k").await.unwrap_err();
        match err {
            BillingError::Api { status, message } => {
                assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stripe_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "cus_slow"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let billing = StripeBilling::new(&server.uri(), "sk", Duration::from_millis(50)).unwrap();
        let err = billing.create_customer("a@x.com", "k").await.unwrap_err();
        assert!(matches!(err, BillingError::Transport(_)));
    }
}
