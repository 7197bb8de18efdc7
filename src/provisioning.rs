//! First-login provisioning: make sure every signed-in identity has a user
//! record and that the record is linked to a billing customer.
//!
//! The routine is safe to run on every dashboard load. Concurrent first
//! logins are settled by the store (insert-if-absent, link-if-unset) and by
//! the billing provider's idempotency key, never by an in-process lock.

use axum::http::StatusCode;
use tracing::{info, instrument, warn};

use crate::{
    auth::Identity,
    billing::{customer_idempotency_key, BillingClient, BillingError},
    users::{NewUser, UserRecord, UserStore},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&Identity> for ProvisionRequest {
    fn from(i: &Identity) -> Self {
        Self {
            id: i.id.clone(),
            email: i.email.clone().unwrap_or_default(),
            first_name: i.given_name.clone(),
            last_name: i.family_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub record: UserRecord,
    /// This call inserted the record.
    pub created: bool,
    /// This call stored the billing customer id.
    pub billing_linked: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("session has no user id")]
    MissingIdentity,
    #[error("session has no email address")]
    MissingEmail,
    #[error("user store failed: {0:#}")]
    Store(#[source] anyhow::Error),
    #[error("billing link failed (record created: {record_created}): {source}")]
    BillingLink {
        record_created: bool,
        #[source]
        source: BillingError,
    },
}

impl ProvisionError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProvisionError::MissingIdentity | ProvisionError::MissingEmail => {
                StatusCode::BAD_REQUEST
            }
            ProvisionError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProvisionError::BillingLink { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Display name stored on first creation: given and family name joined by a
/// single space, with absent parts treated as empty.
pub fn display_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
}

#[instrument(skip(store, billing, req), fields(user_id = %req.id))]
pub async fn provision_user(
    store: &dyn UserStore,
    billing: &dyn BillingClient,
    req: &ProvisionRequest,
) -> Result<Provisioned, ProvisionError> {
    // The subject is stored exactly as issued; blank only means absent.
    let id = req.id.as_str();
    if id.trim().is_empty() {
        warn!("provisioning skipped: empty user id");
        return Err(ProvisionError::MissingIdentity);
    }
    if req.email.trim().is_empty() {
        warn!("provisioning skipped: empty email");
        return Err(ProvisionError::MissingEmail);
    }

    let existing = store.find_by_id(id).await.map_err(ProvisionError::Store)?;

    let (mut record, created) = match existing {
        Some(r) => (r, false),
        None => {
            let new = NewUser {
                id: id.to_string(),
                email: req.email.clone(),
                name: display_name(req.first_name.as_deref(), req.last_name.as_deref()),
            };
            match store.create_if_absent(new).await.map_err(ProvisionError::Store)? {
                Some(r) => {
                    info!("user record created");
                    (r, true)
                }
                // Another request inserted it between our lookup and insert.
                None => (reload(store, id).await?, false),
            }
        }
    };

    let mut billing_linked = false;
    if record.billing_customer_id.is_none() {
        let customer = billing
            .create_customer(&req.email, &customer_idempotency_key(id))
            .await
            .map_err(|source| {
                warn!(error = %source, record_created = created, "billing customer creation failed");
                ProvisionError::BillingLink {
                    record_created: created,
                    source,
                }
            })?;

        match store
            .link_billing_customer(id, &customer.id)
            .await
            .map_err(ProvisionError::Store)?
        {
            Some(r) => {
                info!(customer_id = %customer.id, "billing customer linked");
                record = r;
                billing_linked = true;
            }
            None => {
                record = reload(store, id).await?;
                if record.billing_customer_id.as_deref() != Some(customer.id.as_str()) {
                    warn!(
                        customer_id = %customer.id,
                        stored = ?record.billing_customer_id,
                        "billing customer already linked; created customer left unlinked"
                    );
                }
            }
        }
    }

    Ok(Provisioned {
        record,
        created,
        billing_linked,
    })
}

async fn reload(store: &dyn UserStore, id: &str) -> Result<UserRecord, ProvisionError> {
    store
        .find_by_id(id)
        .await
        .map_err(ProvisionError::Store)?
        .ok_or_else(|| ProvisionError::Store(anyhow::anyhow!("user {id} vanished during provisioning")))
}
