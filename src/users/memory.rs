use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::repo::UserStore;
use super::repo_types::{ColorScheme, NewUser, ProfileUpdate, UserRecord};

/// Process-local user store. Used when no database is configured.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn create_if_absent(&self, new: NewUser) -> anyhow::Result<Option<UserRecord>> {
        let mut users = self.users.write().await;
        if users.contains_key(&new.id) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: new.id,
            email: new.email,
            name: new.name,
            color_scheme: Some(ColorScheme::default()),
            billing_customer_id: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id.clone(), record.clone());
        Ok(Some(record))
    }

    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<UserRecord>> {
        let mut users = self.users.write().await;
        let Some(record) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(color) = update.color_scheme {
            record.color_scheme = Some(color);
        }
        record.updated_at = OffsetDateTime::now_utc();
        Ok(Some(record.clone()))
    }

    async fn link_billing_customer(
        &self,
        id: &str,
        customer_id: &str,
    ) -> anyhow::Result<Option<UserRecord>> {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(record) if record.billing_customer_id.is_none() => {
                record.billing_customer_id = Some(customer_id.to_string());
                record.updated_at = OffsetDateTime::now_utc();
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }
}
