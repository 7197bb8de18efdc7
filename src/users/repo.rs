use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::repo_types::{NewUser, ProfileUpdate, UserRecord, UserRow};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by identity subject id.
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<UserRecord>>;

    /// Insert a new user. Returns `None` when a row with the same id already exists.
    async fn create_if_absent(&self, new: NewUser) -> anyhow::Result<Option<UserRecord>>;

    /// Write only `name` and `color_scheme`. Returns `None` if the user does not exist.
    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<UserRecord>>;

    /// Store the billing customer id if none is set yet.
    /// Returns `None` when the user is missing or already linked.
    async fn link_billing_customer(
        &self,
        id: &str,
        customer_id: &str,
    ) -> anyhow::Result<Option<UserRecord>>;
}

const USER_COLUMNS: &str =
    "id, email, name, color_scheme, billing_customer_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("select user by id")?;
        Ok(row.map(UserRecord::from))
    }

    async fn create_if_absent(&self, new: NewUser) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.id)
        .bind(&new.email)
        .bind(&new.name)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(row.map(UserRecord::from))
    }

    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   color_scheme = COALESCE($3, color_scheme),
                   updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.color_scheme.map(|c| c.as_str()))
        .fetch_optional(&self.db)
        .await
        .context("update user profile")?;
        Ok(row.map(UserRecord::from))
    }

    async fn link_billing_customer(
        &self,
        id: &str,
        customer_id: &str,
    ) -> anyhow::Result<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET billing_customer_id = $2,
                   updated_at = now()
             WHERE id = $1 AND billing_customer_id IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await
        .context("link billing customer")?;
        Ok(row.map(UserRecord::from))
    }
}
