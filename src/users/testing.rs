use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{InMemoryUserStore, NewUser, ProfileUpdate, UserRecord, UserStore};

/// Store that counts every call and can be told to fail.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: InMemoryUserStore,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingStore {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<UserRecord>> {
        self.hit()?;
        self.inner.find_by_id(id).await
    }

    async fn create_if_absent(&self, new: NewUser) -> anyhow::Result<Option<UserRecord>> {
        self.hit()?;
        self.inner.create_if_absent(new).await
    }

    async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<UserRecord>> {
        self.hit()?;
        self.inner.update_profile(id, update).await
    }

    async fn link_billing_customer(
        &self,
        id: &str,
        customer_id: &str,
    ) -> anyhow::Result<Option<UserRecord>> {
        self.hit()?;
        self.inner.link_billing_customer(id, customer_id).await
    }
}
