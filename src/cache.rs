use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;
use tracing::debug;

/// How far a revalidation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only the exact path.
    Page,
    /// The path and everything rendered beneath it.
    Layout,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: String,
    path: String,
}

struct Entry {
    html: String,
    stored_at: Instant,
}

/// Rendered dashboard pages, per user and path.
pub struct PageCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: &str, path: &str) -> Option<String> {
        let key = CacheKey {
            user_id: user_id.to_string(),
            path: path.to_string(),
        };
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.html.clone())
    }

    pub async fn put(&self, user_id: &str, path: &str, html: String) {
        let key = CacheKey {
            user_id: user_id.to_string(),
            path: path.to_string(),
        };
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            Entry {
                html,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop cached renders for `path` across all users.
    pub async fn revalidate(&self, path: &str, scope: Scope) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| match scope {
            Scope::Page => k.path != path,
            Scope::Layout => !is_under(&k.path, path),
        });
        debug!(path, ?scope, dropped = before - entries.len(), "page cache revalidated");
    }
}

fn is_under(candidate: &str, root: &str) -> bool {
    if root == "/" || candidate == root {
        return true;
    }
    candidate
        .strip_prefix(root.trim_end_matches('/'))
        .is_some_and(|rest| rest.starts_with('/'))
}
