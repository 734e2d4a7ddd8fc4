//! Saved-item bookmarks.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::notify::Notifier;
use crate::Backend;

#[derive(Debug, Deserialize)]
struct FavoriteRow {
    item_id: String,
}

/// Owns the set of item ids the current user has favorited.
///
/// Toggles on the same item are serialized through a per-item async lock, so
/// a second toggle issued while the first is in flight waits and observes its
/// outcome instead of racing it.
pub struct FavoritesService {
    backend: Arc<Backend>,
    notifier: Notifier,
    ids: RwLock<HashSet<String>>,
    toggle_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FavoritesService {
    pub fn new(backend: Arc<Backend>, notifier: Notifier) -> Arc<Self> {
        Arc::new(Self {
            backend,
            notifier,
            ids: RwLock::new(HashSet::new()),
            toggle_locks: Mutex::new(HashMap::new()),
        })
    }

    /// The favorited item ids.
    pub async fn ids(&self) -> HashSet<String> {
        self.ids.read().await.clone()
    }

    pub async fn is_favorited(&self, item_id: &str) -> bool {
        self.ids.read().await.contains(item_id)
    }

    /// Refetch the favorite set. Signed-out users get an empty set. Call
    /// again after any auth state change.
    pub async fn refresh(&self) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.ids.write().await.clear();
            return;
        };

        let result = self
            .backend
            .from("favorites")
            .select("item_id")
            .eq("user_id", &user_id)
            .execute::<FavoriteRow>()
            .await;

        match result {
            Ok(rows) => {
                *self.ids.write().await = rows.into_iter().map(|r| r.item_id).collect();
            }
            Err(err) => warn!(%err, "favorites refresh failed"),
        }
    }

    /// Flip the saved state of one item. Outcomes are reported through the
    /// notifier; backend failures leave local state untouched.
    pub async fn toggle(&self, item_id: &str) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.notifier.error("Please sign in to save items");
            return;
        };

        let lock = {
            let mut locks = self.toggle_locks.lock().await;
            locks
                .entry(item_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        {
            let _serialized = lock.lock().await;
            self.apply_toggle(&user_id, item_id).await;
        }

        // Drop the map entry once no other toggle holds a clone, so the map
        // does not grow with every item ever toggled.
        let mut locks = self.toggle_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(item_id);
        }
    }

    async fn apply_toggle(&self, user_id: &str, item_id: &str) {
        let currently_favorited = self.ids.read().await.contains(item_id);

        if currently_favorited {
            let result = self
                .backend
                .from("favorites")
                .delete()
                .eq("user_id", &user_id)
                .eq("item_id", item_id)
                .execute_no_return()
                .await;

            match result {
                Ok(()) => {
                    self.ids.write().await.remove(item_id);
                    self.notifier.success("Removed from saved items");
                }
                Err(err) => {
                    warn!(%err, item_id, "favorite removal failed");
                    self.notifier.error("Failed to update saved items");
                }
            }
        } else {
            let result = self
                .backend
                .from("favorites")
                .insert(serde_json::json!({ "user_id": user_id, "item_id": item_id }))
                .execute_no_return()
                .await;

            match result {
                Ok(()) => {
                    self.ids.write().await.insert(item_id.to_string());
                    self.notifier.success("Added to saved items");
                }
                Err(err) => {
                    warn!(%err, item_id, "favorite insert failed");
                    self.notifier.error("Failed to update saved items");
                }
            }
        }
    }
}
