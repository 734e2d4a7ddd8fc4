//! Wishlist keywords and new-listing alerts.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Error;
use crate::models::Wishlist;
use crate::notify::Notifier;
use crate::realtime::{ChangeFeed, ChangeFilter, ChangeKind, WatchGuard};
use crate::Backend;

/// Whether `title` contains any of the keywords, case-insensitively.
pub fn matches_any(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && title.contains(&keyword.to_lowercase()))
}

/// Owns the user's wishlist keywords.
pub struct WishlistsService {
    backend: Arc<Backend>,
    notifier: Notifier,
    keywords: RwLock<Vec<Wishlist>>,
}

impl WishlistsService {
    pub fn new(backend: Arc<Backend>, notifier: Notifier) -> Arc<Self> {
        Arc::new(Self {
            backend,
            notifier,
            keywords: RwLock::new(Vec::new()),
        })
    }

    /// The saved keywords, newest first.
    pub async fn keywords(&self) -> Vec<Wishlist> {
        self.keywords.read().await.clone()
    }

    /// Refetch the keyword list. Background failures are logged only.
    pub async fn refresh(&self) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.keywords.write().await.clear();
            return;
        };

        let result = self
            .backend
            .from("wishlists")
            .select("*")
            .eq("user_id", &user_id)
            .order("created_at", false)
            .execute::<Wishlist>()
            .await;

        match result {
            Ok(keywords) => *self.keywords.write().await = keywords,
            Err(err) => warn!(%err, "wishlist refresh failed"),
        }
    }

    /// Save a keyword. Keywords are stored trimmed and lowercased; the
    /// backend enforces uniqueness per user, and a duplicate surfaces as a
    /// notice rather than a new row.
    pub async fn add_keyword(&self, keyword: &str) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.notifier.error("Please sign in to use the wishlist");
            return;
        };

        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return;
        }

        let result = self
            .backend
            .from("wishlists")
            .insert(serde_json::json!({ "user_id": user_id, "keyword": keyword }))
            .execute_no_return()
            .await;

        match result {
            Ok(()) => {
                self.notifier.success("Keyword added to wishlist");
                self.refresh().await;
            }
            Err(err) if err.is_conflict() => {
                self.notifier.error("This keyword is already in your wishlist");
            }
            Err(err) => {
                warn!(%err, keyword, "wishlist insert failed");
                self.notifier.error("Failed to add keyword");
            }
        }
    }

    /// Delete a keyword by row id. The local list is pruned immediately on
    /// success.
    pub async fn remove_keyword(&self, id: &str) {
        let result = self
            .backend
            .from("wishlists")
            .delete()
            .eq("id", id)
            .execute_no_return()
            .await;

        match result {
            Ok(()) => {
                self.keywords.write().await.retain(|w| w.id != id);
                self.notifier.success("Keyword removed from wishlist");
            }
            Err(err) => {
                warn!(%err, "wishlist delete failed");
                self.notifier.error("Failed to remove keyword");
            }
        }
    }

    /// Watch new listings and raise a notice whenever a title matches one of
    /// the user's keywords. The keyword set is snapshotted when the watch
    /// starts; restart the watch after editing keywords.
    pub async fn watch_alerts(self: &Arc<Self>, feed: &ChangeFeed) -> WatchGuard {
        let keywords: Vec<String> = self
            .keywords
            .read()
            .await
            .iter()
            .map(|w| w.keyword.clone())
            .collect();

        let service = self.clone();
        let mut stream = feed.subscribe("items", &[ChangeKind::Insert], ChangeFilter::Any);
        WatchGuard::new(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                let Some(title) = event.column("title") else {
                    continue;
                };
                if !matches_any(title, &keywords) {
                    continue;
                }
                let link = event
                    .column("id")
                    .map(|id| format!("/item/{}", id))
                    .unwrap_or_else(|| "/".to_string());
                service.notifier.success_with_link(
                    &format!("New item matches your wishlist: \"{}\"", title),
                    &link,
                );
            }
        }))
    }
}
