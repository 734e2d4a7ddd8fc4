//! Listings: the global feed, the user's own items, and saved items.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Error;
use crate::listing::ListingDraft;
use crate::models::{Item, ListingStatus};
use crate::notify::Notifier;
use crate::realtime::{ChangeFeed, ChangeFilter, ChangeKind, WatchGuard};
use crate::storage::item_image_path;
use crate::Backend;

/// Listing columns plus the seller display join.
const ITEM_WITH_SELLER: &str =
    "*, seller:profiles!items_seller_id_fkey(id,email,avatar_url,university_name)";

#[derive(Debug, Serialize)]
struct NewItemRow<'a> {
    title: &'a str,
    description: &'a str,
    price: Option<f64>,
    #[serde(rename = "type")]
    kind: crate::models::ItemKind,
    category: &'a str,
    image_url: String,
    seller_id: String,
    rental_price_per_day: Option<f64>,
    max_rental_days: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct SavedRow {
    item: Option<Item>,
}

/// Owns the three listing caches. All three are refetched wholesale when the
/// change feed reports any write to the items table.
pub struct ItemsService {
    backend: Arc<Backend>,
    notifier: Notifier,
    feed_items: RwLock<Vec<Item>>,
    my_items: RwLock<Vec<Item>>,
    saved_items: RwLock<Vec<Item>>,
}

impl ItemsService {
    pub fn new(backend: Arc<Backend>, notifier: Notifier) -> Arc<Self> {
        Arc::new(Self {
            backend,
            notifier,
            feed_items: RwLock::new(Vec::new()),
            my_items: RwLock::new(Vec::new()),
            saved_items: RwLock::new(Vec::new()),
        })
    }

    /// The global feed: active listings, newest first.
    pub async fn feed(&self) -> Vec<Item> {
        self.feed_items.read().await.clone()
    }

    /// The current user's listings, every status.
    pub async fn mine(&self) -> Vec<Item> {
        self.my_items.read().await.clone()
    }

    /// Listings the current user has favorited.
    pub async fn saved(&self) -> Vec<Item> {
        self.saved_items.read().await.clone()
    }

    /// Refetch the global feed. Failures surface as a notice, never an error.
    pub async fn refresh_feed(&self) {
        match self.fetch_feed().await {
            Ok(items) => *self.feed_items.write().await = items,
            Err(err) => {
                warn!(%err, "feed refresh failed");
                self.notifier.error("Failed to load items");
            }
        }
    }

    async fn fetch_feed(&self) -> Result<Vec<Item>, Error> {
        self.backend
            .from("items")
            .select(ITEM_WITH_SELLER)
            .eq("status", "active")
            .order("created_at", false)
            .execute::<Item>()
            .await
    }

    /// Refetch the current user's listings. No session leaves the cache
    /// empty.
    pub async fn refresh_mine(&self) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.my_items.write().await.clear();
            return;
        };

        let result = self
            .backend
            .from("items")
            .select("*")
            .eq("seller_id", &user_id)
            .order("created_at", false)
            .execute::<Item>()
            .await;

        match result {
            Ok(items) => *self.my_items.write().await = items,
            Err(err) => {
                warn!(%err, "my-items refresh failed");
                self.notifier.error("Failed to load your items");
            }
        }
    }

    /// Refetch the saved-items list via the favorites join.
    pub async fn refresh_saved(&self) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.saved_items.write().await.clear();
            return;
        };

        let result = self
            .backend
            .from("favorites")
            .select(
                "item:items(*, seller:profiles!items_seller_id_fkey(id,email,avatar_url,university_name))",
            )
            .eq("user_id", &user_id)
            .execute::<SavedRow>()
            .await;

        match result {
            Ok(rows) => {
                let items = rows.into_iter().filter_map(|row| row.item).collect();
                *self.saved_items.write().await = items;
            }
            Err(err) => {
                warn!(%err, "saved-items refresh failed");
                self.notifier.error("Failed to load saved items");
            }
        }
    }

    /// Fetch one listing with its seller summary for the detail page.
    pub async fn fetch_item(&self, id: &str) -> Result<Option<Item>, Error> {
        self.backend
            .from("items")
            .select(ITEM_WITH_SELLER)
            .eq("id", id)
            .execute_maybe_single::<Item>()
            .await
    }

    /// Create a listing: validate the draft, upload its photo, insert the
    /// row. Requires a session.
    pub async fn create(&self, draft: &ListingDraft) -> Result<Item, Error> {
        let user_id = self.backend.auth().require_user_id()?;
        draft.validate()?;

        // validate() guarantees the photo is present
        let photo = draft
            .photo
            .as_ref()
            .ok_or_else(|| Error::InvalidListing("a photo is required".to_string()))?;

        let bucket_id = self.backend.options.item_image_bucket.clone();
        let storage = self.backend.storage();
        let bucket = storage.from(&bucket_id);
        let path = item_image_path(&user_id, &photo.file_name);
        bucket.upload(&path, photo.bytes.clone()).await?;
        let image_url = bucket.public_url(&path);

        let row = NewItemRow {
            title: draft.title.trim(),
            description: &draft.description,
            price: draft.price,
            kind: draft.kind,
            category: &draft.category,
            image_url,
            seller_id: user_id,
            rental_price_per_day: draft.rental_price_per_day,
            max_rental_days: draft.max_rental_days,
        };

        self.backend
            .from("items")
            .insert(row)
            .execute_one::<Item>()
            .await
    }

    /// Change a listing's status (e.g. mark it sold).
    pub async fn mark_status(&self, item_id: &str, status: ListingStatus) -> Result<(), Error> {
        self.backend
            .from("items")
            .update(serde_json::json!({ "status": status }))
            .eq("id", item_id)
            .execute_no_return()
            .await
    }

    /// Watch the items table; any write refetches all three lists. Coarse,
    /// but never leaves a list stale indefinitely. Dropping the guard stops
    /// the watch.
    pub fn watch(self: &Arc<Self>, feed: &ChangeFeed) -> WatchGuard {
        let service = self.clone();
        let mut stream = feed.subscribe(
            "items",
            &[ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete],
            ChangeFilter::Any,
        );
        WatchGuard::new(tokio::spawn(async move {
            while stream.next().await.is_some() {
                service.refresh_feed().await;
                service.refresh_mine().await;
                service.refresh_saved().await;
            }
        }))
    }
}
