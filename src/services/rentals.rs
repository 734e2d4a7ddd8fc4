//! Rental requests against rent-kind listings.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Error;
use crate::models::{Rental, RentalStatus};
use crate::notify::Notifier;
use crate::postgrest::Condition;
use crate::realtime::{ChangeFeed, ChangeFilter, ChangeKind, WatchGuard};
use crate::Backend;

/// Rental columns plus the item and renter joins.
const RENTAL_WITH_JOINS: &str = "*, item:items(id,title,price,image_url), \
     renter:profiles!rentals_renter_id_fkey(id,email,avatar_url)";

const SECONDS_PER_DAY: i64 = 86_400;

/// Chargeable days between two instants: the difference rounded up to whole
/// days. Start and end on the same instant is zero days.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

#[derive(Debug, Deserialize)]
struct RentalStatusRow {
    status: RentalStatus,
}

/// Owns the user's rentals, as renter and as owner.
pub struct RentalsService {
    backend: Arc<Backend>,
    notifier: Notifier,
    rentals: RwLock<Vec<Rental>>,
}

impl RentalsService {
    pub fn new(backend: Arc<Backend>, notifier: Notifier) -> Arc<Self> {
        Arc::new(Self {
            backend,
            notifier,
            rentals: RwLock::new(Vec::new()),
        })
    }

    /// Rentals involving the user, newest first.
    pub async fn rentals(&self) -> Vec<Rental> {
        self.rentals.read().await.clone()
    }

    /// Refetch the rental list. Background failures are logged only.
    pub async fn refresh(&self) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.rentals.write().await.clear();
            return;
        };

        let result = self
            .backend
            .from("rentals")
            .select(RENTAL_WITH_JOINS)
            .or_any(&[
                Condition::eq("renter_id", &user_id),
                Condition::eq("owner_id", &user_id),
            ])
            .order("created_at", false)
            .execute::<Rental>()
            .await;

        match result {
            Ok(rentals) => *self.rentals.write().await = rentals,
            Err(err) => warn!(%err, "rental list refresh failed"),
        }
    }

    /// File a rental request. Dates are persisted at calendar-day
    /// granularity; the total is the rounded-up day count times the per-day
    /// rate. The new rental starts `pending`.
    pub async fn create_request(
        &self,
        item_id: &str,
        owner_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        price_per_day: f64,
    ) -> Result<Rental, Error> {
        let renter_id = self.backend.auth().require_user_id()?;

        let days = rental_days(start, end);
        let total_price = days as f64 * price_per_day;

        self.backend
            .from("rentals")
            .insert(serde_json::json!({
                "item_id": item_id,
                "renter_id": renter_id,
                "owner_id": owner_id,
                "start_date": start.date_naive(),
                "end_date": end.date_naive(),
                "total_price": total_price,
                "status": RentalStatus::Pending,
            }))
            .execute_one::<Rental>()
            .await
    }

    /// Move a rental to a new status, validated against the transition
    /// rules. The current status is read from the cache when present,
    /// otherwise fetched.
    pub async fn update_status(
        &self,
        rental_id: &str,
        status: RentalStatus,
    ) -> Result<(), Error> {
        let current = self.current_status(rental_id).await?;

        if !current.can_transition(status) {
            return Err(Error::InvalidTransition {
                from: current.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        self.backend
            .from("rentals")
            .update(serde_json::json!({ "status": status }))
            .eq("id", rental_id)
            .execute_no_return()
            .await
    }

    async fn current_status(&self, rental_id: &str) -> Result<RentalStatus, Error> {
        if let Some(rental) = self
            .rentals
            .read()
            .await
            .iter()
            .find(|r| r.id == rental_id)
        {
            return Ok(rental.status);
        }

        let row = self
            .backend
            .from("rentals")
            .select("status")
            .eq("id", rental_id)
            .execute_maybe_single::<RentalStatusRow>()
            .await?
            .ok_or_else(|| Error::database(format!("rental {} not found", rental_id)))?;

        Ok(row.status)
    }

    /// Watch for rental requests against the user's listings: each insert
    /// raises a notice and refetches the list. Best effort; a dropped
    /// subscription loses the notice but the next refetch catches up.
    pub fn watch(self: &Arc<Self>, feed: &ChangeFeed) -> WatchGuard {
        let service = self.clone();
        let stream = service.backend.auth().user_id().map(|user_id| {
            feed.subscribe(
                "rentals",
                &[ChangeKind::Insert],
                ChangeFilter::Eq("owner_id".to_string(), user_id),
            )
        });
        WatchGuard::new(tokio::spawn(async move {
            let Some(mut stream) = stream else {
                return;
            };

            while stream.next().await.is_some() {
                service
                    .notifier
                    .info_with_link("New rental request received!", "/rentals");
                service.refresh().await;
            }
        }))
    }
}
