//! Domain entities. All rows are owned by the backend; these are transient,
//! re-fetchable copies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The four dispositions a listing can be offered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Sell,
    Swap,
    Free,
    Rent,
}

/// Lifecycle status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
    Removed,
}

/// Rental request lifecycle. Transitions are validated; terminal states
/// cannot be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl RentalStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition(self, next: RentalStatus) -> bool {
        use RentalStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Accepted, Completed)
                | (Accepted, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Accepted => "accepted",
            RentalStatus::Rejected => "rejected",
            RentalStatus::Completed => "completed",
            RentalStatus::Cancelled => "cancelled",
        }
    }
}

/// Seller display fields joined onto listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerSummary {
    pub id: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub university_name: Option<String>,
}

/// Counterpart display fields joined onto chats and rentals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// A marketplace listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Meaningful only when `kind` is `Sell`
    pub price: Option<f64>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub category: String,
    pub image_url: Option<String>,
    pub seller_id: String,
    pub status: ListingStatus,
    /// Meaningful only when `kind` is `Rent`
    pub rental_price_per_day: Option<f64>,
    pub max_rental_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<SellerSummary>,
}

/// Full profile row for the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
    pub university_name: Option<String>,
    pub year_of_study: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing fields joined onto a chat row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    pub price: Option<f64>,
    pub image_url: Option<String>,
}

/// A buyer–seller–item conversation thread. At most one chat exists per
/// (item, buyer, seller) triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub item_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<ProfileSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<ProfileSummary>,
}

/// One message inside a chat. Append-only, ordered by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: Option<String>,
    pub item_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A time-bounded borrow proposal against a rent-kind listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rental {
    pub id: String,
    pub item_id: String,
    pub renter_id: String,
    pub owner_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: f64,
    pub status: RentalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renter: Option<ProfileSummary>,
}

/// A saved-item bookmark, unique per (user, item) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub created_at: DateTime<Utc>,
}

/// A keyword the user wants alerts for, unique per (user, keyword) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: String,
    pub user_id: String,
    pub keyword: String,
    pub created_at: DateTime<Utc>,
}
