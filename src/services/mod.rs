//! Domain data services.
//!
//! Each service owns one slice of remote state: it fetches on demand, caches
//! in memory, and (where wired) watches the change feed to stay fresh. The
//! backend remains the source of truth throughout; caches are only ever
//! refilled from it.

mod chats;
mod favorites;
mod items;
mod rentals;
mod wishlists;

pub use chats::{ChatThread, ChatsService};
pub use favorites::FavoritesService;
pub use items::ItemsService;
pub use rentals::{rental_days, RentalsService};
pub use wishlists::{matches_any, WishlistsService};
