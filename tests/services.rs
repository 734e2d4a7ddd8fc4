//! Service tests against a mocked backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use campus_market::auth::Session;
use campus_market::error::Error;
use campus_market::listing::ListingDraft;
use campus_market::models::RentalStatus;
use campus_market::notify::{NoticeLevel, Notifier};
use campus_market::realtime::{ChangeEvent, ChangeFeed};
use campus_market::services::{
    ChatsService, FavoritesService, ItemsService, RentalsService, WishlistsService,
};
use campus_market::Backend;

fn signed_in_backend(server: &MockServer) -> Arc<Backend> {
    let backend = Backend::new(&server.uri(), "test-key");
    backend.auth().set_session(Session::new(
        "access-token".into(),
        "refresh-token".into(),
        "u1".into(),
        3600,
    ));
    Arc::new(backend)
}

fn item_row(id: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "description": "like new",
        "price": 450.0,
        "type": "sell",
        "category": "Books",
        "image_url": null,
        "seller_id": "u2",
        "status": "active",
        "rental_price_per_day": null,
        "max_rental_days": null,
        "created_at": "2026-08-01T10:00:00Z",
        "updated_at": "2026-08-01T10:00:00Z",
        "seller": {
            "id": "u2",
            "email": "seller@iitb.ac.in",
            "avatar_url": null,
            "university_name": "IIT Bombay"
        }
    })
}

fn chat_row(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "item_id": "i1",
        "buyer_id": "u1",
        "seller_id": "u2",
        "created_at": "2026-08-01T10:00:00Z",
        "last_message_at": null
    })
}

fn message_row(id: &str, chat_id: &str, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "chat_id": chat_id,
        "item_id": "i1",
        "sender_id": "u2",
        "receiver_id": "u1",
        "content": content,
        "created_at": "2026-08-01T10:00:00Z"
    })
}

fn rental_row(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "item_id": "i1",
        "renter_id": "u1",
        "owner_id": "u2",
        "start_date": "2026-08-01",
        "end_date": "2026-08-04",
        "total_price": 300.0,
        "status": status,
        "created_at": "2026-08-01T10:00:00Z"
    })
}

async fn recv_notice(
    rx: &mut tokio::sync::broadcast::Receiver<campus_market::notify::Notice>,
) -> campus_market::notify::Notice {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a notice")
        .expect("notice channel closed")
}

#[tokio::test]
async fn feed_lists_active_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/items"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([item_row("i1", "Calculus Textbook")])),
        )
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let items = ItemsService::new(backend, Notifier::new());

    items.refresh_feed().await;

    let feed = items.feed().await;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].title, "Calculus Textbook");
    assert_eq!(
        feed[0].seller.as_ref().unwrap().university_name.as_deref(),
        Some("IIT Bombay")
    );
}

#[tokio::test]
async fn items_watch_refetches_on_any_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/items"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([item_row("i1", "Desk Lamp")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let items = ItemsService::new(backend, Notifier::new());
    let feed = ChangeFeed::new();

    assert!(items.feed().await.is_empty());
    let _guard = items.watch(&feed);

    feed.publish(ChangeEvent::insert("items", json!({"id": "i1"})));

    for _ in 0..100 {
        if !items.feed().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(items.feed().await.len(), 1);
    assert_eq!(items.mine().await.len(), 1);
}

#[tokio::test]
async fn chats_watch_refetches_on_any_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([chat_row("c1")])))
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let chats = ChatsService::new(backend, Notifier::new());
    let feed = ChangeFeed::new();

    assert!(chats.chats().await.is_empty());
    let _guard = chats.watch(&feed);

    feed.publish(ChangeEvent::insert("chats", json!({"id": "c1"})));

    for _ in 0..100 {
        if !chats.chats().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(chats.chats().await.len(), 1);
}

#[tokio::test]
async fn creating_a_listing_requires_a_session() {
    let server = MockServer::start().await;
    let backend = Arc::new(Backend::new(&server.uri(), "test-key"));
    let items = ItemsService::new(backend, Notifier::new());

    let result = items.create(&ListingDraft::default()).await;
    assert!(matches!(result, Err(Error::AuthenticationRequired)));
}

#[tokio::test]
async fn toggling_twice_restores_saved_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let notifier = Notifier::new();
    let mut notices = notifier.listen();
    let favorites = FavoritesService::new(backend, notifier);

    favorites.toggle("i1").await;
    assert!(favorites.is_favorited("i1").await);
    assert_eq!(recv_notice(&mut notices).await.message, "Added to saved items");

    favorites.toggle("i1").await;
    assert!(!favorites.is_favorited("i1").await);
    assert_eq!(
        recv_notice(&mut notices).await.message,
        "Removed from saved items"
    );
}

#[tokio::test]
async fn concurrent_toggles_serialize_and_settle() {
    let server = MockServer::start().await;
    // A slow insert keeps the first toggle in flight while the second starts.
    Mock::given(method("POST"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/favorites"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let favorites = FavoritesService::new(backend, Notifier::new());

    let first = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.toggle("i1").await }
    });
    let second = tokio::spawn({
        let favorites = favorites.clone();
        async move { favorites.toggle("i1").await }
    });
    first.await.unwrap();
    second.await.unwrap();

    // The second toggle waited for the first, saw the item saved, and
    // removed it again.
    assert!(!favorites.is_favorited("i1").await);
}

#[tokio::test]
async fn toggling_while_signed_out_raises_a_notice() {
    let server = MockServer::start().await;
    let backend = Arc::new(Backend::new(&server.uri(), "test-key"));
    let notifier = Notifier::new();
    let mut notices = notifier.listen();
    let favorites = FavoritesService::new(backend, notifier);

    favorites.toggle("i1").await;

    let notice = recv_notice(&mut notices).await;
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "Please sign in to save items");
    assert!(!favorites.is_favorited("i1").await);
}

#[tokio::test]
async fn existing_chat_is_reused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "c1"}])))
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let chats = ChatsService::new(backend, Notifier::new());

    let first = chats.get_or_create_chat("i1", "u2").await.unwrap();
    let second = chats.get_or_create_chat("i1", "u2").await.unwrap();
    assert_eq!(first, "c1");
    assert_eq!(second, "c1");
}

#[tokio::test]
async fn missing_chat_is_created() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/chats"))
        .and(body_partial_json(json!({
            "item_id": "i1",
            "buyer_id": "u1",
            "seller_id": "u2"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{"id": "c9"}])))
        .expect(1)
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let chats = ChatsService::new(backend, Notifier::new());

    let chat_id = chats.get_or_create_chat("i1", "u2").await.unwrap();
    assert_eq!(chat_id, "c9");
}

#[tokio::test]
async fn send_message_bumps_chat_activity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .and(body_partial_json(json!({
            "chat_id": "c1",
            "content": "still available?",
            "sender_id": "u1"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/chats"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let chats = ChatsService::new(backend, Notifier::new());

    chats
        .send_message("c1", "still available?", "u2", "i1")
        .await
        .unwrap();
}

#[tokio::test]
async fn open_thread_appends_live_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([message_row("m1", "c7", "hi")])),
        )
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let chats = ChatsService::new(backend, Notifier::new());
    let feed = ChangeFeed::new();

    let thread = chats.open_thread("c7", &feed).await.unwrap();
    assert_eq!(thread.messages().await.len(), 1);

    feed.publish(ChangeEvent::insert(
        "messages",
        message_row("m2", "c9", "other thread"),
    ));
    feed.publish(ChangeEvent::insert(
        "messages",
        message_row("m3", "c7", "yes, still here"),
    ));

    for _ in 0..100 {
        if thread.messages().await.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let messages = thread.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "yes, still here");
}

#[tokio::test]
async fn duplicate_keyword_raises_a_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/wishlists"))
        .and(body_partial_json(json!({"keyword": "calculus"})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"wishlists_user_id_keyword_key\"",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let notifier = Notifier::new();
    let mut notices = notifier.listen();
    let wishlists = WishlistsService::new(backend, notifier);

    wishlists.add_keyword("  Calculus ").await;

    let notice = recv_notice(&mut notices).await;
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "This keyword is already in your wishlist");
}

#[tokio::test]
async fn matching_insert_raises_a_wishlist_alert() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/wishlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "w1",
            "user_id": "u1",
            "keyword": "calculus",
            "created_at": "2026-08-01T10:00:00Z"
        }])))
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let notifier = Notifier::new();
    let mut notices = notifier.listen();
    let wishlists = WishlistsService::new(backend, notifier);
    let feed = ChangeFeed::new();

    wishlists.refresh().await;
    let _guard = wishlists.watch_alerts(&feed).await;

    feed.publish(ChangeEvent::insert(
        "items",
        json!({"id": "i9", "title": "Calculus Textbook 8th Ed"}),
    ));

    let notice = recv_notice(&mut notices).await;
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(
        notice.message,
        "New item matches your wishlist: \"Calculus Textbook 8th Ed\""
    );
    assert_eq!(notice.link.as_deref(), Some("/item/i9"));
}

#[tokio::test]
async fn rental_request_totals_by_rounded_up_days() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rentals"))
        .and(body_partial_json(json!({
            "item_id": "i1",
            "owner_id": "u2",
            "start_date": "2026-08-01",
            "end_date": "2026-08-04",
            "total_price": 300.0,
            "status": "pending"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([rental_row("r1", "pending")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let rentals = RentalsService::new(backend, Notifier::new());

    let start = chrono::Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
    let end = chrono::Utc.with_ymd_and_hms(2026, 8, 4, 0, 0, 0).unwrap();
    let rental = rentals
        .create_request("i1", "u2", start, end, 100.0)
        .await
        .unwrap();

    assert_eq!(rental.status, RentalStatus::Pending);
    assert_eq!(rental.total_price, 300.0);
}

#[tokio::test]
async fn completed_rental_rejects_further_transitions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/rentals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"status": "completed"}])))
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let rentals = RentalsService::new(backend, Notifier::new());

    let result = rentals.update_status("r1", RentalStatus::Accepted).await;
    assert!(matches!(result, Err(Error::InvalidTransition { .. })));
}

#[tokio::test]
async fn owners_are_notified_of_new_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/rentals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let backend = signed_in_backend(&server);
    let notifier = Notifier::new();
    let mut notices = notifier.listen();
    let rentals = RentalsService::new(backend, notifier);
    let feed = ChangeFeed::new();

    let _guard = rentals.watch(&feed);

    // Addressed to someone else: no notice.
    feed.publish(ChangeEvent::insert("rentals", json!({"owner_id": "u9"})));
    // Addressed to the signed-in user.
    feed.publish(ChangeEvent::insert("rentals", json!({"owner_id": "u1"})));

    let notice = recv_notice(&mut notices).await;
    assert_eq!(notice.message, "New rental request received!");
    assert_eq!(notice.link.as_deref(), Some("/rentals"));
}
