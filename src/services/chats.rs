//! Buyer–seller conversations and their message threads.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Error;
use crate::models::{Chat, Message};
use crate::notify::Notifier;
use crate::postgrest::Condition;
use crate::realtime::{ChangeFeed, ChangeFilter, ChangeKind, WatchGuard};
use crate::Backend;

/// Chat columns plus the item and both profile joins.
const CHAT_WITH_JOINS: &str = "*, item:items(id,title,price,image_url), \
     buyer:profiles!chats_buyer_id_fkey(id,email,avatar_url), \
     seller:profiles!chats_seller_id_fkey(id,email,avatar_url)";

#[derive(Debug, Deserialize)]
struct ChatId {
    id: String,
}

/// Owns the user's chat list.
pub struct ChatsService {
    backend: Arc<Backend>,
    notifier: Notifier,
    chats: RwLock<Vec<Chat>>,
}

impl ChatsService {
    pub fn new(backend: Arc<Backend>, notifier: Notifier) -> Arc<Self> {
        Arc::new(Self {
            backend,
            notifier,
            chats: RwLock::new(Vec::new()),
        })
    }

    /// Chats where the user is buyer or seller, most recent activity first.
    pub async fn chats(&self) -> Vec<Chat> {
        self.chats.read().await.clone()
    }

    /// Refetch the chat list. Background failures are logged only.
    pub async fn refresh(&self) {
        let Some(user_id) = self.backend.auth().user_id() else {
            self.chats.write().await.clear();
            return;
        };

        let result = self
            .backend
            .from("chats")
            .select(CHAT_WITH_JOINS)
            .or_any(&[
                Condition::eq("buyer_id", &user_id),
                Condition::eq("seller_id", &user_id),
            ])
            .order("last_message_at", false)
            .execute::<Chat>()
            .await;

        match result {
            Ok(chats) => *self.chats.write().await = chats,
            Err(err) => warn!(%err, "chat list refresh failed"),
        }
    }

    /// Watch the chats table; any write refetches the list.
    pub fn watch(self: &Arc<Self>, feed: &ChangeFeed) -> WatchGuard {
        let service = self.clone();
        let mut stream = feed.subscribe(
            "chats",
            &[ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete],
            ChangeFilter::Any,
        );
        WatchGuard::new(tokio::spawn(async move {
            while stream.next().await.is_some() {
                service.refresh().await;
            }
        }))
    }

    /// Find or create the chat for (item, current user as buyer, seller).
    /// Idempotent: revisiting an item's message button always lands in the
    /// same thread. Errors propagate to the caller.
    pub async fn get_or_create_chat(&self, item_id: &str, seller_id: &str) -> Result<String, Error> {
        let buyer_id = self.backend.auth().require_user_id()?;

        let existing = self
            .backend
            .from("chats")
            .select("id")
            .eq("item_id", item_id)
            .eq("buyer_id", &buyer_id)
            .eq("seller_id", seller_id)
            .execute_maybe_single::<ChatId>()
            .await?;

        if let Some(chat) = existing {
            return Ok(chat.id);
        }

        let created = self
            .backend
            .from("chats")
            .insert(serde_json::json!({
                "item_id": item_id,
                "buyer_id": buyer_id,
                "seller_id": seller_id,
            }))
            .execute_one::<ChatId>()
            .await?;

        Ok(created.id)
    }

    /// Send a message, then bump the chat's activity timestamp. The two
    /// writes are separate requests; a failure between them leaves the chat
    /// ordering stale until the next message. Errors propagate to the caller.
    pub async fn send_message(
        &self,
        chat_id: &str,
        content: &str,
        receiver_id: &str,
        item_id: &str,
    ) -> Result<(), Error> {
        let sender_id = self.backend.auth().require_user_id()?;

        self.backend
            .from("messages")
            .insert(serde_json::json!({
                "chat_id": chat_id,
                "content": content,
                "sender_id": sender_id,
                "receiver_id": receiver_id,
                "item_id": item_id,
            }))
            .execute_no_return()
            .await?;

        self.backend
            .from("chats")
            .update(serde_json::json!({ "last_message_at": Utc::now().to_rfc3339() }))
            .eq("id", chat_id)
            .execute_no_return()
            .await?;

        Ok(())
    }

    /// Load one chat's history and keep it live: new messages for the chat
    /// are appended as their insert events arrive, without a refetch.
    pub async fn open_thread(
        &self,
        chat_id: &str,
        feed: &ChangeFeed,
    ) -> Result<ChatThread, Error> {
        let history = self
            .backend
            .from("messages")
            .select("*")
            .eq("chat_id", chat_id)
            .order("created_at", true)
            .execute::<Message>()
            .await?;

        let messages = Arc::new(RwLock::new(history));

        let mut stream = feed.subscribe(
            "messages",
            &[ChangeKind::Insert],
            ChangeFilter::Eq("chat_id".to_string(), chat_id.to_string()),
        );
        let appended = messages.clone();
        let guard = WatchGuard::new(tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match serde_json::from_value::<Message>(event.row) {
                    Ok(message) => appended.write().await.push(message),
                    Err(err) => warn!(%err, "unparseable message event"),
                }
            }
        }));

        Ok(ChatThread {
            chat_id: chat_id.to_string(),
            messages,
            _guard: guard,
        })
    }

    /// The notifier shared with the pages consuming this service.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

/// One open conversation: its ordered history plus a live append
/// subscription. Dropping the thread cancels the subscription.
pub struct ChatThread {
    chat_id: String,
    messages: Arc<RwLock<Vec<Message>>>,
    _guard: WatchGuard,
}

impl ChatThread {
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Messages in arrival order, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }
}
