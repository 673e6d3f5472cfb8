//! Conversation storage using SQLite
//!
//! Provides persistent storage for chat conversations, their messages and
//! the lead/contact state the dashboard works with.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Sqlite};
use std::path::Path;
use std::str::FromStr;

use crate::conversation::{
    Conversation, ConversationDetail, ConversationSummary, Message, Role, VisitorMeta,
};

/// Conversations per dashboard page
pub const PAGE_SIZE: i64 = 20;

/// Errors from the conversation store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Dashboard list filters
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationFilter {
    /// Only conversations flagged as leads
    pub leads_only: bool,
    /// Match on resolution state when set
    pub resolved: Option<bool>,
}

/// One page of dashboard results
#[derive(Debug, Clone, serde::Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ConversationRow {
    id: i64,
    session_id: String,
    visitor_name: Option<String>,
    visitor_email: Option<String>,
    visitor_phone: Option<String>,
    page_url: Option<String>,
    user_agent: Option<String>,
    ip_address: Option<String>,
    is_lead: bool,
    is_resolved: bool,
    admin_notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[sqlx(default)]
    message_count: i64,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            session_id: row.session_id,
            visitor_name: row.visitor_name,
            visitor_email: row.visitor_email,
            visitor_phone: row.visitor_phone,
            page_url: row.page_url,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            is_lead: row.is_lead,
            is_resolved: row.is_resolved,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ConversationRow> for ConversationSummary {
    fn from(row: ConversationRow) -> Self {
        let message_count = row.message_count;
        ConversationSummary {
            conversation: row.into(),
            message_count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            conversation_id: row.conversation_id,
            role: Role::parse(&row.role),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

const CONVERSATION_COLUMNS: &str = "id, session_id, visitor_name, visitor_email, visitor_phone, \
     page_url, user_agent, ip_address, is_lead, is_resolved, admin_notes, created_at, updated_at";

// Fixed-width timestamps so TEXT ordering matches time ordering
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Store for chat conversations and messages
pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    /// Open (or create) the SQLite database at `db_path`
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing
    pub async fn new_in_memory() -> Result<Self, StoreError> {
        // A single connection that never expires, or the database goes with it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL UNIQUE,
                visitor_name TEXT,
                visitor_email TEXT,
                visitor_phone TEXT,
                page_url TEXT,
                user_agent TEXT,
                ip_address TEXT,
                is_lead INTEGER NOT NULL DEFAULT 0,
                is_resolved INTEGER NOT NULL DEFAULT 0,
                admin_notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL
                    REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_conversations_updated
            ON conversations(updated_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up the conversation for `session_id`, creating it if needed.
    ///
    /// Visitor metadata is only written on creation. When two requests race
    /// to create the same session the loser simply reads the winner's row.
    /// Returns the conversation and whether this call created it.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        meta: &VisitorMeta,
    ) -> Result<(Conversation, bool), StoreError> {
        let now = timestamp();

        let inserted = sqlx::query(
            r#"
            INSERT INTO conversations
                (session_id, page_url, user_agent, ip_address, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(&meta.page_url)
        .bind(&meta.user_agent)
        .bind(&meta.ip_address)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;

        let row: ConversationRow = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE session_id = ?",
            CONVERSATION_COLUMNS
        ))
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.into(), inserted))
    }

    /// Append a single message to a conversation
    #[cfg(test)]
    pub async fn append_message(
        &self,
        conversation_id: i64,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError> {
        let mut tx = self.pool.begin().await?;
        let message = insert_message(&mut *tx, conversation_id, role, content).await?;
        touch(&mut *tx, conversation_id).await?;
        tx.commit().await?;
        Ok(message)
    }

    /// Persist one chat turn atomically.
    ///
    /// Appends the visitor message and the bot reply, then records contact
    /// details. Contact columns are only filled while empty and `is_lead`
    /// only ever rises, whatever `conversation` holds.
    pub async fn record_turn(
        &self,
        conversation: &Conversation,
        user_text: &str,
        bot_text: &str,
    ) -> Result<(Message, Message), StoreError> {
        let mut tx = self.pool.begin().await?;

        let user = insert_message(&mut *tx, conversation.id, Role::User, user_text).await?;
        let bot = insert_message(&mut *tx, conversation.id, Role::Bot, bot_text).await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET visitor_email = COALESCE(visitor_email, ?),
                visitor_phone = COALESCE(visitor_phone, ?),
                is_lead = MAX(is_lead, ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&conversation.visitor_email)
        .bind(&conversation.visitor_phone)
        .bind(conversation.is_lead)
        .bind(timestamp())
        .bind(conversation.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((user, bot))
    }

    /// Get a conversation by id
    pub async fn get(&self, id: i64) -> Result<Option<Conversation>, StoreError> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE id = ?",
            CONVERSATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a conversation by session token
    #[cfg(test)]
    pub async fn find_by_session(&self, session_id: &str) -> Result<Option<Conversation>, StoreError> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE session_id = ?",
            CONVERSATION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// All messages in a conversation, oldest first
    pub async fn messages(&self, conversation_id: i64) -> Result<Vec<Message>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM messages
            WHERE conversation_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A conversation with its full history
    pub async fn detail(&self, id: i64) -> Result<Option<ConversationDetail>, StoreError> {
        let Some(conversation) = self.get(id).await? else {
            return Ok(None);
        };
        let messages = self.messages(id).await?;

        Ok(Some(ConversationDetail {
            conversation,
            messages,
        }))
    }

    /// List conversations, most recently active first.
    ///
    /// `page` is 1-based and clamped into the valid range.
    pub async fn list(
        &self,
        filter: ConversationFilter,
        page: i64,
    ) -> Result<Page<ConversationSummary>, StoreError> {
        let resolved = filter.resolved;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM conversations
            WHERE (? = 0 OR is_lead = 1)
              AND (? IS NULL OR is_resolved = ?)
            "#,
        )
        .bind(filter.leads_only)
        .bind(resolved)
        .bind(resolved)
        .fetch_one(&self.pool)
        .await?;

        let total_pages = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
        let page = page.clamp(1, total_pages);

        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = conversations.id)
                    AS message_count
            FROM conversations
            WHERE (? = 0 OR is_lead = 1)
              AND (? IS NULL OR is_resolved = ?)
            ORDER BY updated_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(filter.leads_only)
        .bind(resolved)
        .bind(resolved)
        .bind(PAGE_SIZE)
        .bind((page - 1) * PAGE_SIZE)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            page,
            total_pages,
            total,
        })
    }

    /// Flag a conversation as a lead by hand. Returns false if it doesn't exist.
    pub async fn mark_lead(&self, id: i64) -> Result<bool, StoreError> {
        self.set_flag("is_lead", id).await
    }

    /// Mark a conversation resolved. Returns false if it doesn't exist.
    pub async fn mark_resolved(&self, id: i64) -> Result<bool, StoreError> {
        self.set_flag("is_resolved", id).await
    }

    async fn set_flag(&self, column: &'static str, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE conversations SET {} = 1, updated_at = ? WHERE id = ?",
            column
        ))
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace staff notes and the visitor's name
    pub async fn save_notes(
        &self,
        id: i64,
        admin_notes: &str,
        visitor_name: &str,
    ) -> Result<bool, StoreError> {
        let visitor_name = Some(visitor_name.trim()).filter(|n| !n.is_empty());

        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET admin_notes = ?, visitor_name = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(admin_notes)
        .bind(visitor_name)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a conversation and all its messages
    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_message<'e, E>(
    executor: E,
    conversation_id: i64,
    role: Role,
    content: &str,
) -> Result<Message, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: MessageRow = sqlx::query_as(
        r#"
        INSERT INTO messages (conversation_id, role, content, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, conversation_id, role, content, created_at
        "#,
    )
    .bind(conversation_id)
    .bind(role.as_str())
    .bind(content)
    .bind(timestamp())
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

#[cfg(test)]
async fn touch<'e, E>(executor: E, conversation_id: i64) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
        .bind(timestamp())
        .bind(conversation_id)
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> ConversationStore {
        ConversationStore::new_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = store().await;
        let meta = VisitorMeta {
            page_url: Some("https://kaffero.online/pricing/".into()),
            user_agent: Some("test-agent".into()),
            ip_address: Some("10.0.0.1".into()),
        };

        let (first, created) = store.get_or_create("sess-1", &meta).await.unwrap();
        assert!(created);
        assert!(!first.is_lead);
        assert!(!first.is_resolved);
        assert_eq!(first.page_url.as_deref(), Some("https://kaffero.online/pricing/"));

        // Metadata is only captured on creation
        let (second, created) = store
            .get_or_create("sess-1", &VisitorMeta::default())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test]
    async fn test_messages_keep_insertion_order() {
        let store = store().await;
        let (conv, _) = store.get_or_create("sess", &VisitorMeta::default()).await.unwrap();

        store.append_message(conv.id, Role::User, "Hello").await.unwrap();
        store.append_message(conv.id, Role::Bot, "Hi there!").await.unwrap();
        store.append_message(conv.id, Role::User, "Pricing?").await.unwrap();

        let messages = store.messages(conv.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["Hello", "Hi there!", "Pricing?"]);
        assert_eq!(messages[1].role, Role::Bot);
        assert!(messages[0].created_at <= messages[2].created_at);
    }

    #[tokio::test]
    async fn test_messages_ignore_clock_steps() {
        let store = store().await;
        let (conv, _) = store.get_or_create("sess", &VisitorMeta::default()).await.unwrap();

        store.record_turn(&conv, "hello", "Hi there!").await.unwrap();

        // Written after the first turn but stamped earlier, as after a clock step back
        sqlx::query(
            "INSERT INTO messages (conversation_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(conv.id)
        .bind(Role::User.as_str())
        .bind("pricing?")
        .bind("2000-01-01T00:00:00.000000Z")
        .execute(&store.pool)
        .await
        .unwrap();

        let messages = store.messages(conv.id).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hello", "Hi there!", "pricing?"]);
    }

    #[tokio::test]
    async fn test_record_turn_never_clears_contact() {
        let store = store().await;
        let (mut conv, _) = store.get_or_create("sess", &VisitorMeta::default()).await.unwrap();

        conv.visitor_email = Some("owner@mycafe.com".into());
        conv.is_lead = true;
        store.record_turn(&conv, "owner@mycafe.com", "ok").await.unwrap();

        // A stale copy must not undo what was recorded
        let mut stale = conv.clone();
        stale.visitor_email = Some("other@cafe.in".into());
        stale.is_lead = false;
        store.record_turn(&stale, "again", "ok").await.unwrap();

        let saved = store.get(conv.id).await.unwrap().unwrap();
        assert_eq!(saved.visitor_email.as_deref(), Some("owner@mycafe.com"));
        assert!(saved.is_lead);
        assert_eq!(store.messages(conv.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let store = store().await;
        let (a, _) = store.get_or_create("a", &VisitorMeta::default()).await.unwrap();
        let (b, _) = store.get_or_create("b", &VisitorMeta::default()).await.unwrap();
        store.get_or_create("c", &VisitorMeta::default()).await.unwrap();

        store.append_message(a.id, Role::User, "hi").await.unwrap();
        store.append_message(a.id, Role::Bot, "hello").await.unwrap();
        assert!(store.mark_lead(a.id).await.unwrap());
        assert!(store.mark_resolved(b.id).await.unwrap());

        let all = store.list(ConversationFilter::default(), 1).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items.len(), 3);

        let leads = store
            .list(ConversationFilter { leads_only: true, resolved: None }, 1)
            .await
            .unwrap();
        assert_eq!(leads.total, 1);
        assert_eq!(leads.items[0].conversation.id, a.id);
        assert_eq!(leads.items[0].message_count, 2);

        let resolved = store
            .list(ConversationFilter { leads_only: false, resolved: Some(true) }, 1)
            .await
            .unwrap();
        assert_eq!(resolved.total, 1);
        assert_eq!(resolved.items[0].conversation.id, b.id);

        let open = store
            .list(ConversationFilter { leads_only: false, resolved: Some(false) }, 1)
            .await
            .unwrap();
        assert_eq!(open.total, 2);
    }

    #[tokio::test]
    async fn test_list_pages_clamp() {
        let store = store().await;
        for i in 0..(PAGE_SIZE + 5) {
            store
                .get_or_create(&format!("sess-{i}"), &VisitorMeta::default())
                .await
                .unwrap();
        }

        let first = store.list(ConversationFilter::default(), 0).await.unwrap();
        assert_eq!(first.page, 1);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.items.len() as i64, PAGE_SIZE);

        let last = store.list(ConversationFilter::default(), 99).await.unwrap();
        assert_eq!(last.page, 2);
        assert_eq!(last.items.len(), 5);
    }

    #[tokio::test]
    async fn test_save_notes_and_delete() {
        let store = store().await;
        let (conv, _) = store.get_or_create("sess", &VisitorMeta::default()).await.unwrap();
        store.append_message(conv.id, Role::User, "hello").await.unwrap();

        assert!(store.save_notes(conv.id, "called back", "Anu").await.unwrap());
        let saved = store.get(conv.id).await.unwrap().unwrap();
        assert_eq!(saved.admin_notes, "called back");
        assert_eq!(saved.visitor_name.as_deref(), Some("Anu"));

        assert!(store.delete(conv.id).await.unwrap());
        assert!(store.get(conv.id).await.unwrap().is_none());
        assert!(store.messages(conv.id).await.unwrap().is_empty());
        assert!(store.find_by_session("sess").await.unwrap().is_none());

        assert!(!store.delete(conv.id).await.unwrap());
        assert!(!store.mark_resolved(conv.id).await.unwrap());
        assert!(!store.save_notes(conv.id, "", "").await.unwrap());
    }
}
