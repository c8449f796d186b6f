//! Chat turn handling and the per-user conversation log.
//!
//! A turn is a small state machine: validate, persist the user message,
//! retrieve context, generate, persist the reply. The user message is
//! written before the model is invoked, so it survives a generation
//! failure: the log may legitimately contain a user turn with no reply,
//! marked `error`.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::app::AppContext;
use crate::error::ChatError;
use crate::models::{ChatMessage, ChatRole};
use crate::retrieval;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_REPLIED: &str = "replied";
pub const STATUS_ERROR: &str = "error";

/// System instruction for the storefront assistant.
pub const SYSTEM_PROMPT: &str = "You are Julia, a helpful e-commerce assistant. \
Use the CONTEXT provided to answer the user's question. \
If the context contains 'Product Catalog', use it to find and recommend products. \
If the context contains 'Other Info', use it for general questions. \
Be friendly and concise.";

/// Render the fixed generation prompt. The retrieval context is embedded
/// verbatim.
pub fn build_prompt(context: &str, user_text: &str) -> String {
    format!(
        "<s>[INST] <<SYS>>{}<</SYS>>\nCONTEXT:\n{}\n\nUSER:\n{}\n[/INST]",
        SYSTEM_PROMPT, context, user_text
    )
}

/// Run one chat turn for `user_id`. Returns the generated reply.
///
/// Failure semantics: an empty utterance is rejected before any side
/// effect; a generation failure marks the already-persisted user message
/// `error` and surfaces to the caller with no rollback.
pub async fn handle_turn(
    ctx: &AppContext,
    user_id: &str,
    message: &str,
) -> Result<String, ChatError> {
    let text = message.trim();
    if text.is_empty() {
        return Err(ChatError::EmptyInput);
    }

    let user_msg = append_message(&ctx.pool, user_id, ChatRole::User, text, STATUS_PENDING).await?;

    let context = retrieval::get_context(ctx, text).await;
    let prompt = build_prompt(&context, text);

    let reply = match ctx.generator.generate(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            if let Err(update_err) = set_status(&ctx.pool, &user_msg.id, STATUS_ERROR).await {
                warn!(error = %update_err, "failed to mark message as errored");
            }
            return Err(ChatError::Generation(e.to_string()));
        }
    };

    set_status(&ctx.pool, &user_msg.id, STATUS_REPLIED).await?;
    append_message(&ctx.pool, user_id, ChatRole::Assistant, &reply, STATUS_REPLIED).await?;

    Ok(reply)
}

/// The user's conversation log, oldest first.
pub async fn history(pool: &SqlitePool, user_id: &str) -> Result<Vec<ChatMessage>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, user_id, role, text, status, created_at FROM messages
         WHERE user_id = ? ORDER BY created_at, seq",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let role: String = row.get("role");
            Some(ChatMessage {
                id: row.get("id"),
                user_id: row.get("user_id"),
                role: ChatRole::parse(&role)?,
                text: row.get("text"),
                status: row.get("status"),
                created_at: row.get("created_at"),
            })
        })
        .collect())
}

async fn append_message(
    pool: &SqlitePool,
    user_id: &str,
    role: ChatRole,
    text: &str,
    status: &str,
) -> Result<ChatMessage, sqlx::Error> {
    let message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        role,
        text: text.to_string(),
        status: status.to_string(),
        created_at: Utc::now().timestamp(),
    };

    // seq disambiguates ordering within one timestamp second.
    sqlx::query(
        r#"
        INSERT INTO messages (id, user_id, role, text, status, created_at, seq)
        VALUES (?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM messages))
        "#,
    )
    .bind(&message.id)
    .bind(&message.user_id)
    .bind(message.role.as_str())
    .bind(&message.text)
    .bind(&message.status)
    .bind(message.created_at)
    .execute(pool)
    .await?;

    Ok(message)
}

async fn set_status(pool: &SqlitePool, message_id: &str, status: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE messages SET status = ? WHERE id = ?")
        .bind(status)
        .bind(message_id)
        .execute(pool)
        .await?;
    Ok(())
}
