use sqlx::SqlitePool;

use super::{accounts, now};
use crate::models::{AccountBrief, ChatMessage, ChatMessageDetails};

const CHAT_COLUMNS: &str = "id, sender_id, receiver_id, message, image, read, created_at, updated_at";

pub async fn insert(
    pool: &SqlitePool,
    sender_id: i64,
    receiver_id: i64,
    message: &str,
    image: Option<&str>,
) -> Result<ChatMessage, sqlx::Error> {
    let ts = now();
    sqlx::query_as::<_, ChatMessage>(&format!(
        r#"
        INSERT INTO chats (sender_id, receiver_id, message, image, read, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        RETURNING {CHAT_COLUMNS}
        "#
    ))
    .bind(sender_id)
    .bind(receiver_id)
    .bind(message)
    .bind(image)
    .bind(ts)
    .bind(ts)
    .fetch_one(pool)
    .await
}

/// Messages exchanged between two accounts in either direction, oldest first.
pub async fn conversation(
    pool: &SqlitePool,
    a: i64,
    b: i64,
) -> Result<Vec<ChatMessageDetails>, sqlx::Error> {
    let messages = sqlx::query_as::<_, ChatMessage>(&format!(
        r#"
        SELECT {CHAT_COLUMNS} FROM chats
        WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
        ORDER BY created_at ASC, id ASC
        "#
    ))
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_all(pool)
    .await?;

    let people = accounts::briefs(pool, [a, b]).await?;
    Ok(messages
        .into_iter()
        .map(|message| ChatMessageDetails {
            sender: people.get(&message.sender_id).cloned(),
            receiver: people.get(&message.receiver_id).cloned(),
            message,
        })
        .collect())
}

pub async fn unread_count(pool: &SqlitePool, receiver_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM chats WHERE receiver_id = ? AND read = 0")
        .bind(receiver_id)
        .fetch_one(pool)
        .await
}

/// Mark a message read. Only its receiver may do so; returns `None` when
/// the message does not exist or belongs to someone else.
pub async fn mark_read(
    pool: &SqlitePool,
    id: i64,
    receiver_id: i64,
) -> Result<Option<ChatMessage>, sqlx::Error> {
    sqlx::query_as::<_, ChatMessage>(&format!(
        r#"
        UPDATE chats SET read = 1, updated_at = ?
        WHERE id = ? AND receiver_id = ?
        RETURNING {CHAT_COLUMNS}
        "#
    ))
    .bind(now())
    .bind(id)
    .bind(receiver_id)
    .fetch_optional(pool)
    .await
}

/// Accounts the caller has exchanged messages with.
pub async fn participants(
    pool: &SqlitePool,
    acc_id: i64,
) -> Result<Vec<AccountBrief>, sqlx::Error> {
    sqlx::query_as::<_, AccountBrief>(
        r#"
        SELECT a.id, a.first_name, a.last_name, a.image
        FROM accounts a
        WHERE a.id IN (
            SELECT receiver_id FROM chats WHERE sender_id = ?
            UNION
            SELECT sender_id FROM chats WHERE receiver_id = ?
        )
        AND a.id <> ?
        ORDER BY a.first_name, a.last_name, a.id
        "#,
    )
    .bind(acc_id)
    .bind(acc_id)
    .bind(acc_id)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{create_account, setup_test_db};
    use crate::models::Role;

    #[tokio::test]
    async fn test_conversation_both_directions() {
        let pool = setup_test_db().await;
        let alice = create_account(&pool, "alice@example.com", Role::User).await;
        let bob = create_account(&pool, "bob@example.com", Role::User).await;
        let carol = create_account(&pool, "carol@example.com", Role::User).await;

        insert(&pool, alice.id, bob.id, "Is the tent free?", None).await.unwrap();
        insert(&pool, bob.id, alice.id, "Yes", None).await.unwrap();
        insert(&pool, carol.id, alice.id, "Hello", None).await.unwrap();

        let convo = conversation(&pool, bob.id, alice.id).await.unwrap();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[0].message.message, "Is the tent free?");
        assert_eq!(convo[0].sender.as_ref().unwrap().id, alice.id);
        assert_eq!(convo[1].receiver.as_ref().unwrap().id, alice.id);
    }

    #[tokio::test]
    async fn test_unread_and_mark_read() {
        let pool = setup_test_db().await;
        let alice = create_account(&pool, "alice@example.com", Role::User).await;
        let bob = create_account(&pool, "bob@example.com", Role::User).await;

        let msg = insert(&pool, alice.id, bob.id, "", Some("photo.jpg")).await.unwrap();
        insert(&pool, alice.id, bob.id, "Second", None).await.unwrap();
        assert_eq!(unread_count(&pool, bob.id).await.unwrap(), 2);
        assert_eq!(unread_count(&pool, alice.id).await.unwrap(), 0);

        // The sender cannot mark its own message read.
        assert!(mark_read(&pool, msg.id, alice.id).await.unwrap().is_none());

        let read = mark_read(&pool, msg.id, bob.id).await.unwrap().unwrap();
        assert!(read.read);
        assert_eq!(unread_count(&pool, bob.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_participants() {
        let pool = setup_test_db().await;
        let alice = create_account(&pool, "alice@example.com", Role::User).await;
        let bob = create_account(&pool, "bob@example.com", Role::User).await;
        let carol = create_account(&pool, "carol@example.com", Role::User).await;
        create_account(&pool, "dave@example.com", Role::User).await;

        insert(&pool, alice.id, bob.id, "hi", None).await.unwrap();
        insert(&pool, bob.id, alice.id, "hi back", None).await.unwrap();
        insert(&pool, carol.id, alice.id, "hey", None).await.unwrap();

        let people = participants(&pool, alice.id).await.unwrap();
        let ids: Vec<i64> = people.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&bob.id));
        assert!(ids.contains(&carol.id));
    }
}
