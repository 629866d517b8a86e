use crate::Database;
use crate::models::{MessageRow, OwnedMessageRow, UserActivityRow, UserRow, encode_ts};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use timecapsule_types::models::{Message, MessageStatus};
use timecapsule_types::stats::{MessageCounts, UserCounts};

const MESSAGE_COLUMNS: &str = "m.id, m.owner_id, m.recipient_email, m.encrypted_subject, m.encrypted_body,
     m.delivery_at, m.status, m.created_at, m.delivered_at";

impl Database {
    // -- Users --

    /// Insert the user, or refresh email and name if the id already exists.
    pub fn upsert_user(&self, id: &str, email: &str, name: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name",
                rusqlite::params![id, email, name, encode_ts(Utc::now())],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, name, created_at FROM users WHERE id = ?1",
                [id],
                map_user_row,
            )
            .optional()
        })
    }

    /// Total users, and how many were created at or after `since`.
    pub fn user_counts(&self, since: DateTime<Utc>) -> Result<UserCounts> {
        self.with_conn(|conn| {
            let (total, recent): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COUNT(CASE WHEN created_at >= ?1 THEN 1 END) FROM users",
                [encode_ts(since)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(UserCounts {
                total: total.max(0) as u64,
                recent_week: recent.max(0) as u64,
            })
        })
    }

    /// Newest users first, each with the number of messages they own.
    pub fn recent_users(&self, limit: u32) -> Result<Vec<UserActivityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.name, u.created_at, COUNT(m.id) FROM users u
                 LEFT JOIN messages m ON m.owner_id = u.id
                 GROUP BY u.id
                 ORDER BY u.created_at DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(UserActivityRow {
                        user: map_user_row(row)?,
                        message_count: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages
                    (id, owner_id, recipient_email, encrypted_subject, encrypted_body,
                     delivery_at, status, created_at, delivered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    message.id.to_string(),
                    message.owner_id.to_string(),
                    message.recipient_email,
                    message.encrypted_subject,
                    message.encrypted_body,
                    encode_ts(message.delivery_at),
                    message.status.as_str(),
                    encode_ts(message.created_at),
                    message.delivered_at.map(encode_ts),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM messages m WHERE m.id = ?1", MESSAGE_COLUMNS);
            conn.query_row(&sql, [id], map_message_row).optional()
        })
    }

    /// Scheduled messages due at or before `now`, oldest delivery first.
    pub fn get_due_messages(&self, now: DateTime<Utc>) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_due(conn, now))
    }

    /// Conditional status write: only a SCHEDULED row is updated.
    /// Returns the number of rows changed (0 or 1).
    pub fn update_status(
        &self,
        id: &str,
        status: MessageStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = ?2, delivered_at = ?3
                 WHERE id = ?1 AND status = 'SCHEDULED'",
                rusqlite::params![id, status.as_str(), delivered_at.map(encode_ts)],
            )?;
            Ok(changed)
        })
    }

    /// Delete a message the owner has not received yet.
    pub fn cancel_message(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM messages WHERE id = ?1 AND owner_id = ?2 AND status = 'SCHEDULED'",
                [id, owner_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// FAILED -> SCHEDULED. The only backward transition, admin-triggered.
    pub fn reset_failed(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = 'SCHEDULED' WHERE id = ?1 AND status = 'FAILED'",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Per-status totals, across all users or for one owner.
    pub fn message_counts(&self, owner_id: Option<&str>) -> Result<MessageCounts> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM messages
                 WHERE ?1 IS NULL OR owner_id = ?1
                 GROUP BY status",
            )?;
            let rows = stmt
                .query_map([owner_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut counts = MessageCounts::default();
            for (status, n) in rows {
                let n = n.max(0) as u64;
                match status.parse::<MessageStatus>()? {
                    MessageStatus::Scheduled => counts.scheduled = n,
                    MessageStatus::Delivered => counts.delivered = n,
                    MessageStatus::Failed => counts.failed = n,
                }
            }
            Ok(counts)
        })
    }

    pub fn messages_created_since(&self, since: DateTime<Utc>) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE created_at >= ?1",
                [encode_ts(since)],
                |row| row.get(0),
            )?;
            Ok(n.max(0) as u64)
        })
    }

    pub fn get_timeline(&self, owner_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages m WHERE m.owner_id = ?1 ORDER BY m.delivery_at ASC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Most recently created failures first, with their owners.
    pub fn get_failed_messages(&self, limit: u32) -> Result<Vec<OwnedMessageRow>> {
        self.with_conn(|conn| {
            query_owned(
                conn,
                "WHERE m.status = 'FAILED' ORDER BY m.created_at DESC LIMIT ?1",
                limit,
            )
        })
    }

    /// Most recently created messages of any status, with their owners.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<OwnedMessageRow>> {
        self.with_conn(|conn| query_owned(conn, "ORDER BY m.created_at DESC LIMIT ?1", limit))
    }

    /// Most recent deliveries first, with their owners.
    pub fn recent_deliveries(&self, limit: u32) -> Result<Vec<OwnedMessageRow>> {
        self.with_conn(|conn| {
            query_owned(
                conn,
                "WHERE m.status = 'DELIVERED' ORDER BY m.delivered_at DESC LIMIT ?1",
                limit,
            )
        })
    }
}

/// Messages joined with their owner's email and name in a single query.
fn query_owned(conn: &Connection, filter: &str, limit: u32) -> Result<Vec<OwnedMessageRow>> {
    let sql = format!(
        "SELECT {}, u.email, u.name FROM messages m
         LEFT JOIN users u ON m.owner_id = u.id
         {}",
        MESSAGE_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(OwnedMessageRow {
                message: map_message_row(row)?,
                owner_email: row.get(9)?,
                owner_name: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_due(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<MessageRow>> {
    let sql = format!(
        "SELECT {} FROM messages m
         WHERE m.status = 'SCHEDULED' AND m.delivery_at <= ?1
         ORDER BY m.delivery_at ASC, m.created_at ASC, m.id ASC",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map([encode_ts(now)], map_message_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        recipient_email: row.get(2)?,
        encrypted_subject: row.get(3)?,
        encrypted_body: row.get(4)?,
        delivery_at: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        delivered_at: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
