use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use timecapsule_db::models::{MessageRow, OwnedMessageRow, UserActivityRow};
use timecapsule_engine::PassOutcome;
use timecapsule_types::api::{
    AckResponse, ActivityResponse, AdminStatsResponse, FailedMessageSummary,
    FailedMessagesResponse, MessageActivity, MessageStats, RecentUser, TestEmailRequest,
    TriggerResponse,
};
use timecapsule_types::models::{Message, User};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::is_valid_email;

const FAILED_MESSAGES_LIMIT: u32 = 100;
const MAX_ACTIVITY_LIMIT: u32 = 200;
const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_activity_limit")]
    pub limit: u32,
}

fn default_activity_limit() -> u32 {
    50
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<AdminStatsResponse>, ApiError> {
    let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
    let (users, counts, recent_week) = state
        .db(move |db| {
            Ok((
                db.user_counts(since)?,
                db.message_counts(None)?,
                db.messages_created_since(since)?,
            ))
        })
        .await?;

    Ok(Json(AdminStatsResponse {
        users,
        messages: MessageStats {
            total: counts.total(),
            counts,
            recent_week,
        },
        processor: state.engine.stats(),
    }))
}

/// Newest users, newest messages and latest deliveries, `limit` of each.
pub async fn activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityResponse>, ApiError> {
    let limit = query.limit.clamp(1, MAX_ACTIVITY_LIMIT);
    let (users, messages, deliveries) = state
        .db(move |db| {
            Ok((
                db.recent_users(limit)?,
                db.recent_messages(limit)?,
                db.recent_deliveries(limit)?,
            ))
        })
        .await?;

    Ok(Json(ActivityResponse {
        recent_users: users.into_iter().filter_map(recent_user).collect(),
        recent_messages: messages.into_iter().filter_map(message_activity).collect(),
        recent_deliveries: deliveries.into_iter().filter_map(message_activity).collect(),
    }))
}

/// Run a pass now. Reports `skipped` if one is already in flight.
pub async fn process_messages(State(state): State<AppState>) -> Json<TriggerResponse> {
    info!("manual processing pass requested");
    let response = match state.engine.trigger_now().await {
        PassOutcome::Completed(report) => TriggerResponse::Completed { report },
        PassOutcome::Skipped => TriggerResponse::Skipped,
        PassOutcome::Aborted(e) => TriggerResponse::Aborted {
            error: e.to_string(),
        },
    };
    Json(response)
}

pub async fn failed_messages(
    State(state): State<AppState>,
) -> Result<Json<FailedMessagesResponse>, ApiError> {
    let rows = state
        .db(|db| db.get_failed_messages(FAILED_MESSAGES_LIMIT))
        .await?;

    let failed_messages = rows
        .into_iter()
        .filter_map(|row| {
            let owner_email = row.owner_email;
            decode(row.message).map(|m| FailedMessageSummary {
                id: m.id,
                owner_id: m.owner_id,
                owner_email,
                recipient_email: m.recipient_email,
                delivery_at: m.delivery_at,
                created_at: m.created_at,
            })
        })
        .collect();

    Ok(Json(FailedMessagesResponse { failed_messages }))
}

/// Put a failed message back in the queue for the next pass.
pub async fn retry_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<AckResponse>, ApiError> {
    let id = message_id.to_string();
    let reset = state.db(move |db| db.reset_failed(&id)).await?;

    if !reset {
        return Err(ApiError::NotFound("Failed message not found"));
    }

    info!(%message_id, "failed message rescheduled");
    Ok(Json(AckResponse {
        message: "Message scheduled for retry".into(),
    }))
}

pub async fn test_email(
    State(state): State<AppState>,
    Json(req): Json<TestEmailRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let email = req.email.trim();
    if !is_valid_email(email) {
        return Err(ApiError::Validation(vec!["A valid email is required".into()]));
    }

    state.engine.send_test_email(email).await.map_err(|e| {
        warn!(error = %e, "test email failed");
        ApiError::Upstream(e.to_string())
    })?;

    Ok(Json(AckResponse {
        message: format!("Test email sent to {}", email),
    }))
}

// Unreadable rows are logged and left out of admin listings.

fn decode(row: MessageRow) -> Option<Message> {
    let id = row.id.clone();
    Message::try_from(row)
        .inspect_err(|e| warn!(message_id = %id, error = %e, "skipping corrupt message row"))
        .ok()
}

fn message_activity(row: OwnedMessageRow) -> Option<MessageActivity> {
    let m = decode(row.message)?;
    Some(MessageActivity {
        id: m.id,
        owner_id: m.owner_id,
        owner_email: row.owner_email,
        owner_name: row.owner_name,
        delivery_at: m.delivery_at,
        status: m.status,
        created_at: m.created_at,
        delivered_at: m.delivered_at,
    })
}

fn recent_user(row: UserActivityRow) -> Option<RecentUser> {
    let id = row.user.id.clone();
    let user = User::try_from(row.user)
        .inspect_err(|e| warn!(user_id = %id, error = %e, "skipping corrupt user row"))
        .ok()?;
    Some(RecentUser {
        id: user.id,
        email: user.email,
        name: user.name,
        created_at: user.created_at,
        message_count: row.message_count.max(0) as u64,
    })
}
