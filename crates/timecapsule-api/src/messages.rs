use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use timecapsule_types::api::{
    AckResponse, Claims, CreateMessageRequest, CreateMessageResponse, MessageCountResponse,
    TimelineEntry, TimelineResponse,
};
use timecapsule_types::models::{Message, MessageStatus};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_message;

/// Seal and schedule a message. The recipient defaults to the caller.
pub async fn create_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<CreateMessageResponse>), ApiError> {
    let now = Utc::now();
    let valid = validate_message(&req, now).map_err(ApiError::Validation)?;

    let codec = state.engine.codec();
    let encrypted_subject = codec.encrypt_text(&valid.subject).map_err(ApiError::internal)?;
    let encrypted_body = codec.encrypt_text(&valid.body).map_err(ApiError::internal)?;

    let message = Message {
        id: Uuid::new_v4(),
        owner_id: claims.sub,
        recipient_email: valid.recipient_email.unwrap_or_else(|| claims.email.clone()),
        encrypted_subject,
        encrypted_body,
        delivery_at: valid.delivery_at,
        status: MessageStatus::Scheduled,
        created_at: now,
        delivered_at: None,
    };

    let id = message.id;
    let delivery_at = message.delivery_at;
    state
        .db(move |db| {
            db.upsert_user(&claims.sub.to_string(), &claims.email, claims.name.as_deref())?;
            db.insert_message(&message)
        })
        .await?;

    info!(message_id = %id, %delivery_at, "message scheduled");

    Ok((
        StatusCode::CREATED,
        Json(CreateMessageResponse {
            id,
            delivery_at,
            status: MessageStatus::Scheduled,
            message: "Message scheduled successfully".into(),
        }),
    ))
}

pub async fn message_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageCountResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let counts = state.db(move |db| db.message_counts(Some(&owner))).await?;
    Ok(Json(counts.into()))
}

/// The caller's messages ordered by delivery time. Content stays sealed.
pub async fn timeline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let rows = state.db(move |db| db.get_timeline(&owner)).await?;

    let messages = rows
        .into_iter()
        .map(|row| {
            Message::try_from(row).map(|m| TimelineEntry {
                id: m.id,
                delivery_at: m.delivery_at,
                status: m.status,
                created_at: m.created_at,
                delivered_at: m.delivered_at,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(ApiError::internal)?;

    Ok(Json(TimelineResponse { messages }))
}

/// Only the owner can cancel, and only before delivery is attempted.
pub async fn cancel_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<Uuid>,
) -> Result<Json<AckResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let id = message_id.to_string();
    let deleted = state.db(move |db| db.cancel_message(&id, &owner)).await?;

    if !deleted {
        return Err(ApiError::NotFound("Scheduled message not found"));
    }

    info!(%message_id, "message cancelled");
    Ok(Json(AckResponse {
        message: "Message cancelled".into(),
    }))
}
