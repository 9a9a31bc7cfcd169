/// Note create/update

use super::{load_current, not_found};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use babycontrol_shared::{
    auth::{
        authorization::{require_baby_in_family, require_family},
        middleware::AuthContext,
    },
    models::note::{Note, NoteInput, NotePatch},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoteRequest {
    pub baby_id: Uuid,
    pub time: DateTime<Utc>,

    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: String,

    #[validate(length(max = 50, message = "Category must be at most 50 characters"))]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateNoteRequest {
    pub time: Option<DateTime<Utc>>,

    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: Option<String>,

    #[validate(length(max = 50, message = "Category must be at most 50 characters"))]
    pub category: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let family_id = require_family(&auth)?;
    req.validate()?;
    require_baby_in_family(&state.db, family_id, req.baby_id).await?;

    let note = Note::create(
        &state.db,
        family_id,
        auth.caretaker_id(),
        NoteInput {
            baby_id: req.baby_id,
            time: req.time,
            content: req.content,
            category: req.category,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<Json<Note>> {
    let family_id = require_family(&auth)?;
    req.validate()?;

    let current: Note = load_current(&state, family_id, id).await?;
    let input = NotePatch {
        time: req.time,
        content: req.content,
        category: req.category,
    }
    .apply(&current);

    let note = Note::replace(&state.db, family_id, id, input)
        .await?
        .ok_or_else(not_found::<Note>)?;

    Ok(Json(note))
}
