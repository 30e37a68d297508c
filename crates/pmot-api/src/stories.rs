use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use pmot_types::api::{MessageResponse, StoryQuery, StoryRequest};
use pmot_types::models::Story;

use crate::authz::{self, Page, StoryDraft};
use crate::middleware::Identity;
use crate::{ApiError, AppState, blocking};

/// POST /stories/: quota-checked.
pub async fn create_story(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Json(req), _): WithRejection<Json<StoryRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = StoryDraft::from(req);
    let story = blocking(&state, move |s| authz::create_story(&s.db, &identity, &draft)).await?;
    Ok((StatusCode::CREATED, Json(story)))
}

/// GET /stories/?skip=&limit=
pub async fn list_stories(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Query(query), _): WithRejection<Query<StoryQuery>, ApiError>,
) -> Result<Json<Vec<Story>>, ApiError> {
    let page = Page::from(&query);
    let stories = blocking(&state, move |s| authz::list_stories(&s.db, &identity, page)).await?;
    Ok(Json(stories))
}

/// GET /stories/{story_id}
pub async fn get_story(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Path(story_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Story>, ApiError> {
    let story = blocking(&state, move |s| authz::get_story(&s.db, &identity, story_id)).await?;
    Ok(Json(story))
}

/// PUT /stories/{story_id}: full replacement, media links included.
pub async fn update_story(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Path(story_id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<StoryRequest>, ApiError>,
) -> Result<Json<Story>, ApiError> {
    let draft = StoryDraft::from(req);
    let story = blocking(&state, move |s| {
        authz::update_story(&s.db, &identity, story_id, &draft)
    })
    .await?;
    Ok(Json(story))
}

/// DELETE /stories/{story_id}
pub async fn delete_story(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    WithRejection(Path(story_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |s| authz::delete_story(&s.db, &identity, story_id)).await?;
    Ok(Json(MessageResponse {
        message: "Story deleted".to_string(),
    }))
}
