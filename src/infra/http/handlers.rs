use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::domain::ids::id_to_uuid;

use super::{HttpState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsParams {
    pub include_pages: Option<bool>,
}

pub async fn list_posts(
    State(state): State<HttpState>,
    Query(params): Query<ListPostsParams>,
) -> Result<Response, ApiError> {
    let include_pages = params.include_pages.unwrap_or(state.include_pages);
    match state.posts.get_all_posts(include_pages).await {
        Some(posts) => Ok(Json(posts).into_response()),
        None => Err(ApiError::unavailable("Post list is unavailable")),
    }
}

pub async fn post_blocks(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(page_id) = id_to_uuid(&id) else {
        return Err(ApiError::bad_request(
            "Invalid page id",
            Some(format!("`{id}` is not a Notion page id")),
        ));
    };

    let record_map = state
        .posts
        .get_post_blocks(&page_id)
        .await
        .map_err(|err| ApiError::upstream("Failed to load post blocks", &err))?;
    Ok(Json(record_map.as_ref()).into_response())
}

pub async fn healthz() -> &'static str {
    "ok"
}
