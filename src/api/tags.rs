// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tag endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::MessageResponse;
use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::{StoredTag, TagRepository},
};

/// Public view of a tag.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
}

impl From<&StoredTag> for TagResponse {
    fn from(tag: &StoredTag) -> Self {
        Self {
            id: tag.id.clone(),
            name: tag.name.clone(),
            color: tag.color.clone(),
            bg_color: tag.bg_color.clone(),
            border_color: tag.border_color.clone(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub bg_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagDetailResponse {
    pub success: bool,
    pub data: TagResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagListResponse {
    pub success: bool,
    pub data: Vec<TagResponse>,
}

/// Create a tag for the authenticated user.
#[utoipa::path(
    post,
    path = "/tag/create",
    tag = "Tags",
    security(("bearer" = [])),
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = TagDetailResponse),
        (status = 400, description = "Tag name missing"),
    )
)]
pub async fn create_tag(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagDetailResponse>), ApiError> {
    let Some(name) = request.name.filter(|n| !n.trim().is_empty()) else {
        return Err(ApiError::bad_request("Tag name is required"));
    };

    let tag = StoredTag::new(
        user.user_id,
        name,
        request.color,
        request.bg_color,
        request.border_color,
    );
    TagRepository::new(&state.db).create(&tag)?;

    Ok((
        StatusCode::CREATED,
        Json(TagDetailResponse {
            success: true,
            data: (&tag).into(),
        }),
    ))
}

/// Update a tag owned by the authenticated user.
#[utoipa::path(
    put,
    path = "/tag/update/{id}",
    tag = "Tags",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Tag identifier")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Updated tag", body = TagDetailResponse),
        (status = 404, description = "Tag missing or owned by someone else"),
    )
)]
pub async fn update_tag(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
    Json(request): Json<UpdateTagRequest>,
) -> Result<Json<TagDetailResponse>, ApiError> {
    let repo = TagRepository::new(&state.db);
    let Some(mut tag) = repo.get_owned(&id, &user.user_id)? else {
        return Err(ApiError::not_found("Tag not found or not authorized"));
    };

    if let Some(name) = request.name {
        tag.name = name;
    }
    if let Some(color) = request.color {
        tag.color = Some(color);
    }
    if let Some(bg_color) = request.bg_color {
        tag.bg_color = Some(bg_color);
    }
    if let Some(border_color) = request.border_color {
        tag.border_color = Some(border_color);
    }
    repo.update(&tag)?;

    Ok(Json(TagDetailResponse {
        success: true,
        data: (&tag).into(),
    }))
}

/// Delete a tag owned by the authenticated user.
#[utoipa::path(
    delete,
    path = "/tag/delete/{id}",
    tag = "Tags",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Tag identifier")),
    responses(
        (status = 200, description = "Tag deleted", body = MessageResponse),
        (status = 404, description = "Tag missing or owned by someone else"),
    )
)]
pub async fn delete_tag(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = TagRepository::new(&state.db);
    let Some(tag) = repo.get_owned(&id, &user.user_id)? else {
        return Err(ApiError::not_found("Tag not found or not authorized"));
    };
    repo.delete(&tag)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Tag deleted".to_string(),
    }))
}

/// Fetch one tag owned by the authenticated user.
#[utoipa::path(
    get,
    path = "/tag/detail/{id}",
    tag = "Tags",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Tag identifier")),
    responses(
        (status = 200, description = "The tag", body = TagDetailResponse),
        (status = 404, description = "Tag missing or owned by someone else"),
    )
)]
pub async fn get_tag_by_id(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Json<TagDetailResponse>, ApiError> {
    let Some(tag) = TagRepository::new(&state.db).get_owned(&id, &user.user_id)? else {
        return Err(ApiError::not_found("Tag not found or not authorized"));
    };

    Ok(Json(TagDetailResponse {
        success: true,
        data: (&tag).into(),
    }))
}

/// List the authenticated user's tags.
#[utoipa::path(
    get,
    path = "/tag/all",
    tag = "Tags",
    security(("bearer" = [])),
    responses((status = 200, description = "All tags", body = TagListResponse))
)]
pub async fn get_all_tags(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<TagListResponse>, ApiError> {
    let tags = TagRepository::new(&state.db).list_by_owner(&user.user_id)?;

    Ok(Json(TagListResponse {
        success: true,
        data: tags.iter().map(TagResponse::from).collect(),
    }))
}
