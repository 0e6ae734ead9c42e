// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod entries;
pub mod health;
pub mod tags;
pub mod users;

/// Multipart bodies can carry several 5 MB attachments; the per-file rule
/// is enforced in the entry handlers.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Plain acknowledgement envelope shared by delete-style endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/user/signup", post(users::signup))
        .route("/user/login", post(users::login))
        .route("/user/refresh-token", post(users::refresh_token))
        .route("/entry/create", post(entries::create_entry))
        .route("/entry/all", get(entries::get_all_entries))
        .route("/entry/detail/{id}", get(entries::get_entry_by_id))
        .route("/entry/update/{id}", put(entries::update_entry))
        .route("/entry/delete/{id}", delete(entries::delete_entry))
        .route("/entry/getBy/{tagname}", get(entries::get_entries_by_tag))
        .route("/entry/ai-advice", post(entries::ai_advice))
        .route("/entry/fix-grammar", post(entries::fix_grammar))
        .route("/entry/upload", post(entries::upload_files))
        .route("/tag/create", post(tags::create_tag))
        .route("/tag/update/{id}", put(tags::update_tag))
        .route("/tag/delete/{id}", delete(tags::delete_tag))
        .route("/tag/detail/{id}", get(tags::get_tag_by_id))
        .route("/tag/all", get(tags::get_all_tags))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::signup,
        users::login,
        users::refresh_token,
        entries::create_entry,
        entries::get_all_entries,
        entries::get_entry_by_id,
        entries::update_entry,
        entries::delete_entry,
        entries::get_entries_by_tag,
        entries::ai_advice,
        entries::fix_grammar,
        entries::upload_files,
        tags::create_tag,
        tags::update_tag,
        tags::delete_tag,
        tags::get_tag_by_id,
        tags::get_all_tags
    ),
    components(
        schemas(
            health::HealthResponse,
            health::HealthChecks,
            health::ReadyResponse,
            users::SignupRequest,
            users::LoginRequest,
            users::RefreshRequest,
            users::UserResponse,
            users::AuthResponse,
            users::RefreshResponse,
            entries::EntryResponse,
            entries::EntryListResponse,
            entries::EntryDetailResponse,
            entries::EntriesByTagResponse,
            entries::CreateEntryResponse,
            entries::UpdateEntryRequest,
            entries::UploadFailure,
            entries::AiRequest,
            entries::AiResponse,
            entries::UploadResponse,
            tags::TagResponse,
            tags::CreateTagRequest,
            tags::UpdateTagRequest,
            tags::TagDetailResponse,
            tags::TagListResponse,
            MessageResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health probes"),
        (name = "Users", description = "Signup, login and session renewal"),
        (name = "Entries", description = "Journal entry management"),
        (name = "Tags", description = "Tag management")
    )
)]
struct ApiDoc;
