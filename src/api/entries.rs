// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entry endpoints: CRUD, listing, AI assistance and attachment upload.
//!
//! Entry creation is multipart (`content`, `selectedTags`, repeated `files`
//! fields). File rules are enforced here at the boundary: JPEG, PNG, GIF or
//! WEBP, 5 MB per file, and any violation fails the whole request before
//! business logic runs. Upstream failures degrade instead: an entry is still
//! created when the AI provider or the CDN is down, with empty advice text
//! or a per-file error list.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use super::tags::TagResponse;
use super::MessageResponse;
use crate::{
    auth::Auth,
    error::ApiError,
    providers::AdviceOutcome,
    state::AppState,
    storage::{EntryRepository, StoredEntry, TagRepository},
};

/// Per-file ceiling enforced at the boundary (5 MB).
const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Image types accepted for attachment upload.
const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Page size used when the client does not send `limit`.
const DEFAULT_PAGE_LIMIT: usize = 4;

/// Public view of an entry, with tag references resolved to full tags.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: String,
    pub content: String,
    pub ai_content: String,
    pub is_pinned: bool,
    pub files: Vec<String>,
    pub tags: Vec<TagResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Case-insensitive substring filter on entry content
    pub searchvalue: Option<String>,
    /// Entries to skip after filtering and sorting
    pub skip: Option<usize>,
    /// Page size; defaults to 4
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryListResponse {
    pub success: bool,
    pub data: Vec<EntryResponse>,
    /// Matching entries before pagination
    pub total_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntryDetailResponse {
    pub success: bool,
    pub data: EntryResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntriesByTagResponse {
    pub success: bool,
    pub data: Vec<EntryResponse>,
}

/// One attachment that could not be stored.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFailure {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryResponse {
    pub success: bool,
    pub data: EntryResponse,
    pub message: String,
    /// `null` when every attachment was stored
    pub upload_errors: Option<Vec<UploadFailure>>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub ai_content: Option<String>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AiRequest {
    pub content: String,
}

/// AI endpoint envelope: `error` distinguishes the model refusing the
/// input (still HTTP 200) from usable output in `data`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AiResponse {
    pub success: bool,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub data: Vec<String>,
}

/// One file lifted out of a multipart body, already validated.
struct IncomingFile {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

// ============================================================
// Handlers
// ============================================================

/// Create an entry from a multipart form.
#[utoipa::path(
    post,
    path = "/entry/create",
    tag = "Entries",
    security(("bearer" = [])),
    request_body(content = String, content_type = "multipart/form-data",
        description = "Form fields: `content`, `selectedTags` (JSON array of tag ids), repeated `files`"),
    responses(
        (status = 201, description = "Entry created", body = CreateEntryResponse),
        (status = 400, description = "Missing content or invalid attachment"),
    )
)]
pub async fn create_entry(
    State(state): State<AppState>,
    Auth(user): Auth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreateEntryResponse>), ApiError> {
    let form = parse_entry_form(multipart).await?;
    let Some(content) = form.content.filter(|c| !c.trim().is_empty()) else {
        return Err(ApiError::bad_request("Content is required"));
    };

    let selected = parse_selected_tags(form.selected_tags.as_deref())?;
    let tags = resolve_owned_tags(&state, &user.user_id, selected)?;

    let (files, upload_errors) = store_attachments(&state, form.files).await;
    let ai_content = advice_or_empty(&state, &content).await;

    let entry = StoredEntry::new(user.user_id.clone(), content, ai_content, tags, files);
    EntryRepository::new(&state.db).create(&entry)?;

    let data = populate_entry(&state, &user.user_id, &entry)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateEntryResponse {
            success: true,
            data,
            message: "Entry created successfully".to_string(),
            upload_errors: if upload_errors.is_empty() {
                None
            } else {
                Some(upload_errors)
            },
        }),
    ))
}

/// List the authenticated user's entries, filtered, sorted and paginated.
#[utoipa::path(
    get,
    path = "/entry/all",
    tag = "Entries",
    security(("bearer" = [])),
    params(ListQuery),
    responses((status = 200, description = "A page of entries", body = EntryListResponse))
)]
pub async fn get_all_entries(
    State(state): State<AppState>,
    Auth(user): Auth,
    Query(query): Query<ListQuery>,
) -> Result<Json<EntryListResponse>, ApiError> {
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    let (entries, total_count) = EntryRepository::new(&state.db).list_page(
        &user.user_id,
        query.searchvalue.as_deref(),
        skip,
        limit,
    )?;

    let mut data = Vec::with_capacity(entries.len());
    for entry in &entries {
        data.push(populate_entry(&state, &user.user_id, entry)?);
    }

    Ok(Json(EntryListResponse {
        success: true,
        data,
        total_count,
    }))
}

/// Fetch one entry owned by the authenticated user.
#[utoipa::path(
    get,
    path = "/entry/detail/{id}",
    tag = "Entries",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Entry identifier")),
    responses(
        (status = 200, description = "The entry", body = EntryDetailResponse),
        (status = 404, description = "Entry missing or owned by someone else"),
    )
)]
pub async fn get_entry_by_id(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Json<EntryDetailResponse>, ApiError> {
    let Some(entry) = EntryRepository::new(&state.db).get_owned(&id, &user.user_id)? else {
        return Err(ApiError::not_found("Entry not found or not authorized"));
    };

    let data = populate_entry(&state, &user.user_id, &entry)?;
    Ok(Json(EntryDetailResponse {
        success: true,
        data,
    }))
}

/// Update an entry owned by the authenticated user.
#[utoipa::path(
    put,
    path = "/entry/update/{id}",
    tag = "Entries",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Entry identifier")),
    request_body = UpdateEntryRequest,
    responses(
        (status = 200, description = "Updated entry", body = EntryDetailResponse),
        (status = 404, description = "Entry missing or owned by someone else"),
    )
)]
pub async fn update_entry(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
    Json(request): Json<UpdateEntryRequest>,
) -> Result<Json<EntryDetailResponse>, ApiError> {
    let repo = EntryRepository::new(&state.db);
    let Some(mut entry) = repo.get_owned(&id, &user.user_id)? else {
        return Err(ApiError::not_found("Entry not found or not authorized"));
    };

    if let Some(content) = request.content {
        entry.content = content;
    }
    if let Some(ai_content) = request.ai_content {
        entry.ai_content = ai_content;
    }
    if let Some(is_pinned) = request.is_pinned {
        entry.is_pinned = is_pinned;
    }
    if let Some(tags) = request.tags {
        entry.tags = resolve_owned_tags(&state, &user.user_id, tags)?;
    }
    if let Some(files) = request.files {
        entry.files = files;
    }
    entry.updated_at = Utc::now();
    repo.update(&entry)?;

    let data = populate_entry(&state, &user.user_id, &entry)?;
    Ok(Json(EntryDetailResponse {
        success: true,
        data,
    }))
}

/// Delete an entry owned by the authenticated user.
#[utoipa::path(
    delete,
    path = "/entry/delete/{id}",
    tag = "Entries",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Entry identifier")),
    responses(
        (status = 200, description = "Entry deleted", body = MessageResponse),
        (status = 404, description = "Entry missing or owned by someone else"),
    )
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let repo = EntryRepository::new(&state.db);
    let Some(entry) = repo.get_owned(&id, &user.user_id)? else {
        return Err(ApiError::not_found("Entry not found or not authorized"));
    };
    repo.delete(&entry)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Entry deleted".to_string(),
    }))
}

/// List the authenticated user's entries carrying a tag, by tag name.
#[utoipa::path(
    get,
    path = "/entry/getBy/{tagname}",
    tag = "Entries",
    security(("bearer" = [])),
    params(("tagname" = String, Path, description = "Exact tag name")),
    responses(
        (status = 200, description = "Entries carrying the tag", body = EntriesByTagResponse),
        (status = 404, description = "No tag with that name"),
    )
)]
pub async fn get_entries_by_tag(
    State(state): State<AppState>,
    Auth(user): Auth,
    Path(tagname): Path<String>,
) -> Result<Json<EntriesByTagResponse>, ApiError> {
    let Some(tag) = TagRepository::new(&state.db).find_by_name(&user.user_id, &tagname)? else {
        return Err(ApiError::not_found("Tag not found"));
    };

    let entries = EntryRepository::new(&state.db).list_by_tag(&user.user_id, &tag.id)?;
    let mut data = Vec::with_capacity(entries.len());
    for entry in &entries {
        data.push(populate_entry(&state, &user.user_id, entry)?);
    }

    Ok(Json(EntriesByTagResponse {
        success: true,
        data,
    }))
}

/// Generate advice for a piece of content.
#[utoipa::path(
    post,
    path = "/entry/ai-advice",
    tag = "Entries",
    security(("bearer" = [])),
    request_body = AiRequest,
    responses((status = 200, description = "Advice or the model's refusal", body = AiResponse))
)]
pub async fn ai_advice(
    State(state): State<AppState>,
    Auth(_user): Auth,
    Json(request): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    let advice = state
        .advice
        .as_ref()
        .ok_or_else(|| ApiError::internal("AI advice requested but GEMINI_API_KEY is not set"))?;

    match advice.advice(&request.content).await {
        Ok(AdviceOutcome::Text(text)) => Ok(Json(AiResponse {
            success: true,
            error: false,
            data: Some(strip_paragraph_wrapper(&text)),
            message: None,
        })),
        Ok(AdviceOutcome::Refused(message)) => Ok(Json(AiResponse {
            success: true,
            error: true,
            data: None,
            message: Some(message),
        })),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

/// Proofread a piece of content.
#[utoipa::path(
    post,
    path = "/entry/fix-grammar",
    tag = "Entries",
    security(("bearer" = [])),
    request_body = AiRequest,
    responses((status = 200, description = "Corrected text or the model's refusal", body = AiResponse))
)]
pub async fn fix_grammar(
    State(state): State<AppState>,
    Auth(_user): Auth,
    Json(request): Json<AiRequest>,
) -> Result<Json<AiResponse>, ApiError> {
    let advice = state
        .advice
        .as_ref()
        .ok_or_else(|| ApiError::internal("Grammar fix requested but GEMINI_API_KEY is not set"))?;

    match advice.fix_grammar(&request.content).await {
        // The "Corrected:" prefix is part of the contract and is kept
        Ok(AdviceOutcome::Text(text)) => Ok(Json(AiResponse {
            success: true,
            error: false,
            data: Some(text),
            message: None,
        })),
        Ok(AdviceOutcome::Refused(message)) => Ok(Json(AiResponse {
            success: true,
            error: true,
            data: None,
            message: Some(message),
        })),
        Err(e) => Err(ApiError::internal(e.to_string())),
    }
}

/// Upload attachments without creating an entry.
///
/// Partial success is a 200 with the stored URLs; only a fully failed
/// batch is an error.
#[utoipa::path(
    post,
    path = "/entry/upload",
    tag = "Entries",
    security(("bearer" = [])),
    request_body(content = String, content_type = "multipart/form-data",
        description = "Repeated `files` fields, one per attachment"),
    responses(
        (status = 200, description = "CDN URLs of the stored files", body = UploadResponse),
        (status = 400, description = "No files or an invalid attachment"),
        (status = 500, description = "Every upload failed"),
    )
)]
pub async fn upload_files(
    State(state): State<AppState>,
    Auth(_user): Auth,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let files = parse_upload_form(multipart).await?;
    if files.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let mut urls = Vec::new();
    if let Some(uploads) = &state.uploads {
        for file in files {
            match uploads
                .upload(&file.name, &file.content_type, file.bytes)
                .await
            {
                Ok(uploaded) => urls.push(uploaded.cdn_url),
                Err(e) => warn!(file_name = %file.name, error = %e, "file upload failed"),
            }
        }
    }

    if urls.is_empty() {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "All file uploads failed",
        ));
    }

    Ok(Json(UploadResponse {
        success: true,
        data: urls,
    }))
}

// ============================================================
// Multipart parsing and boundary rules
// ============================================================

struct CreateEntryForm {
    content: Option<String>,
    selected_tags: Option<String>,
    files: Vec<IncomingFile>,
}

async fn parse_entry_form(mut multipart: Multipart) -> Result<CreateEntryForm, ApiError> {
    let mut form = CreateEntryForm {
        content: None,
        selected_tags: None,
        files: Vec::new(),
    };

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => form.content = Some(field_text(field).await?),
            "selectedTags" => form.selected_tags = Some(field_text(field).await?),
            "files" => form.files.push(read_file_field(field).await?),
            _ => {}
        }
    }
    Ok(form)
}

async fn parse_upload_form(mut multipart: Multipart) -> Result<Vec<IncomingFile>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() == Some("files") {
            files.push(read_file_field(field).await?);
        }
    }
    Ok(files)
}

async fn next_field(
    multipart: &mut Multipart,
) -> Result<Option<axum::extract::multipart::Field<'_>>, ApiError> {
    multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))
}

/// Read one file field and apply the boundary rules.
///
/// A violation rejects the whole request; nothing has been stored yet at
/// this point.
async fn read_file_field(field: axum::extract::multipart::Field<'_>) -> Result<IncomingFile, ApiError> {
    let name = field.file_name().unwrap_or("file").to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();

    if !ALLOWED_MIME_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::bad_request(
            "Invalid file type. Only JPEG, PNG, GIF and WEBP are allowed.",
        ));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?;
    if bytes.len() > MAX_FILE_BYTES {
        return Err(ApiError::bad_request(
            "File too large. The limit is 5 MB per file.",
        ));
    }

    Ok(IncomingFile {
        name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

// ============================================================
// Helpers
// ============================================================

/// Push every attachment to the CDN, degrading failures to an error list.
async fn store_attachments(
    state: &AppState,
    files: Vec<IncomingFile>,
) -> (Vec<String>, Vec<UploadFailure>) {
    let mut urls = Vec::new();
    let mut failures = Vec::new();

    for file in files {
        match &state.uploads {
            Some(uploads) => match uploads
                .upload(&file.name, &file.content_type, file.bytes)
                .await
            {
                Ok(uploaded) => urls.push(uploaded.cdn_url),
                Err(e) => {
                    warn!(file_name = %file.name, error = %e, "attachment upload failed");
                    failures.push(UploadFailure {
                        file_name: file.name,
                        error: e.to_string(),
                    });
                }
            },
            None => failures.push(UploadFailure {
                file_name: file.name,
                error: "File uploads are not configured".to_string(),
            }),
        }
    }

    (urls, failures)
}

/// Generate advice for a new entry, or fall back to empty text.
///
/// Refusals and provider failures both degrade; entry creation never
/// fails because of the AI provider.
async fn advice_or_empty(state: &AppState, content: &str) -> String {
    let Some(advice) = &state.advice else {
        return String::new();
    };
    match advice.advice(content).await {
        Ok(AdviceOutcome::Text(text)) => text,
        Ok(AdviceOutcome::Refused(_)) => String::new(),
        Err(e) => {
            warn!(error = %e, "advice generation failed; storing entry without it");
            String::new()
        }
    }
}

fn parse_selected_tags(raw: Option<&str>) -> Result<Vec<String>, ApiError> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|_| ApiError::bad_request("selectedTags must be a JSON array of tag ids")),
    }
}

/// Keep only tag ids that resolve to tags owned by the user, dropping
/// duplicates and anything unknown or foreign.
fn resolve_owned_tags(
    state: &AppState,
    user_id: &str,
    tag_ids: Vec<String>,
) -> Result<Vec<String>, ApiError> {
    let repo = TagRepository::new(&state.db);
    let mut kept = Vec::new();
    for id in tag_ids {
        if kept.contains(&id) {
            continue;
        }
        if repo.get_owned(&id, user_id)?.is_some() {
            kept.push(id);
        }
    }
    Ok(kept)
}

/// Resolve an entry's tag references into full tags for the response.
fn populate_entry(
    state: &AppState,
    user_id: &str,
    entry: &StoredEntry,
) -> Result<EntryResponse, ApiError> {
    let repo = TagRepository::new(&state.db);
    let mut tags = Vec::new();
    for tag_id in &entry.tags {
        if let Some(tag) = repo.get_owned(tag_id, user_id)? {
            tags.push(TagResponse::from(&tag));
        }
    }

    Ok(EntryResponse {
        id: entry.id.clone(),
        content: entry.content.clone(),
        ai_content: entry.ai_content.clone(),
        is_pinned: entry.is_pinned,
        files: entry.files.clone(),
        tags,
        created_at: entry.created_at,
        updated_at: entry.updated_at,
    })
}

/// Strip a single wrapping `<p>…</p>` from generated advice.
///
/// Only fires when the trimmed text both starts and ends with the wrapper;
/// anything else passes through unchanged.
fn strip_paragraph_wrapper(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
    {
        Some(inner) => inner.to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, TokenService};
    use crate::storage::{Database, StoredTag, StoredUser, UserRepository};
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use std::sync::Arc;

    const BOUNDARY: &str = "test-boundary";

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.redb")).unwrap();
        let tokens = TokenService::new("access-secret", "refresh-secret", 3600, 604_800);
        (AppState::new(Arc::new(db), tokens), dir)
    }

    fn caller(user_id: &str) -> Auth {
        Auth(AuthenticatedUser {
            user_id: user_id.to_string(),
            email: format!("{user_id}@x.com"),
        })
    }

    fn seed_tag(state: &AppState, user_id: &str, name: &str) -> StoredTag {
        let tag = StoredTag::new(user_id.to_string(), name.to_string(), None, None, None);
        TagRepository::new(&state.db).create(&tag).unwrap();
        tag
    }

    fn seed_entry(state: &AppState, user_id: &str, content: &str) -> StoredEntry {
        let entry = StoredEntry::new(
            user_id.to_string(),
            content.to_string(),
            String::new(),
            vec![],
            vec![],
        );
        EntryRepository::new(&state.db).create(&entry).unwrap();
        entry
    }

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .into_bytes()
    }

    fn file_part(file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(bytes);
        part.extend_from_slice(b"\r\n");
        part
    }

    async fn multipart_of(parts: Vec<Vec<u8>>) -> Multipart {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(&part);
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn create_stores_content_and_keeps_only_owned_tags() {
        let (state, _dir) = test_state();
        let tag = seed_tag(&state, "user-1", "work");
        let foreign = seed_tag(&state, "user-2", "theirs");

        let selected = format!(r#"["{}","{}","ghost-id"]"#, tag.id, foreign.id);
        let multipart = multipart_of(vec![
            text_part("content", "<p>standup notes</p>"),
            text_part("selectedTags", &selected),
        ])
        .await;

        let (status, Json(body)) = create_entry(State(state.clone()), caller("user-1"), multipart)
            .await
            .expect("entry creation succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert!(body.success);
        assert_eq!(body.message, "Entry created successfully");
        assert!(body.upload_errors.is_none());
        assert_eq!(body.data.content, "<p>standup notes</p>");
        assert_eq!(body.data.ai_content, "");
        assert_eq!(body.data.tags.len(), 1);
        assert_eq!(body.data.tags[0].name, "work");
    }

    #[tokio::test]
    async fn create_requires_content() {
        let (state, _dir) = test_state();
        let multipart = multipart_of(vec![text_part("selectedTags", "[]")]).await;

        let err = create_entry(State(state.clone()), caller("user-1"), multipart)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Content is required");
    }

    #[tokio::test]
    async fn create_rejects_malformed_selected_tags() {
        let (state, _dir) = test_state();
        let multipart = multipart_of(vec![
            text_part("content", "notes"),
            text_part("selectedTags", "not-json"),
        ])
        .await;

        let err = create_entry(State(state.clone()), caller("user-1"), multipart)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_disallowed_file_types() {
        let (state, _dir) = test_state();
        let multipart = multipart_of(vec![
            text_part("content", "notes"),
            file_part("doc.pdf", "application/pdf", b"%PDF-1.4"),
        ])
        .await;

        let err = create_entry(State(state.clone()), caller("user-1"), multipart)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.starts_with("Invalid file type"));
    }

    #[tokio::test]
    async fn create_rejects_oversized_files() {
        use tower::Service;

        let (state, _dir) = test_state();
        let user = StoredUser::new(
            "a@x.com".to_string(),
            "Ada".to_string(),
            "Lovelace".to_string(),
            "hash".to_string(),
        );
        UserRepository::new(&state.db).create(&user).unwrap();
        let pair = state.tokens.issue(&state.db, &user).unwrap();

        // A 5 MB+ body exceeds the stock extractor cap, so this one goes
        // through the router, which raises the body limit.
        let oversized = vec![0u8; MAX_FILE_BYTES + 1];
        let mut body = Vec::new();
        body.extend_from_slice(&text_part("content", "notes"));
        body.extend_from_slice(&file_part("big.png", "image/png", &oversized));
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/entry/create")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header("authorization", format!("Bearer {}", pair.access_token))
            .body(Body::from(body))
            .unwrap();

        let mut app = crate::api::router(state);
        let response = app.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("File too large"));
    }

    #[tokio::test]
    async fn create_without_upload_client_degrades_to_an_error_list() {
        let (state, _dir) = test_state();
        let multipart = multipart_of(vec![
            text_part("content", "notes"),
            file_part("pic.jpg", "image/jpeg", b"\xFF\xD8\xFF\xE0 fake"),
        ])
        .await;

        let (status, Json(body)) = create_entry(State(state.clone()), caller("user-1"), multipart)
            .await
            .expect("entry creation still succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert!(body.data.files.is_empty());
        let errors = body.upload_errors.expect("failures are reported");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_name, "pic.jpg");
    }

    #[tokio::test]
    async fn list_defaults_to_four_newest_with_full_count() {
        let (state, _dir) = test_state();
        for i in 0..5 {
            seed_entry(&state, "user-1", &format!("entry {i}"));
        }

        let Json(body) = get_all_entries(
            State(state.clone()),
            caller("user-1"),
            Query(ListQuery {
                searchvalue: None,
                skip: None,
                limit: None,
            }),
        )
        .await
        .expect("listing succeeds");

        assert_eq!(body.data.len(), 4);
        assert_eq!(body.total_count, 5);
    }

    #[tokio::test]
    async fn list_search_filters_before_counting() {
        let (state, _dir) = test_state();
        seed_entry(&state, "user-1", "Weekly MEETING notes");
        seed_entry(&state, "user-1", "groceries");
        seed_entry(&state, "user-1", "meeting follow-up");

        let Json(body) = get_all_entries(
            State(state.clone()),
            caller("user-1"),
            Query(ListQuery {
                searchvalue: Some("meeting".to_string()),
                skip: None,
                limit: Some(10),
            }),
        )
        .await
        .expect("listing succeeds");

        assert_eq!(body.total_count, 2);
        assert!(body
            .data
            .iter()
            .all(|e| e.content.to_lowercase().contains("meeting")));
    }

    #[tokio::test]
    async fn detail_hides_foreign_entries() {
        let (state, _dir) = test_state();
        let entry = seed_entry(&state, "user-1", "mine");

        let err = get_entry_by_id(State(state.clone()), caller("user-2"), Path(entry.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Entry not found or not authorized");

        let ok = get_entry_by_id(State(state.clone()), caller("user-1"), Path(entry.id))
            .await
            .expect("owner fetch succeeds");
        assert_eq!(ok.0.data.content, "mine");
    }

    #[tokio::test]
    async fn update_merges_fields_and_filters_tags() {
        let (state, _dir) = test_state();
        let entry = seed_entry(&state, "user-1", "draft");
        let tag = seed_tag(&state, "user-1", "work");
        let foreign = seed_tag(&state, "user-2", "theirs");

        let Json(body) = update_entry(
            State(state.clone()),
            caller("user-1"),
            Path(entry.id.clone()),
            Json(UpdateEntryRequest {
                content: Some("final".to_string()),
                ai_content: None,
                is_pinned: Some(true),
                tags: Some(vec![tag.id.clone(), foreign.id]),
                files: None,
            }),
        )
        .await
        .expect("update succeeds");

        assert_eq!(body.data.content, "final");
        assert!(body.data.is_pinned);
        assert_eq!(body.data.tags.len(), 1);
        assert_eq!(body.data.tags[0].id, tag.id);
        assert!(body.data.updated_at >= body.data.created_at);
    }

    #[tokio::test]
    async fn delete_is_terminal() {
        let (state, _dir) = test_state();
        let entry = seed_entry(&state, "user-1", "to delete");

        let Json(body) = delete_entry(State(state.clone()), caller("user-1"), Path(entry.id.clone()))
            .await
            .expect("deletion succeeds");
        assert_eq!(body.message, "Entry deleted");

        let err = delete_entry(State(state.clone()), caller("user-1"), Path(entry.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn by_tag_requires_an_existing_tag_name() {
        let (state, _dir) = test_state();

        let err = get_entries_by_tag(
            State(state.clone()),
            caller("user-1"),
            Path("nope".to_string()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Tag not found");
    }

    #[tokio::test]
    async fn by_tag_returns_only_tagged_entries() {
        let (state, _dir) = test_state();
        let tag = seed_tag(&state, "user-1", "work");

        let mut tagged = StoredEntry::new(
            "user-1".to_string(),
            "tagged".to_string(),
            String::new(),
            vec![tag.id.clone()],
            vec![],
        );
        tagged.is_pinned = false;
        EntryRepository::new(&state.db).create(&tagged).unwrap();
        seed_entry(&state, "user-1", "untagged");

        let Json(body) = get_entries_by_tag(
            State(state.clone()),
            caller("user-1"),
            Path("work".to_string()),
        )
        .await
        .expect("lookup succeeds");

        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0].content, "tagged");
        assert_eq!(body.data[0].tags[0].name, "work");
    }

    #[tokio::test]
    async fn ai_endpoints_fail_closed_without_a_client() {
        let (state, _dir) = test_state();

        let err = ai_advice(
            State(state.clone()),
            caller("user-1"),
            Json(AiRequest {
                content: "notes".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");

        let err = fix_grammar(
            State(state.clone()),
            caller("user-1"),
            Json(AiRequest {
                content: "notes".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn upload_requires_files() {
        let (state, _dir) = test_state();
        let multipart = multipart_of(vec![]).await;

        let err = upload_files(State(state.clone()), caller("user-1"), multipart)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No files provided");
    }

    #[tokio::test]
    async fn upload_without_a_client_fails_whole_batch() {
        let (state, _dir) = test_state();
        let multipart = multipart_of(vec![file_part("pic.png", "image/png", b"fake png")]).await;

        let err = upload_files(State(state.clone()), caller("user-1"), multipart)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "All file uploads failed");
    }

    #[test]
    fn paragraph_wrapper_is_stripped_once() {
        assert_eq!(strip_paragraph_wrapper("<p>advice</p>"), "advice");
        assert_eq!(strip_paragraph_wrapper("  <p>advice</p>\n"), "advice");
        assert_eq!(
            strip_paragraph_wrapper("<p>a</p> and <p>b</p>"),
            "a</p> and <p>b"
        );
        assert_eq!(strip_paragraph_wrapper("no wrapper"), "no wrapper");
        assert_eq!(strip_paragraph_wrapper("<p>unclosed"), "<p>unclosed");
    }
}
