// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Embedded Document Store
//!
//! Persistence is a single redb database file (`journal.redb` under
//! `DATA_DIR`). redb gives ACID transactions with serialized writers, which
//! the refresh-token rotation relies on: taking a token record is one write
//! transaction, so a token string can be consumed exactly once even under
//! concurrent renewal attempts.
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `user_email_index`: email → user_id
//! - `refresh_tokens`: token string → serialized StoredRefreshToken
//! - `entries`: entry_id → serialized StoredEntry
//! - `entry_owner_index`: composite key (user_id|!created_ms|entry_id) → entry_id
//! - `tags`: tag_id → serialized StoredTag
//! - `tag_owner_index`: composite key (user_id|!created_ms|tag_id) → tag_id
//!
//! The owner indexes invert the creation timestamp so a forward range scan
//! yields newest-first ordering. All values are JSON documents.

pub mod database;
pub mod repository;

pub use database::{Database, StorageError, StorageResult};
pub use repository::{
    EntryRepository, RefreshTokenRepository, StoredEntry, StoredRefreshToken, StoredTag,
    StoredUser, TagRepository, UserRepository,
};
