// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded store.
//!
//! Each repository provides CRUD operations for a specific record type,
//! borrowing the shared [`Database`](super::Database) handle and owning the
//! (de)serialization and index maintenance for that type.

pub mod entries;
pub mod refresh_tokens;
pub mod tags;
pub mod users;

pub use entries::{EntryRepository, StoredEntry};
pub use refresh_tokens::{RefreshTokenRepository, StoredRefreshToken};
pub use tags::{StoredTag, TagRepository};
pub use users::{StoredUser, UserRepository};
