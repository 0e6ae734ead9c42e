// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Database handle, table definitions and composite-key helpers.

use std::path::Path;

use redb::{ReadTransaction, ReadableDatabase, TableDefinition, WriteTransaction};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user_id → serialized StoredUser (JSON bytes).
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Unique index: email → user_id. Guards signup uniqueness.
pub(crate) const USER_EMAIL_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("user_email_index");

/// Refresh tokens: token string (natural key) → serialized StoredRefreshToken.
pub(crate) const REFRESH_TOKENS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("refresh_tokens");

/// Primary table: entry_id → serialized StoredEntry (JSON bytes).
pub(crate) const ENTRIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entries");

/// Index: composite key → entry_id.
/// Key format: `user_id|!created_ms_be|entry_id` for newest-first range scans.
pub(crate) const ENTRY_OWNER_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("entry_owner_index");

/// Primary table: tag_id → serialized StoredTag (JSON bytes).
pub(crate) const TAGS: TableDefinition<&str, &[u8]> = TableDefinition::new("tags");

/// Index: composite key → tag_id.
/// Key format: `user_id|!created_ms_be|tag_id`, same as the entry index.
pub(crate) const TAG_OWNER_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("tag_owner_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Composite Key Helpers
// =============================================================================

/// Build a composite key for the entry_owner_index table.
///
/// Format: `user_id | inverted_created_ms_be_bytes | entry_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
pub(crate) fn entry_index_key(user_id: &str, created_ms: i64, entry_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1 + 8 + 1 + entry_id.len());
    key.extend_from_slice(user_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!created_ms as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(entry_id.as_bytes());
    key
}

/// Build a composite key for the tag_owner_index table.
pub(crate) fn tag_index_key(user_id: &str, created_ms: i64, tag_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1 + 8 + 1 + tag_id.len());
    key.extend_from_slice(user_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!created_ms as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(tag_id.as_bytes());
    key
}

/// Build a prefix key for range scanning everything belonging to a user.
pub(crate) fn owner_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(user_id.len() + 1);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with all 0xFF bytes appended).
pub(crate) fn owner_prefix_end(user_id: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(user_id.len() + 1 + 20);
    end.extend_from_slice(user_id.as_bytes());
    end.push(b'|');
    // Past any valid key with this prefix (UUIDs and timestamps are < 0xFF)
    end.extend_from_slice(&[0xFF; 20]);
    end
}

/// Extract the id portion after the last `|` of a composite index key.
pub(crate) fn id_from_index_key(key: &[u8]) -> Option<String> {
    let pos = key.iter().rposition(|&b| b == b'|')?;
    String::from_utf8(key[pos + 1..].to_vec()).ok()
}

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID document database.
pub struct Database {
    db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAIL_INDEX)?;
            let _ = write_txn.open_table(REFRESH_TOKENS)?;
            let _ = write_txn.open_table(ENTRIES)?;
            let _ = write_txn.open_table(ENTRY_OWNER_INDEX)?;
            let _ = write_txn.open_table(TAGS)?;
            let _ = write_txn.open_table(TAG_OWNER_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> Result<ReadTransaction, redb::TransactionError> {
        self.db.begin_read()
    }

    pub(crate) fn begin_write(&self) -> Result<WriteTransaction, redb::TransactionError> {
        self.db.begin_write()
    }

    /// Probe the database with a read transaction. Used by the readiness check.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_tables_and_passes_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.redb")).unwrap();
        db.health_check().unwrap();
    }

    #[test]
    fn entry_index_key_orders_newest_first() {
        // Newer timestamps should produce smaller composite keys (descending)
        let key_old = entry_index_key("user-1", 1_000, "entry-a");
        let key_new = entry_index_key("user-1", 2_000, "entry-b");
        assert!(key_new < key_old, "newer timestamps should sort first");
    }

    #[test]
    fn owner_prefix_bounds_cover_all_owner_keys() {
        let key = entry_index_key("user-1", 5_000, "entry-a");
        let prefix = owner_prefix("user-1");
        let end = owner_prefix_end("user-1");
        assert!(key.as_slice() >= prefix.as_slice());
        assert!(key.as_slice() < end.as_slice());

        let other = entry_index_key("user-2", 5_000, "entry-a");
        assert!(other.as_slice() >= end.as_slice() || other.as_slice() < prefix.as_slice());
    }

    #[test]
    fn id_round_trips_through_index_keys() {
        let key = entry_index_key("user-1", 42, "entry-xyz");
        assert_eq!(id_from_index_key(&key).as_deref(), Some("entry-xyz"));

        let tag_key = tag_index_key("user-1", 42, "tag-abc");
        assert_eq!(id_from_index_key(&tag_key).as_deref(), Some("tag-abc"));
    }
}
