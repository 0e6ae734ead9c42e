// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Entry repository.
//!
//! Entries are the journal documents: rich-text content, optional AI advice
//! text, attachment URLs and tag references, owned by a single user. The
//! owner index (`user_id|!created_ms|entry_id`) keeps range scans
//! newest-first; list ordering additionally floats pinned entries to the
//! front after filtering.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::database::{
    entry_index_key, id_from_index_key, owner_prefix, owner_prefix_end, Database, StorageError,
    StorageResult, ENTRIES, ENTRY_OWNER_INDEX,
};

/// Entry record persisted in the `entries` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredEntry {
    /// Unique entry identifier (UUID)
    pub id: String,
    /// Owning user id
    pub user_id: String,
    /// Rich-text body (HTML fragment)
    pub content: String,
    /// AI-generated advice text; empty when the delegate was unavailable
    pub ai_content: String,
    /// Pinned entries sort before unpinned ones in listings
    pub is_pinned: bool,
    /// Attachment CDN URLs
    pub files: Vec<String>,
    /// Referenced tag ids
    pub tags: Vec<String>,
    /// Creation time; immutable, drives the owner index
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn new(
        user_id: String,
        content: String,
        ai_content: String,
        tags: Vec<String>,
        files: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            content,
            ai_content,
            is_pinned: false,
            files,
            tags,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository for entry records.
pub struct EntryRepository<'a> {
    db: &'a Database,
}

impl<'a> EntryRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persist a new entry and its owner index row.
    pub fn create(&self, entry: &StoredEntry) -> StorageResult<()> {
        let json = serde_json::to_vec(entry)?;
        let index_key = entry_index_key(
            &entry.user_id,
            entry.created_at.timestamp_millis(),
            &entry.id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut entries = write_txn.open_table(ENTRIES)?;
            entries.insert(entry.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(ENTRY_OWNER_INDEX)?;
            index.insert(index_key.as_slice(), entry.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up an entry by id, regardless of owner.
    pub fn get(&self, entry_id: &str) -> StorageResult<Option<StoredEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        match table.get(entry_id)? {
            Some(value) => {
                let entry: StoredEntry = serde_json::from_slice(value.value())?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Look up an entry by id, filtered to the given owner.
    ///
    /// Returns `None` both when the entry does not exist and when it belongs
    /// to someone else; callers cannot distinguish the two.
    pub fn get_owned(&self, entry_id: &str, user_id: &str) -> StorageResult<Option<StoredEntry>> {
        Ok(self
            .get(entry_id)?
            .filter(|entry| entry.user_id == user_id))
    }

    /// Overwrite an existing entry in place.
    ///
    /// `created_at` is immutable, so the owner index row stays valid.
    pub fn update(&self, entry: &StoredEntry) -> StorageResult<()> {
        let json = serde_json::to_vec(entry)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut entries = write_txn.open_table(ENTRIES)?;
            if entries.get(entry.id.as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("entry {}", entry.id)));
            }
            entries.insert(entry.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove an entry and its owner index row.
    pub fn delete(&self, entry: &StoredEntry) -> StorageResult<()> {
        let index_key = entry_index_key(
            &entry.user_id,
            entry.created_at.timestamp_millis(),
            &entry.id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut entries = write_txn.open_table(ENTRIES)?;
            entries.remove(entry.id.as_str())?;

            let mut index = write_txn.open_table(ENTRY_OWNER_INDEX)?;
            index.remove(index_key.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Filtered, sorted, paginated listing of a user's entries.
    ///
    /// The optional search term matches case-insensitively anywhere in the
    /// content. Ordering is pinned-first, then newest-first. Returns the
    /// requested page plus the total count of matches before pagination.
    pub fn list_page(
        &self,
        user_id: &str,
        search: Option<&str>,
        skip: usize,
        limit: usize,
    ) -> StorageResult<(Vec<StoredEntry>, usize)> {
        let mut entries = self.scan_owner(user_id)?;

        if let Some(term) = search {
            let needle = term.to_lowercase();
            if !needle.is_empty() {
                entries.retain(|entry| entry.content.to_lowercase().contains(&needle));
            }
        }

        // Stable sort keeps newest-first order within each pin group
        entries.sort_by_key(|entry| !entry.is_pinned);

        let total = entries.len();
        let page = entries.into_iter().skip(skip).take(limit).collect();
        Ok((page, total))
    }

    /// All of a user's entries referencing the given tag, newest-first.
    pub fn list_by_tag(&self, user_id: &str, tag_id: &str) -> StorageResult<Vec<StoredEntry>> {
        let mut entries = self.scan_owner(user_id)?;
        entries.retain(|entry| entry.tags.iter().any(|t| t == tag_id));
        Ok(entries)
    }

    /// Scan the owner index and load every entry, newest-first.
    fn scan_owner(&self, user_id: &str) -> StorageResult<Vec<StoredEntry>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ENTRY_OWNER_INDEX)?;
        let entries_table = read_txn.open_table(ENTRIES)?;

        let prefix = owner_prefix(user_id);
        let prefix_end = owner_prefix_end(user_id);

        let mut entries = Vec::new();
        for item in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let item = item?;
            let Some(entry_id) = id_from_index_key(item.0.value()) else {
                continue;
            };
            if let Some(value) = entries_table.get(entry_id.as_str())? {
                let entry: StoredEntry = serde_json::from_slice(value.value())?;
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
