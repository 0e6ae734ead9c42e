// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tag repository.
//!
//! Tags are per-user labels with display colors. The owner index
//! (`user_id|!created_ms|tag_id`) mirrors the entry index so listings come
//! back newest-first without a full-table scan.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::database::{
    id_from_index_key, owner_prefix, owner_prefix_end, tag_index_key, Database, StorageError,
    StorageResult, TAGS, TAG_OWNER_INDEX,
};

/// Tag record persisted in the `tags` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredTag {
    /// Unique tag identifier (UUID)
    pub id: String,
    /// Owning user id
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Foreground color, e.g. `#af3029`
    pub color: Option<String>,
    /// Background color
    pub bg_color: Option<String>,
    /// Border color
    pub border_color: Option<String>,
    /// Creation time; immutable, drives the owner index
    pub created_at: DateTime<Utc>,
}

impl StoredTag {
    pub fn new(
        user_id: String,
        name: String,
        color: Option<String>,
        bg_color: Option<String>,
        border_color: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            name,
            color,
            bg_color,
            border_color,
            created_at: Utc::now(),
        }
    }
}

/// Repository for tag records.
pub struct TagRepository<'a> {
    db: &'a Database,
}

impl<'a> TagRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persist a new tag and its owner index row.
    pub fn create(&self, tag: &StoredTag) -> StorageResult<()> {
        let json = serde_json::to_vec(tag)?;
        let index_key = tag_index_key(&tag.user_id, tag.created_at.timestamp_millis(), &tag.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut tags = write_txn.open_table(TAGS)?;
            tags.insert(tag.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(TAG_OWNER_INDEX)?;
            index.insert(index_key.as_slice(), tag.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a tag by id, regardless of owner.
    pub fn get(&self, tag_id: &str) -> StorageResult<Option<StoredTag>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TAGS)?;
        match table.get(tag_id)? {
            Some(value) => {
                let tag: StoredTag = serde_json::from_slice(value.value())?;
                Ok(Some(tag))
            }
            None => Ok(None),
        }
    }

    /// Look up a tag by id, filtered to the given owner.
    pub fn get_owned(&self, tag_id: &str, user_id: &str) -> StorageResult<Option<StoredTag>> {
        Ok(self.get(tag_id)?.filter(|tag| tag.user_id == user_id))
    }

    /// Overwrite an existing tag in place.
    pub fn update(&self, tag: &StoredTag) -> StorageResult<()> {
        let json = serde_json::to_vec(tag)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut tags = write_txn.open_table(TAGS)?;
            if tags.get(tag.id.as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("tag {}", tag.id)));
            }
            tags.insert(tag.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Remove a tag and its owner index row.
    pub fn delete(&self, tag: &StoredTag) -> StorageResult<()> {
        let index_key = tag_index_key(&tag.user_id, tag.created_at.timestamp_millis(), &tag.id);

        let write_txn = self.db.begin_write()?;
        {
            let mut tags = write_txn.open_table(TAGS)?;
            tags.remove(tag.id.as_str())?;

            let mut index = write_txn.open_table(TAG_OWNER_INDEX)?;
            index.remove(index_key.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// All of a user's tags, newest-first.
    pub fn list_by_owner(&self, user_id: &str) -> StorageResult<Vec<StoredTag>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TAG_OWNER_INDEX)?;
        let tags_table = read_txn.open_table(TAGS)?;

        let prefix = owner_prefix(user_id);
        let prefix_end = owner_prefix_end(user_id);

        let mut tags = Vec::new();
        for item in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            let item = item?;
            let Some(tag_id) = id_from_index_key(item.0.value()) else {
                continue;
            };
            if let Some(value) = tags_table.get(tag_id.as_str())? {
                let tag: StoredTag = serde_json::from_slice(value.value())?;
                tags.push(tag);
            }
        }
        Ok(tags)
    }

    /// Find a user's tag by exact name.
    pub fn find_by_name(&self, user_id: &str, name: &str) -> StorageResult<Option<StoredTag>> {
        Ok(self
            .list_by_owner(user_id)?
            .into_iter()
            .find(|tag| tag.name == name))
    }
}
