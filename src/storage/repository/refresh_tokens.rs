// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Refresh token repository.
//!
//! One record per outstanding renewal credential, keyed by the opaque signed
//! token string. The [`take`](RefreshTokenRepository::take) operation removes
//! and returns a record in a single write transaction; redb serializes
//! writers, so a presented token is consumed exactly once even when two
//! renewals race on the same string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::database::{Database, StorageResult, REFRESH_TOKENS};

/// Refresh token record persisted in the `refresh_tokens` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredRefreshToken {
    /// The signed token string (also the table key)
    pub token: String,
    /// Owning user id (reference only, the store does not own the user)
    pub user_id: String,
    /// Absolute expiry; authoritative over the embedded claim
    pub expires_at: DateTime<Utc>,
}

/// Repository for refresh token records.
pub struct RefreshTokenRepository<'a> {
    db: &'a Database,
}

impl<'a> RefreshTokenRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persist a freshly minted refresh token record.
    ///
    /// Prior records for the same user are left untouched: sessions are
    /// per-issuance, not per-user-singleton.
    pub fn insert(&self, record: &StoredRefreshToken) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(REFRESH_TOKENS)?;
            table.insert(record.token.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Atomically remove and return the record for a presented token string.
    ///
    /// Returns `None` when no record exists (unknown, already consumed, or
    /// already cleaned up). This is the conditional delete that makes
    /// renewal single-use.
    pub fn take(&self, token: &str) -> StorageResult<Option<StoredRefreshToken>> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(REFRESH_TOKENS)?;
            let removed = match table.remove(token)? {
                Some(value) => Some(serde_json::from_slice::<StoredRefreshToken>(value.value())?),
                None => None,
            };
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Look up a record without consuming it.
    pub fn get(&self, token: &str) -> StorageResult<Option<StoredRefreshToken>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFRESH_TOKENS)?;
        match table.get(token)? {
            Some(value) => {
                let record: StoredRefreshToken = serde_json::from_slice(value.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
