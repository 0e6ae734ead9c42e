// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Users are stored by id with a secondary email index enforcing uniqueness.
//! Email comparison is case-sensitive as stored. The password hash never
//! leaves this layer except for login verification.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::super::database::{Database, StorageError, StorageResult, USERS, USER_EMAIL_INDEX};

/// User record persisted in the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Unique user identifier (UUID)
    pub id: String,
    /// Login email (unique, case-sensitive as stored)
    pub email: String,
    /// Display name
    pub name: String,
    /// Surname
    pub surname: String,
    /// One-way salted password hash (argon2 PHC string)
    pub password_hash: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn new(email: String, name: String, surname: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            surname,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Repository for user records.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Persist a new user, enforcing email uniqueness.
    ///
    /// The uniqueness check and both inserts happen in one write transaction.
    pub fn create(&self, user: &StoredUser) -> StorageResult<()> {
        let json = serde_json::to_vec(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut email_index = write_txn.open_table(USER_EMAIL_INDEX)?;
            if email_index.get(user.email.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "user email {}",
                    user.email
                )));
            }
            email_index.insert(user.email.as_str(), user.id.as_str())?;

            let mut users = write_txn.open_table(USERS)?;
            users.insert(user.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a user by id.
    pub fn get(&self, user_id: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => {
                let user: StoredUser = serde_json::from_slice(value.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Look up a user by login email.
    pub fn get_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let email_index = read_txn.open_table(USER_EMAIL_INDEX)?;
        let user_id = match email_index.get(email)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(user_id.as_str())? {
            Some(value) => {
                let user: StoredUser = serde_json::from_slice(value.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}
