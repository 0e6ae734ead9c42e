// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
///
/// Access tokens are verified by signature and expiry alone; the server
/// never looks them up, so everything a handler needs about the caller
/// rides in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,

    /// User's email address
    pub email: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl AccessClaims {
    pub fn new(user_id: &str, email: &str, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + ttl_secs,
        }
    }
}

/// Claims carried by a refresh token.
///
/// Refresh tokens carry only the subject; the authoritative expiry lives
/// in the persisted record, and the signature binds the string to this
/// server's refresh secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(user_id: &str, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl_secs,
        }
    }
}

/// Authenticated user information extracted from a verified access token.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Canonical user ID (JWT `sub` claim)
    pub user_id: String,

    /// User's email address
    pub email: String,
}
