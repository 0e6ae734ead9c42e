// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module owns the credential lifecycle for the journal API.
//!
//! ## Auth Flow
//!
//! 1. Signup/login verifies the password (Argon2id) and mints a token pair
//! 2. Client sends `Authorization: Bearer <accessToken>` on every request
//! 3. The `Auth` extractor verifies the access token:
//!    - HS256 signature against the access secret
//!    - expiry, with 60 seconds of clock skew tolerance
//!    - `sub`/`email` claims become the request's `AuthenticatedUser`
//! 4. When the access token lapses, the client presents its refresh token;
//!    renewal consumes the stored record and mints a fresh pair
//!
//! ## Security
//!
//! - Access verification is stateless; no store lookup per request
//! - Refresh tokens are single-use: the record is deleted the moment the
//!   string is presented, whatever the outcome
//! - Access and refresh tokens are signed with distinct secrets

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod tokens;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
pub use tokens::{RefreshRejection, RenewError, TokenError, TokenPair, TokenService};
