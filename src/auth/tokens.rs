// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token issuance, verification and rotation.
//!
//! Two independent HS256 keys sign two kinds of token:
//!
//! - **Access tokens** carry `{sub, email}` and are verified statelessly
//!   on every request. No store lookup, no revocation hook.
//! - **Refresh tokens** carry `{sub}` and are single-use. Each issuance
//!   persists a record keyed by the token string; renewal consumes the
//!   record before anything else, so presenting the same string twice
//!   succeeds at most once even under concurrent requests (the store
//!   serializes writers).
//!
//! Renewal walks a fixed sequence of checks, each terminal on failure:
//! record present → stored expiry → signature → user still exists. Any
//! rejection leaves the presented record deleted.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{AccessClaims, AuthenticatedUser, RefreshClaims};
use super::error::AuthError;
use crate::storage::{
    Database, RefreshTokenRepository, StorageError, StoredRefreshToken, StoredUser, UserRepository,
};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly minted access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Infrastructure failure while minting or persisting tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token store error: {0}")]
    Store(#[from] StorageError),

    #[error("token signing error: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// Why a presented refresh token was turned away.
///
/// The discriminant doubles as the machine-readable `code` in the wire
/// response; `message` is the human-readable companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRejection {
    /// No record for the presented string (never issued, already used,
    /// or cleared by an earlier rejection)
    Invalid,
    /// Record existed but its stored expiry has passed
    Expired,
    /// Record existed but the string fails signature verification
    InvalidSignature,
    /// Token checks out but its user no longer exists
    UserMissing,
}

impl RefreshRejection {
    pub fn code(&self) -> &'static str {
        match self {
            RefreshRejection::Invalid => "invalid",
            RefreshRejection::Expired => "expired",
            RefreshRejection::InvalidSignature => "invalid-signature",
            RefreshRejection::UserMissing => "user-missing",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RefreshRejection::Invalid => "Refresh token is not valid",
            RefreshRejection::Expired => "Refresh token expired. Please login again",
            RefreshRejection::InvalidSignature => "Invalid refresh token",
            RefreshRejection::UserMissing => "User not found",
        }
    }
}

impl std::fmt::Display for RefreshRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Renewal outcome: a deliberate rejection or an infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum RenewError {
    #[error("refresh rejected: {0}")]
    Rejected(RefreshRejection),

    #[error(transparent)]
    Internal(#[from] TokenError),
}

/// Signs, verifies and rotates the two token kinds.
///
/// Cheap to clone; the keys are shared.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: Arc<EncodingKey>,
    access_decoding: Arc<DecodingKey>,
    refresh_encoding: Arc<EncodingKey>,
    refresh_decoding: Arc<DecodingKey>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            access_encoding: Arc::new(EncodingKey::from_secret(access_secret.as_bytes())),
            access_decoding: Arc::new(DecodingKey::from_secret(access_secret.as_bytes())),
            refresh_encoding: Arc::new(EncodingKey::from_secret(refresh_secret.as_bytes())),
            refresh_decoding: Arc::new(DecodingKey::from_secret(refresh_secret.as_bytes())),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Mint an access/refresh pair for a user and persist the refresh record.
    ///
    /// Prior refresh tokens for the same user are left untouched; sessions
    /// are per-issuance, not per-user.
    pub fn issue(&self, db: &Database, user: &StoredUser) -> Result<TokenPair, TokenError> {
        let access_claims = AccessClaims::new(&user.id, &user.email, self.access_ttl_secs);
        let access_token = encode(&Header::default(), &access_claims, &self.access_encoding)?;

        let refresh_claims = RefreshClaims::new(&user.id, self.refresh_ttl_secs);
        let refresh_token = encode(&Header::default(), &refresh_claims, &self.refresh_encoding)?;

        let record = StoredRefreshToken {
            token: refresh_token.clone(),
            user_id: user.id.clone(),
            expires_at: Utc::now() + Duration::seconds(self.refresh_ttl_secs),
        };
        RefreshTokenRepository::new(db).insert(&record)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify an access token by signature and expiry alone.
    pub fn verify_access(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_aud = false;

        let token_data = decode::<AccessClaims>(token, &self.access_decoding, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?;

        Ok(AuthenticatedUser {
            user_id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }

    /// Rotate a refresh token: consume the presented record, re-check it,
    /// and mint a fresh pair.
    ///
    /// The record is removed from the store before any check runs, so every
    /// rejection leaves it deleted and a second presentation of the same
    /// string fails with `Invalid`.
    pub fn renew(&self, db: &Database, presented: &str) -> Result<TokenPair, RenewError> {
        let record = RefreshTokenRepository::new(db)
            .take(presented)
            .map_err(TokenError::from)?;
        let Some(record) = record else {
            return Err(RenewError::Rejected(RefreshRejection::Invalid));
        };

        if record.expires_at < Utc::now() {
            return Err(RenewError::Rejected(RefreshRejection::Expired));
        }

        // The stored expiry is authoritative, so this check is signature-only
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_exp = false;
        validation.validate_aud = false;
        let token_data =
            match decode::<RefreshClaims>(presented, &self.refresh_decoding, &validation) {
                Ok(data) => data,
                Err(_) => return Err(RenewError::Rejected(RefreshRejection::InvalidSignature)),
            };

        let user = UserRepository::new(db)
            .get(&token_data.claims.sub)
            .map_err(TokenError::from)?;
        let Some(user) = user else {
            return Err(RenewError::Rejected(RefreshRejection::UserMissing));
        };

        Ok(self.issue(db, &user)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn service() -> TokenService {
        TokenService::new("access-secret", "refresh-secret", 3600, 604_800)
    }

    fn seeded_user(db: &Database) -> StoredUser {
        let user = StoredUser::new(
            "a@x.com".to_string(),
            "Ada".to_string(),
            "Lovelace".to_string(),
            "hash".to_string(),
        );
        UserRepository::new(db).create(&user).unwrap();
        user
    }

    #[test]
    fn issue_persists_an_independently_verifiable_refresh_token() {
        let (db, _dir) = temp_db();
        let tokens = service();
        let user = seeded_user(&db);

        let pair = tokens.issue(&db, &user).unwrap();

        let record = RefreshTokenRepository::new(&db)
            .get(&pair.refresh_token)
            .unwrap()
            .unwrap();
        assert_eq!(record.user_id, user.id);
        assert!(record.expires_at > Utc::now());

        let identity = tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.email, "a@x.com");
    }

    #[test]
    fn issue_leaves_prior_refresh_tokens_untouched() {
        let (db, _dir) = temp_db();
        let tokens = service();
        let user = seeded_user(&db);

        let first = tokens.issue(&db, &user).unwrap();
        let second = tokens.issue(&db, &user).unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let repo = RefreshTokenRepository::new(&db);
        assert!(repo.get(&first.refresh_token).unwrap().is_some());
        assert!(repo.get(&second.refresh_token).unwrap().is_some());
    }

    #[test]
    fn verify_access_distinguishes_the_failure_modes() {
        let (db, _dir) = temp_db();
        let tokens = service();
        let user = seeded_user(&db);

        let good = tokens.issue(&db, &user).unwrap().access_token;
        assert!(tokens.verify_access(&good).is_ok());

        let foreign = TokenService::new("other-secret", "refresh-secret", 3600, 604_800)
            .issue(&db, &user)
            .unwrap()
            .access_token;
        assert!(matches!(
            tokens.verify_access(&foreign),
            Err(AuthError::InvalidSignature)
        ));

        // Past the 60s leeway
        let stale = TokenService::new("access-secret", "refresh-secret", -120, 604_800)
            .issue(&db, &user)
            .unwrap()
            .access_token;
        assert!(matches!(
            tokens.verify_access(&stale),
            Err(AuthError::TokenExpired)
        ));

        assert!(matches!(
            tokens.verify_access("not-a-jwt"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn renew_of_an_unknown_token_is_invalid() {
        let (db, _dir) = temp_db();
        let tokens = service();

        let result = tokens.renew(&db, "never-issued");
        assert!(matches!(
            result,
            Err(RenewError::Rejected(RefreshRejection::Invalid))
        ));
    }

    #[test]
    fn renew_is_single_use() {
        let (db, _dir) = temp_db();
        let tokens = service();
        let user = seeded_user(&db);

        let pair = tokens.issue(&db, &user).unwrap();

        let renewed = tokens.renew(&db, &pair.refresh_token).unwrap();
        assert_ne!(renewed.refresh_token, pair.refresh_token);

        let replay = tokens.renew(&db, &pair.refresh_token);
        assert!(matches!(
            replay,
            Err(RenewError::Rejected(RefreshRejection::Invalid))
        ));
    }

    #[test]
    fn renew_of_an_expired_token_deletes_the_record() {
        let (db, _dir) = temp_db();
        let user = seeded_user(&db);

        let expired_issuer = TokenService::new("access-secret", "refresh-secret", 3600, -120);
        let pair = expired_issuer.issue(&db, &user).unwrap();

        let tokens = service();
        let result = tokens.renew(&db, &pair.refresh_token);
        assert!(matches!(
            result,
            Err(RenewError::Rejected(RefreshRejection::Expired))
        ));

        // The record was consumed, so the retry hits the not-found path
        let retry = tokens.renew(&db, &pair.refresh_token);
        assert!(matches!(
            retry,
            Err(RenewError::Rejected(RefreshRejection::Invalid))
        ));
    }

    #[test]
    fn renew_rejects_a_foreign_signature_and_clears_the_record() {
        let (db, _dir) = temp_db();
        let user = seeded_user(&db);

        // Same store, different refresh secret
        let foreign = TokenService::new("access-secret", "other-refresh-secret", 3600, 604_800);
        let pair = foreign.issue(&db, &user).unwrap();

        let tokens = service();
        let result = tokens.renew(&db, &pair.refresh_token);
        assert!(matches!(
            result,
            Err(RenewError::Rejected(RefreshRejection::InvalidSignature))
        ));
        assert!(RefreshTokenRepository::new(&db)
            .get(&pair.refresh_token)
            .unwrap()
            .is_none());
    }

    #[test]
    fn renew_for_a_deleted_user_is_user_missing() {
        let (db, _dir) = temp_db();
        let tokens = service();

        // Never persisted, standing in for a user deleted after issuance
        let ghost = StoredUser::new(
            "ghost@x.com".to_string(),
            "Ghost".to_string(),
            "User".to_string(),
            "hash".to_string(),
        );
        let pair = tokens.issue(&db, &ghost).unwrap();

        let result = tokens.renew(&db, &pair.refresh_token);
        assert!(matches!(
            result,
            Err(RenewError::Rejected(RefreshRejection::UserMissing))
        ));
    }

    #[test]
    fn renewed_pair_is_fully_usable() {
        let (db, _dir) = temp_db();
        let tokens = service();
        let user = seeded_user(&db);

        let pair = tokens.issue(&db, &user).unwrap();
        let renewed = tokens.renew(&db, &pair.refresh_token).unwrap();

        let identity = tokens.verify_access(&renewed.access_token).unwrap();
        assert_eq!(identity.user_id, user.id);

        assert!(tokens.renew(&db, &renewed.refresh_token).is_ok());
    }

    #[test]
    fn stale_sibling_tokens_stay_renewable() {
        let (db, _dir) = temp_db();
        let tokens = service();
        let user = seeded_user(&db);

        let signup_pair = tokens.issue(&db, &user).unwrap();
        let login_pair = tokens.issue(&db, &user).unwrap();

        // Using one session's token does not disturb the other's
        tokens.renew(&db, &login_pair.refresh_token).unwrap();
        assert!(tokens.renew(&db, &signup_pair.refresh_token).is_ok());
    }

    #[test]
    fn rejection_codes_match_the_wire_contract() {
        assert_eq!(RefreshRejection::Invalid.code(), "invalid");
        assert_eq!(RefreshRejection::Expired.code(), "expired");
        assert_eq!(
            RefreshRejection::InvalidSignature.code(),
            "invalid-signature"
        );
        assert_eq!(RefreshRejection::UserMissing.code(), "user-missing");
        assert_eq!(
            RefreshRejection::Expired.message(),
            "Refresh token expired. Please login again"
        );
    }
}
