// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Journal Server - Personal Journaling & Task Notes Service
//!
//! This crate provides a REST backend for rich-text journal entries with
//! tags, image attachments and AI-assisted writing, protected by a rotating
//! access/refresh token scheme.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token lifecycle, password hashing and the request auth gate
//! - `providers` - External delegates (Gemini text generation, Uploadcare CDN)
//! - `storage` - Embedded document store (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod providers;
pub mod state;
pub mod storage;
