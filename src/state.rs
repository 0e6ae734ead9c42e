// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenService;
use crate::providers::{AdviceClient, UploadClient};
use crate::storage::Database;

/// Shared application state handed to every handler.
///
/// The AI and CDN clients are optional; endpoints that need them degrade
/// gracefully when the corresponding credentials are absent.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: TokenService,
    pub advice: Option<Arc<AdviceClient>>,
    pub uploads: Option<Arc<UploadClient>>,
}

impl AppState {
    pub fn new(db: Arc<Database>, tokens: TokenService) -> Self {
        Self {
            db,
            tokens,
            advice: None,
            uploads: None,
        }
    }

    pub fn with_advice(mut self, advice: AdviceClient) -> Self {
        self.advice = Some(Arc::new(advice));
        self
    }

    pub fn with_uploads(mut self, uploads: UploadClient) -> Self {
        self.uploads = Some(Arc::new(uploads));
        self
    }
}
