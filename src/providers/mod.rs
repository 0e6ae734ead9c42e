// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External service clients.
//!
//! Both clients are optional at runtime: the server starts without them and
//! the endpoints that need them degrade per their own contracts. Each client
//! reads its configuration from the environment and owns its HTTP pool.

pub mod advice;
pub mod uploads;

pub use advice::{AdviceClient, AdviceError, AdviceOutcome};
pub use uploads::{UploadClient, UploadError, UploadedFile};
