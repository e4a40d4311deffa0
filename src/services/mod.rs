// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service layer: identity verification and background work.

pub mod cleanup;
pub mod identity;
pub mod scraper;

pub use cleanup::{run_cleanup, CleanupReport};
pub use identity::{FirebaseTokenVerifier, VerifiedIdentity, VerifyError};
pub use scraper::{CouponScraper, ScrapeReport};
