// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cron-driven background jobs.
//!
//! Each job runs in its own task: sleep until the next UTC fire time, run,
//! log the outcome, repeat. A failed run is logged and the loop continues.

use crate::error::AppError;
use crate::services::{run_cleanup, CouponScraper};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// A named cron schedule.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: &'static str,
    schedule: Schedule,
}

impl Job {
    pub fn new(name: &'static str, expr: &str) -> anyhow::Result<Self> {
        let schedule = Schedule::from_str(expr)
            .map_err(|e| anyhow::anyhow!("invalid cron expression for {name} '{expr}': {e}"))?;
        Ok(Self { name, schedule })
    }

    /// Next fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Run `task` on this schedule forever.
    pub fn spawn<F, Fut>(self, task: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let Some(next) = self.next_after(now) else {
                    tracing::warn!(job = self.name, "Schedule has no further fire times");
                    break;
                };
                tracing::debug!(job = self.name, next_run = %format_utc_rfc3339(next), "Job scheduled");

                let wait = (next - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                let started = Instant::now();
                tracing::info!(job = self.name, "Job started");
                match task().await {
                    Ok(()) => tracing::info!(
                        job = self.name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Job completed"
                    ),
                    Err(e) => tracing::error!(
                        job = self.name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        error = ?e,
                        "Job failed"
                    ),
                }
            }
        })
    }
}

/// Start the scrape and cleanup jobs.
pub fn start(state: Arc<AppState>, scraper: CouponScraper) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let scrape = Job::new("coupon-scrape", &state.config.scrape_cron)?;
    let cleanup = Job::new("expired-cleanup", &state.config.cleanup_cron)?;

    tracing::info!(
        scrape_cron = %state.config.scrape_cron,
        cleanup_cron = %state.config.cleanup_cron,
        sources = scraper.sources().len(),
        "Starting background jobs"
    );

    let scrape_state = state.clone();
    let scraper = Arc::new(scraper);
    let scrape_handle = scrape.spawn(move || {
        let state = scrape_state.clone();
        let scraper = scraper.clone();
        async move { scraper.run(&state.db).await.map(|_| ()) }
    });

    let cleanup_handle = cleanup.spawn(move || {
        let state = state.clone();
        async move {
            run_cleanup(&state.db, Utc::now(), state.config.expired_retention_days)
                .await
                .map(|_| ())
        }
    });

    Ok(vec![scrape_handle, cleanup_handle])
}
