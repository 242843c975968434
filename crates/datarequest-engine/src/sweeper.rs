//! Forces overdue reviews to completion.
//!
//! A request whose review period has ended moves from `UNDER_REVIEW` to
//! `REVIEWED` even if reviewers are still outstanding. Each request is
//! handled under its lock and its status is re-read once the lock is held,
//! so overlapping or repeated sweeps never transition a request twice.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use datarequest_types::{RequestId, Status};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::WorkflowResult;
use crate::orchestrator::WorkflowCore;

const STAGE: &str = "review_expired";

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Requests found in `UNDER_REVIEW`.
    pub examined: usize,
    pub transitioned: Vec<RequestId>,
    /// Still within their review period, or moved on before the lock was
    /// acquired.
    pub skipped: usize,
    pub failures: Vec<(RequestId, String)>,
    /// The sweep stopped early on shutdown.
    pub cancelled: bool,
}

enum Swept {
    Transitioned,
    Skipped,
}

pub struct ExpirationSweeper {
    core: Arc<WorkflowCore>,
}

impl ExpirationSweeper {
    pub(crate) fn new(core: Arc<WorkflowCore>) -> Self {
        Self { core }
    }

    /// Sweep once, treating `now` as the current time.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> WorkflowResult<SweepReport> {
        self.sweep(now, None).await
    }

    /// Sweep once, stopping between requests when `shutdown` turns true.
    pub async fn sweep_until(
        &self,
        now: DateTime<Utc>,
        shutdown: &watch::Receiver<bool>,
    ) -> WorkflowResult<SweepReport> {
        self.sweep(now, Some(shutdown)).await
    }

    async fn sweep(
        &self,
        now: DateTime<Utc>,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> WorkflowResult<SweepReport> {
        let candidates = self.core.records.ids_with_status(Status::UnderReview).await?;
        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for id in candidates {
            if shutdown.is_some_and(|rx| *rx.borrow()) {
                info!(request_id = %id, "sweep cancelled before request");
                report.cancelled = true;
                break;
            }
            match self.expire(id, now).await {
                Ok(Swept::Transitioned) => report.transitioned.push(id),
                Ok(Swept::Skipped) => report.skipped += 1,
                Err(err) => {
                    warn!(request_id = %id, error = %err, "could not expire review");
                    report.failures.push((id, err.to_string()));
                }
            }
        }

        info!(
            examined = report.examined,
            transitioned = report.transitioned.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            "expiration sweep finished"
        );
        Ok(report)
    }

    async fn expire(&self, id: RequestId, now: DateTime<Utc>) -> WorkflowResult<Swept> {
        let core = &self.core;
        let Some(deadline) = core.records.review_deadline(id).await? else {
            debug!(request_id = %id, "under review without a deadline");
            return Ok(Swept::Skipped);
        };
        if deadline >= now.timestamp() {
            return Ok(Swept::Skipped);
        }

        let guard = core.locks.lock(id).await;
        let status = core.records.status(id).await?;
        if status != Status::UnderReview {
            debug!(request_id = %id, status = %status, "left review before the sweep reached it");
            return Ok(Swept::Skipped);
        }

        let abandoned = core.reviews.pending(id).await?;
        core.transition(&guard, STAGE, status, Status::Reviewed, now)
            .await?;
        info!(
            request_id = %id,
            abandoned_reviewers = abandoned.len(),
            "review period expired"
        );
        Ok(Swept::Transitioned)
    }

    /// Sweep every `period` until `shutdown` turns true.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = period.as_secs(), "expiration sweeper started");
        let mut ticker = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_until(Utc::now(), &shutdown).await {
                        error!(error = %e, "expiration sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            if *shutdown.borrow() {
                break;
            }
        }

        info!("expiration sweeper stopped");
    }
}
