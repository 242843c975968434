//! Write-once status timestamps per request.
//!
//! The log is a JSON object `status -> unix seconds` stored next to the
//! request. Keys are never overwritten. Callers hold the request lock, which
//! makes the read-check-write below atomic with respect to other writers.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use datarequest_types::{RequestId, Status};
use tracing::debug;

use crate::error::{ProvenanceError, WorkflowError, WorkflowResult};
use crate::records::{files, RequestRecords};

#[derive(Clone)]
pub struct ProvenanceLog {
    records: RequestRecords,
}

impl ProvenanceLog {
    pub fn new(records: RequestRecords) -> Self {
        Self { records }
    }

    async fn load(&self, id: RequestId) -> WorkflowResult<BTreeMap<String, String>> {
        Ok(self
            .records
            .read_json_opt(id, files::PROVENANCE)
            .await?
            .unwrap_or_default())
    }

    /// Record that `request_id` reached `status` at `now`.
    pub async fn record_timestamp(
        &self,
        request_id: &str,
        status: Status,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        let id: RequestId = request_id
            .parse()
            .map_err(|_| ProvenanceError::InvalidRequestId(request_id.to_string()))?;

        let mut log = self.load(id).await?;
        if log.contains_key(status.as_str()) {
            return Err(ProvenanceError::DuplicateTimestamp {
                request_id: request_id.to_string(),
                status,
            }
            .into());
        }

        log.insert(status.to_string(), now.timestamp().to_string());
        self.records
            .write_json(id, files::PROVENANCE, &log, &[])
            .await?;
        debug!(request_id = %id, status = %status, "provenance recorded");
        Ok(())
    }

    /// Every recorded status with its timestamp.
    pub async fn timestamps(&self, id: RequestId) -> WorkflowResult<BTreeMap<Status, DateTime<Utc>>> {
        self.load(id)
            .await?
            .into_iter()
            .map(|(status, seconds)| -> WorkflowResult<(Status, DateTime<Utc>)> {
                let status: Status = status.parse()?;
                let seconds: i64 = seconds.parse().map_err(|_| {
                    WorkflowError::Internal(format!("malformed provenance timestamp for {status}"))
                })?;
                let at = Utc.timestamp_opt(seconds, 0).single().ok_or_else(|| {
                    WorkflowError::Internal(format!("provenance timestamp out of range for {status}"))
                })?;
                Ok((status, at))
            })
            .collect()
    }
}
