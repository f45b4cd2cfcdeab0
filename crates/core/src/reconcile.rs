//! Pure reconciliation planning.
//!
//! Given the stored record and the backend's live status, decide whether the
//! record must be repaired. The API's reconciler applies the decision through
//! the store; keeping the decision here makes it testable without a queue.

use crate::backend_status::{map_backend_status, BackendStatus};
use crate::error::CoreError;
use crate::record::TaskRecord;
use crate::result::SuccessPayload;
use crate::status::TaskStatus;

/// A write that brings the stored record in line with the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Repair {
    /// `PENDING -> PROCESSING`.
    MarkProcessing,
    /// Worker finished but its terminal write did not land.
    Complete(SuccessPayload),
    /// Worker gave up but its terminal write did not land.
    Fail(String),
}

impl Repair {
    pub fn target(&self) -> TaskStatus {
        match self {
            Repair::MarkProcessing => TaskStatus::Processing,
            Repair::Complete(_) => TaskStatus::Done,
            Repair::Fail(_) => TaskStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Stored status already matches, or the backend knows nothing.
    InSync,
    /// Apply this repair.
    Repair(Repair),
    /// The backend reports a status the record may not move to (a regression
    /// or a terminal flip). The stored record wins.
    Ignored { backend: TaskStatus },
}

/// Decide how to reconcile `record` against `backend`.
///
/// Fails only when a `succeeded` result cannot be decoded for the record's
/// task kind.
pub fn plan(record: &TaskRecord, backend: &BackendStatus) -> Result<Decision, CoreError> {
    let Some(mapped) = map_backend_status(backend) else {
        return Ok(Decision::InSync);
    };
    if mapped == record.status {
        return Ok(Decision::InSync);
    }
    if !record.status.can_transition_to(mapped) {
        return Ok(Decision::Ignored { backend: mapped });
    }

    let repair = match backend {
        BackendStatus::Started => Repair::MarkProcessing,
        BackendStatus::Succeeded { result } => {
            Repair::Complete(SuccessPayload::from_json(record.task_name, result)?)
        }
        BackendStatus::Failed { error } => Repair::Fail(error.clone()),
        // Queued maps to PENDING, which is never a legal target, and Unknown
        // returned above.
        BackendStatus::Queued | BackendStatus::Unknown => {
            return Ok(Decision::Ignored { backend: mapped })
        }
    };
    Ok(Decision::Repair(repair))
}
