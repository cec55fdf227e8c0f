//! Hard failures of a reconciliation run.
//!
//! Per-value write failures and verification findings are not errors: they
//! are recorded in the report so the other values still get converted.

use thiserror::Error;

use super::report::ReconcilePhase;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("User store unavailable: {0}")]
    StoreUnavailable(#[source] DatabaseError),

    #[error("Read failed while {phase}: {source}")]
    ReadFailure {
        phase: ReconcilePhase,
        #[source]
        source: DatabaseError,
    },
}

impl ReconcileError {
    pub(crate) fn read(phase: ReconcilePhase) -> impl FnOnce(DatabaseError) -> Self {
        move |source| {
            tracing::error!(%phase, error = %source, "User store read failed");
            Self::ReadFailure { phase, source }
        }
    }
}
