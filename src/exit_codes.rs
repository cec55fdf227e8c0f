//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; maintenance scripts rely on them.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success, store verified clean                         |
//! | 1    | General error                                         |
//! | 2    | CLI usage error (clap)                                |
//! | 3    | Verification found remaining inconsistencies          |
//! | 4    | User store could not be opened                        |
//! | 5    | One or more bulk rewrites failed                      |
//! | 6    | Password check did not match                          |

use clinic_roles::roles::ReconcileOutcome;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments. Emitted by clap itself.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Post-run scan still found non-canonical or mismatched roles.
pub const EXIT_VERIFY_MISMATCH: u8 = 3;

/// Database file missing, unreadable, or without a `users` table.
pub const EXIT_STORE_UNAVAILABLE: u8 = 4;

/// At least one per-value update was rejected by the store.
pub const EXIT_WRITE_FAILURE: u8 = 5;

/// Candidate password did not verify.
pub const EXIT_AUTH_FAILED: u8 = 6;

pub fn outcome_exit_code(outcome: ReconcileOutcome) -> u8 {
    match outcome {
        ReconcileOutcome::Clean => EXIT_SUCCESS,
        ReconcileOutcome::VerificationMismatch => EXIT_VERIFY_MISMATCH,
        ReconcileOutcome::PartialFailure => EXIT_WRITE_FAILURE,
    }
}
