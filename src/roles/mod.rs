//! Role reconciliation for the `users` table.
//!
//! ```text
//! Discovering -> Updating -> Verifying -> Done | Failed
//! ```
//!
//! `employeeRole` values move one way, from free text to the canonical
//! vocabulary. `(role, userRole)` pairs move one way, from inconsistent to
//! consistent. Nothing here converts a canonical value back.

pub mod classify;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod verify;

pub use classify::{classify_and_normalize, classify_with_rule, MatchRule};
pub use error::ReconcileError;
pub use reconcile::{list_distinct_role_values, reconcile, role_dump};
pub use report::*;
pub use verify::{verify, verify_records};
