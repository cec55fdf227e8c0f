use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::classify::MatchRule;
use crate::models::{CanonicalRole, RolePair};

/// Stages of a reconciliation run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    Discovering,
    Updating,
    Verifying,
    Done,
    Failed,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discovering => "discovering",
            Self::Updating => "updating",
            Self::Verifying => "verifying",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// One bulk rewrite of a non-canonical `employeeRole` value.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub from: String,
    pub to: CanonicalRole,
    pub matched_by: MatchRule,
    pub rows_updated: usize,
}

/// One bulk rewrite of an inconsistent `(role, userRole)` pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairAlignment {
    pub from: RolePair,
    pub to: RolePair,
    pub rows_updated: usize,
}

/// A rewrite that the store rejected. The remaining values were still attempted.
#[derive(Debug, Clone, Serialize)]
pub struct WriteFailure {
    pub field: String,
    pub value: String,
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NonCanonicalEmployeeRole,
    LegacyAdminRole,
    RoleMismatch,
}

/// A record still violating a role invariant after the run.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationIssue {
    pub kind: IssueKind,
    pub record_id: i64,
    pub username: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub records_checked: usize,
    pub issues: Vec<VerificationIssue>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }
}

/// Overall verdict, for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Clean,
    VerificationMismatch,
    PartialFailure,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub phase: ReconcilePhase,
    pub employee_roles_found: Vec<String>,
    pub roles_to_clean: Vec<String>,
    pub conversions: Vec<Conversion>,
    pub pair_alignments: Vec<PairAlignment>,
    pub failures: Vec<WriteFailure>,
    pub verification: VerificationReport,
}

impl ReconcileReport {
    /// Bulk update statements issued, successful or not.
    pub fn write_operations(&self) -> usize {
        self.conversions.len() + self.pair_alignments.len() + self.failures.len()
    }

    pub fn employee_role_rows_updated(&self) -> usize {
        self.conversions.iter().map(|c| c.rows_updated).sum()
    }

    pub fn role_pair_rows_updated(&self) -> usize {
        self.pair_alignments.iter().map(|a| a.rows_updated).sum()
    }

    /// Values converted only because no keyword matched.
    pub fn fallback_conversions(&self) -> impl Iterator<Item = &Conversion> {
        self.conversions
            .iter()
            .filter(|c| c.matched_by == MatchRule::Fallback)
    }

    pub fn outcome(&self) -> ReconcileOutcome {
        if !self.failures.is_empty() {
            ReconcileOutcome::PartialFailure
        } else if !self.verification.is_clean() {
            ReconcileOutcome::VerificationMismatch
        } else {
            ReconcileOutcome::Clean
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome() == ReconcileOutcome::Clean
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Verification: {} records checked", self.records_checked)?;
        writeln!(
            f,
            "  non-canonical employeeRole: {}",
            self.count(IssueKind::NonCanonicalEmployeeRole)
        )?;
        writeln!(f, "  legacy admin role:          {}", self.count(IssueKind::LegacyAdminRole))?;
        writeln!(f, "  role != userRole:           {}", self.count(IssueKind::RoleMismatch))?;
        for issue in &self.issues {
            writeln!(f, "  ! #{} {}: {}", issue.record_id, issue.username, issue.description)?;
        }
        if self.is_clean() {
            writeln!(f, "Status: OK")
        } else {
            writeln!(f, "Status: MISMATCH ({} issues)", self.issues.len())
        }
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Role reconciliation at {}", self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "employeeRole values found: {}", self.employee_roles_found.len())?;
        for value in &self.employee_roles_found {
            writeln!(f, "  - {value}")?;
        }

        if self.conversions.is_empty() && self.pair_alignments.is_empty() && self.failures.is_empty() {
            writeln!(f, "Nothing to convert")?;
        }
        for c in &self.conversions {
            let flag = if c.matched_by == MatchRule::Fallback { "  [fallback, review]" } else { "" };
            writeln!(f, "  {:?} -> {:?} ({} rows){flag}", c.from, c.to.as_str(), c.rows_updated)?;
        }
        for a in &self.pair_alignments {
            writeln!(f, "  role/userRole {} -> {} ({} rows)", a.from, a.to, a.rows_updated)?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "  FAILED {} {:?} -> {:?}: {}",
                failure.field, failure.value, failure.target, failure.error
            )?;
        }
        writeln!(
            f,
            "Writes: {} statements, {} employeeRole rows, {} role/userRole rows",
            self.write_operations(),
            self.employee_role_rows_updated(),
            self.role_pair_rows_updated()
        )?;
        write!(f, "{}", self.verification)
    }
}
