use super::error::ReconcileError;
use super::report::{IssueKind, ReconcilePhase, VerificationIssue, VerificationReport};
use crate::db::UserStore;
use crate::models::{is_legacy_admin, CanonicalRole, UserRecord};

/// Scan every record and report role invariant violations. Read-only.
pub fn verify<S: UserStore + ?Sized>(store: &S) -> Result<VerificationReport, ReconcileError> {
    let records = store
        .scan_all()
        .map_err(ReconcileError::read(ReconcilePhase::Verifying))?;
    let report = verify_records(&records);
    if report.is_clean() {
        tracing::info!(records = report.records_checked, "Role verification clean");
    } else {
        tracing::warn!(
            records = report.records_checked,
            issues = report.issues.len(),
            "Role verification found inconsistencies"
        );
    }
    Ok(report)
}

pub fn verify_records(records: &[UserRecord]) -> VerificationReport {
    let mut issues = Vec::new();

    for record in records {
        let mut push = |kind, description: String| {
            issues.push(VerificationIssue {
                kind,
                record_id: record.id,
                username: record.username.clone(),
                description,
            })
        };

        if let Some(employee_role) = record.employee_role.as_deref() {
            if !employee_role.is_empty() && !CanonicalRole::is_canonical(employee_role) {
                push(
                    IssueKind::NonCanonicalEmployeeRole,
                    format!("employeeRole {employee_role:?} is not canonical"),
                );
            }
        }

        for (name, value) in [("role", &record.role), ("userRole", &record.user_role)] {
            if let Some(v) = value.as_deref().filter(|v| is_legacy_admin(v)) {
                push(IssueKind::LegacyAdminRole, format!("{name} holds legacy literal {v:?}"));
            }
        }

        if record.role != record.user_role {
            push(
                IssueKind::RoleMismatch,
                format!("role {:?} != userRole {:?}", record.role, record.user_role),
            );
        }
    }

    VerificationReport {
        records_checked: records.len(),
        issues,
    }
}
