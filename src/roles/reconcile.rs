//! Role reconciliation pipeline: discover -> update -> verify.
//!
//! Every bulk update returns before verification starts, so the verification
//! scan always observes the complete set of writes.

use chrono::Utc;

use super::classify::{classify_with_rule, MatchRule};
use super::error::ReconcileError;
use super::report::*;
use super::verify::verify;
use crate::db::UserStore;
use crate::models::{CanonicalRole, RoleField, RolePair};

/// Distinct non-null, non-empty values stored in `field`, sorted lexically.
pub fn list_distinct_role_values<S: UserStore + ?Sized>(
    store: &S,
    field: RoleField,
) -> Result<Vec<String>, ReconcileError> {
    store
        .query_distinct(field)
        .map_err(ReconcileError::read(ReconcilePhase::Discovering))
}

/// Distinct values for each of the three role columns.
pub fn role_dump<S: UserStore + ?Sized>(
    store: &S,
) -> Result<Vec<(RoleField, Vec<String>)>, ReconcileError> {
    RoleField::ALL
        .iter()
        .map(|field| -> Result<_, ReconcileError> {
            Ok((*field, list_distinct_role_values(store, *field)?))
        })
        .collect()
}

/// Bring every record's role fields into the canonical vocabulary and verify.
///
/// Write failures are per value: they are logged, recorded in the report and
/// the remaining values are still attempted. Read failures abort the run.
pub fn reconcile<S: UserStore + ?Sized>(store: &S) -> Result<ReconcileReport, ReconcileError> {
    let started_at = Utc::now();

    tracing::debug!(phase = %ReconcilePhase::Discovering, "Reconciliation started");
    let employee_roles_found = list_distinct_role_values(store, RoleField::EmployeeRole)?;
    let roles_to_clean: Vec<String> = employee_roles_found
        .iter()
        .filter(|v| !CanonicalRole::is_canonical(v))
        .cloned()
        .collect();
    let pairs_to_align: Vec<RolePair> = store
        .distinct_role_pairs()
        .map_err(ReconcileError::read(ReconcilePhase::Discovering))?
        .into_iter()
        .filter(|pair| !pair.is_consistent())
        .collect();
    tracing::info!(
        found = employee_roles_found.len(),
        to_clean = roles_to_clean.len(),
        pairs_to_align = pairs_to_align.len(),
        "Discovered role values"
    );

    tracing::debug!(phase = %ReconcilePhase::Updating, "Applying rewrites");
    let mut conversions = Vec::new();
    let mut failures = Vec::new();

    for value in &roles_to_clean {
        let (target, matched_by) = classify_with_rule(value);
        if matched_by == MatchRule::Fallback {
            tracing::warn!(value = %value, canonical = %target, "No keyword matched, using fallback role");
        }
        match store.update_where(RoleField::EmployeeRole, value, target.as_str()) {
            Ok(rows_updated) => {
                tracing::info!(from = %value, to = %target, rows = rows_updated, "Converted employeeRole");
                conversions.push(Conversion {
                    from: value.clone(),
                    to: target,
                    matched_by,
                    rows_updated,
                });
            }
            Err(e) => {
                tracing::error!(
                    value = %value,
                    canonical = %target,
                    operation = "update_where",
                    error = %e,
                    "Failed to convert employeeRole"
                );
                failures.push(WriteFailure {
                    field: RoleField::EmployeeRole.as_str().into(),
                    value: value.clone(),
                    target: target.as_str().into(),
                    error: e.to_string(),
                });
            }
        }
    }

    let mut pair_alignments = Vec::new();
    for pair in pairs_to_align {
        let target = pair.aligned();
        match store.update_role_pair(&pair, &target) {
            Ok(rows_updated) => {
                tracing::info!(from = %pair, to = %target, rows = rows_updated, "Aligned role/userRole");
                pair_alignments.push(PairAlignment {
                    from: pair,
                    to: target,
                    rows_updated,
                });
            }
            Err(e) => {
                tracing::error!(
                    pair = %pair,
                    operation = "update_role_pair",
                    error = %e,
                    "Failed to align role/userRole"
                );
                failures.push(WriteFailure {
                    field: "role/userRole".into(),
                    value: pair.to_string(),
                    target: target.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::debug!(phase = %ReconcilePhase::Verifying, "All rewrites acknowledged");
    let verification = verify(store)?;

    let phase = if failures.is_empty() {
        ReconcilePhase::Done
    } else {
        ReconcilePhase::Failed
    };

    let report = ReconcileReport {
        started_at,
        phase,
        employee_roles_found,
        roles_to_clean,
        conversions,
        pair_alignments,
        failures,
        verification,
    };

    tracing::info!(
        outcome = ?report.outcome(),
        writes = report.write_operations(),
        rows = report.employee_role_rows_updated() + report.role_pair_rows_updated(),
        "Reconciliation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeSet;

    use super::*;
    use crate::db::{insert_user, DatabaseError, SqliteUserStore};
    use crate::models::{UserRecord, ADMINISTRATOR};

    fn test_store() -> SqliteUserStore {
        SqliteUserStore::open_in_memory().unwrap()
    }

    fn employee_roles(store: &SqliteUserStore) -> BTreeSet<String> {
        store
            .query_distinct(RoleField::EmployeeRole)
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn scenario_front_desk_and_hygienist() {
        let store = test_store();
        let conn = store.connection();
        insert_user(conn, "a", "pw", Some("staff"), Some("staff"), Some("Front Desk")).unwrap();
        insert_user(conn, "b", "pw", Some("staff"), Some("staff"), Some("Front Desk")).unwrap();
        insert_user(conn, "c", "pw", Some("staff"), Some("staff"), Some("Dental Hygienist")).unwrap();
        insert_user(conn, "d", "pw", Some("staff"), Some("staff"), Some("Dentist")).unwrap();

        let report = reconcile(&store).unwrap();

        assert_eq!(
            employee_roles(&store),
            BTreeSet::from([
                "Receptionist".to_string(),
                "Assistant Dentist".to_string(),
                "Dentist".to_string(),
            ])
        );
        assert_eq!(report.employee_role_rows_updated(), 3);
        assert_eq!(report.roles_to_clean, vec!["Dental Hygienist", "Front Desk"]);
        assert!(report.is_success());
    }

    #[test]
    fn legacy_admin_pair_becomes_administrator() {
        let store = test_store();
        insert_user(store.connection(), "root", "pw", Some("admin"), Some("admin"), None).unwrap();

        let report = reconcile(&store).unwrap();
        let record = &store.scan_all().unwrap()[0];
        assert_eq!(record.role.as_deref(), Some(ADMINISTRATOR));
        assert_eq!(record.user_role.as_deref(), Some(ADMINISTRATOR));
        assert_eq!(report.role_pair_rows_updated(), 1);
    }

    #[test]
    fn mismatched_pair_aligns_to_role() {
        let store = test_store();
        let conn = store.connection();
        insert_user(conn, "a", "pw", Some("staff"), Some("employee"), None).unwrap();
        insert_user(conn, "b", "pw", Some("ADMIN"), Some("staff"), None).unwrap();
        insert_user(conn, "c", "pw", None, Some("staff"), None).unwrap();

        reconcile(&store).unwrap();
        let records = store.scan_all().unwrap();
        assert_eq!(records[0].user_role.as_deref(), Some("staff"));
        assert_eq!(records[1].role.as_deref(), Some(ADMINISTRATOR));
        assert_eq!(records[1].user_role.as_deref(), Some(ADMINISTRATOR));
        assert_eq!(records[2].role.as_deref(), Some("staff"));
        for r in &records {
            assert_eq!(r.role, r.user_role);
        }
    }

    #[test]
    fn second_run_performs_no_writes() {
        let store = test_store();
        let conn = store.connection();
        insert_user(conn, "a", "pw", Some("admin"), Some("Admin"), Some("Office Manager")).unwrap();
        insert_user(conn, "b", "pw", Some("staff"), None, Some("front desk")).unwrap();
        insert_user(conn, "c", "pw", None, None, Some("hygienist")).unwrap();

        let first = reconcile(&store).unwrap();
        assert!(first.write_operations() > 0);
        assert!(first.verification.is_clean());
        let after_first = store.scan_all().unwrap();

        let second = reconcile(&store).unwrap();
        assert_eq!(second.write_operations(), 0);
        assert!(second.verification.is_clean());
        assert_eq!(store.scan_all().unwrap(), after_first);
    }

    #[test]
    fn clean_store_is_a_no_op() {
        let store = test_store();
        let conn = store.connection();
        insert_user(conn, "a", "pw", Some(ADMINISTRATOR), Some(ADMINISTRATOR), Some("Dentist")).unwrap();
        insert_user(conn, "b", "pw", Some("staff"), Some("staff"), Some("Receptionist")).unwrap();
        insert_user(conn, "c", "pw", None, None, None).unwrap();

        let report = reconcile(&store).unwrap();
        assert_eq!(report.write_operations(), 0);
        assert!(report.conversions.is_empty());
        assert_eq!(report.verification.issues.len(), 0);
        assert_eq!(report.phase, ReconcilePhase::Done);
    }

    #[test]
    fn untouched_columns_stay_intact() {
        let store = test_store();
        insert_user(store.connection(), "keep", "secret", Some("admin"), None, Some("Nurse")).unwrap();

        reconcile(&store).unwrap();
        let record = &store.scan_all().unwrap()[0];
        assert_eq!(record.username, "keep");
        assert_eq!(record.password, "secret");
        assert_eq!(record.status.as_deref(), Some("active"));
    }

    #[test]
    fn fallback_conversions_are_flagged() {
        let store = test_store();
        insert_user(store.connection(), "a", "pw", None, None, Some("Office Manager")).unwrap();

        let report = reconcile(&store).unwrap();
        let flagged: Vec<_> = report.fallback_conversions().collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].to, CanonicalRole::Dentist);
    }

    #[test]
    fn role_dump_covers_every_field() {
        let store = test_store();
        insert_user(store.connection(), "a", "pw", Some("admin"), Some("staff"), Some("Dentist")).unwrap();

        let dump = role_dump(&store).unwrap();
        assert_eq!(
            dump,
            vec![
                (RoleField::Role, vec!["admin".to_string()]),
                (RoleField::UserRole, vec!["staff".to_string()]),
                (RoleField::EmployeeRole, vec!["Dentist".to_string()]),
            ]
        );
    }

    /// Wraps a real store and rejects updates for selected values.
    struct FlakyStore {
        inner: SqliteUserStore,
        reject: &'static str,
        reject_pair: Option<RolePair>,
        fail_scan: bool,
        attempted: RefCell<Vec<String>>,
        attempted_pairs: RefCell<Vec<RolePair>>,
    }

    impl UserStore for FlakyStore {
        fn query_distinct(&self, field: RoleField) -> Result<Vec<String>, DatabaseError> {
            self.inner.query_distinct(field)
        }

        fn update_where(&self, field: RoleField, match_value: &str, new_value: &str) -> Result<usize, DatabaseError> {
            self.attempted.borrow_mut().push(match_value.to_string());
            if match_value == self.reject {
                return Err(DatabaseError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.inner.update_where(field, match_value, new_value)
        }

        fn distinct_role_pairs(&self) -> Result<Vec<RolePair>, DatabaseError> {
            self.inner.distinct_role_pairs()
        }

        fn update_role_pair(&self, current: &RolePair, new: &RolePair) -> Result<usize, DatabaseError> {
            self.attempted_pairs.borrow_mut().push(current.clone());
            if self.reject_pair.as_ref() == Some(current) {
                return Err(DatabaseError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.inner.update_role_pair(current, new)
        }

        fn scan_all(&self) -> Result<Vec<UserRecord>, DatabaseError> {
            if self.fail_scan {
                return Err(DatabaseError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.inner.scan_all()
        }
    }

    fn flaky(reject: &'static str, fail_scan: bool) -> FlakyStore {
        let inner = test_store();
        let conn = inner.connection();
        insert_user(conn, "a", "pw", None, None, Some("Front Desk")).unwrap();
        insert_user(conn, "b", "pw", None, None, Some("Hygienist")).unwrap();
        insert_user(conn, "c", "pw", None, None, Some("Nurse")).unwrap();
        FlakyStore {
            inner,
            reject,
            reject_pair: None,
            fail_scan,
            attempted: RefCell::new(Vec::new()),
            attempted_pairs: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn write_failure_does_not_stop_other_values() {
        let store = flaky("Hygienist", false);

        let report = reconcile(&store).unwrap();
        assert_eq!(*store.attempted.borrow(), vec!["Front Desk", "Hygienist", "Nurse"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].value, "Hygienist");
        assert_eq!(report.conversions.len(), 2);
        assert_eq!(report.phase, ReconcilePhase::Failed);
        assert_eq!(report.outcome(), ReconcileOutcome::PartialFailure);
        assert_eq!(report.verification.count(IssueKind::NonCanonicalEmployeeRole), 1);
    }

    #[test]
    fn pair_write_failure_does_not_stop_other_pairs() {
        let mut store = flaky("", false);
        let conn = store.inner.connection();
        insert_user(conn, "root", "pw", Some("admin"), Some("admin"), Some("Dentist")).unwrap();
        insert_user(conn, "desk", "pw", Some("staff"), Some("employee"), Some("Receptionist")).unwrap();
        insert_user(conn, "new", "pw", Some("trainee"), None, Some("Dentist")).unwrap();
        store.reject_pair = Some(RolePair::new(Some("staff"), Some("employee")));

        let report = reconcile(&store).unwrap();
        assert_eq!(
            *store.attempted_pairs.borrow(),
            vec![
                RolePair::new(Some("admin"), Some("admin")),
                RolePair::new(Some("staff"), Some("employee")),
                RolePair::new(Some("trainee"), None),
            ]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].field, "role/userRole");
        assert_eq!(report.failures[0].value, "staff/employee");
        assert_eq!(report.failures[0].target, "staff/staff");
        assert_eq!(report.pair_alignments.len(), 2);
        assert_eq!(report.outcome(), ReconcileOutcome::PartialFailure);
        assert_eq!(report.verification.count(IssueKind::RoleMismatch), 1);

        let records = store.inner.scan_all().unwrap();
        let by_name = |name: &str| records.iter().find(|r| r.username == name).unwrap().clone();
        assert_eq!(by_name("root").role_pair(), RolePair::new(Some(ADMINISTRATOR), Some(ADMINISTRATOR)));
        assert_eq!(by_name("new").role_pair(), RolePair::new(Some("trainee"), Some("trainee")));
        assert_eq!(by_name("desk").role_pair(), RolePair::new(Some("staff"), Some("employee")));
    }

    #[test]
    fn verification_read_failure_is_fatal() {
        let store = flaky("", true);

        let err = reconcile(&store).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::ReadFailure { phase: ReconcilePhase::Verifying, .. }
        ));
        // Updates already applied are kept.
        assert_eq!(
            store.inner.query_distinct(RoleField::EmployeeRole).unwrap(),
            vec!["Assistant Dentist", "Dentist", "Receptionist"]
        );
    }
}
