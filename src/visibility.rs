use std::collections::HashSet;

use sqlx::MySqlPool;

use crate::errors::ApiError;
use crate::model::attendance::Attendance;
use crate::model::leave_request::LeaveRequest;
use crate::model::role::Role;

/// Which records a principal may see. Derived once from the role and reused
/// by every listing, so attendance and leave cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Employees see their own records only.
    Own(u64),
    /// Managers see records of everyone sharing their department.
    Department(String),
    /// HR sees everything.
    All,
}

impl Visibility {
    pub fn for_principal(user_id: u64, role: Role, department: &str) -> Visibility {
        match role {
            Role::Employee => Visibility::Own(user_id),
            Role::Manager => Visibility::Department(department.to_string()),
            Role::Hr => Visibility::All,
        }
    }

    /// Whether a record owned by `owner_id` falls inside this scope.
    /// `owner_department` is the record's own department when it carries
    /// one; department-scoped checks on records without it go through the
    /// user-directory lookup instead (see `attendance`).
    pub fn allows(&self, owner_id: u64, owner_department: Option<&str>) -> bool {
        match self {
            Visibility::Own(id) => *id == owner_id,
            Visibility::Department(dept) => owner_department == Some(dept.as_str()),
            Visibility::All => true,
        }
    }

    /// Attendance rows visible under this scope, newest first.
    ///
    /// Attendance rows do not carry a department, so the department scope
    /// resolves the member id set from the user directory first and then
    /// filters, exactly as written.
    pub async fn attendance(&self, pool: &MySqlPool) -> Result<Vec<Attendance>, ApiError> {
        const COLUMNS: &str =
            "id, user_id, name, date, clock_in_time, clock_out_time, clock_in, clock_out";
        match self {
            Visibility::Own(user_id) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM attendance WHERE user_id = ? ORDER BY date DESC, id DESC"
                );
                Ok(sqlx::query_as::<_, Attendance>(&sql)
                    .bind(user_id)
                    .fetch_all(pool)
                    .await?)
            }
            Visibility::Department(department) => {
                let members = department_member_ids(pool, department).await?;
                let sql = format!("SELECT {COLUMNS} FROM attendance ORDER BY date DESC, id DESC");
                let all = sqlx::query_as::<_, Attendance>(&sql).fetch_all(pool).await?;
                Ok(retain_members(all, &members))
            }
            Visibility::All => {
                let sql = format!("SELECT {COLUMNS} FROM attendance ORDER BY date DESC, id DESC");
                Ok(sqlx::query_as::<_, Attendance>(&sql).fetch_all(pool).await?)
            }
        }
    }

    /// Leave requests visible under this scope. Leave rows denormalize the
    /// submitter's department, so the scope maps directly onto the query.
    pub async fn leave_requests(&self, pool: &MySqlPool) -> Result<Vec<LeaveRequest>, ApiError> {
        const COLUMNS: &str = "id, user_id, name, department, leave_type, start_date, end_date, \
                               reason, manager_approval, hr_approval, status";
        match self {
            Visibility::Own(user_id) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM leave_requests WHERE user_id = ? ORDER BY id DESC"
                );
                Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
                    .bind(user_id)
                    .fetch_all(pool)
                    .await?)
            }
            Visibility::Department(department) => {
                let sql = format!(
                    "SELECT {COLUMNS} FROM leave_requests WHERE department = ? ORDER BY id DESC"
                );
                Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
                    .bind(department)
                    .fetch_all(pool)
                    .await?)
            }
            Visibility::All => {
                let sql = format!("SELECT {COLUMNS} FROM leave_requests ORDER BY id DESC");
                Ok(sqlx::query_as::<_, LeaveRequest>(&sql).fetch_all(pool).await?)
            }
        }
    }
}

/// Ids of every user belonging to a department.
async fn department_member_ids(
    pool: &MySqlPool,
    department: &str,
) -> Result<HashSet<u64>, ApiError> {
    let ids: Vec<(u64,)> = sqlx::query_as("SELECT id FROM users WHERE department = ?")
        .bind(department)
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

fn retain_members(records: Vec<Attendance>, members: &HashSet<u64>) -> Vec<Attendance> {
    records
        .into_iter()
        .filter(|r| members.contains(&r.user_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: u64, user_id: u64) -> Attendance {
        Attendance {
            id,
            user_id,
            name: format!("User {}", user_id),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            clock_in_time: None,
            clock_out_time: None,
            clock_in: true,
            clock_out: false,
        }
    }

    #[test]
    fn scope_follows_role() {
        assert_eq!(
            Visibility::for_principal(7, Role::Employee, "IT"),
            Visibility::Own(7)
        );
        assert_eq!(
            Visibility::for_principal(7, Role::Manager, "IT"),
            Visibility::Department("IT".into())
        );
        assert_eq!(Visibility::for_principal(7, Role::Hr, "IT"), Visibility::All);
    }

    #[test]
    fn employee_sees_only_own_records() {
        let scope = Visibility::Own(1);
        assert!(scope.allows(1, None));
        assert!(!scope.allows(2, None));
        assert!(!scope.allows(2, Some("IT")));
    }

    #[test]
    fn manager_sees_own_department_only() {
        let scope = Visibility::Department("IT".into());
        assert!(scope.allows(5, Some("IT")));
        assert!(!scope.allows(5, Some("Finance")));
        // without a department on the record the scope cannot admit it
        assert!(!scope.allows(5, None));
    }

    #[test]
    fn hr_sees_everything() {
        let scope = Visibility::All;
        assert!(scope.allows(1, None));
        assert!(scope.allows(99, Some("Finance")));
    }

    #[test]
    fn department_filter_keeps_member_records_only() {
        // users 1 and 2 are in IT, user 3 is in Finance
        let members: HashSet<u64> = [1, 2].into_iter().collect();
        let records = vec![record(10, 1), record(11, 3), record(12, 2)];
        let visible = retain_members(records, &members);
        assert_eq!(
            visible.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![10, 12]
        );
    }
}
