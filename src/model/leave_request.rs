use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::errors::ApiError;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::Type,
    Display,
    EnumString,
    ToSchema,
)]
pub enum LeaveType {
    Annual,
    Sick,
    Family,
    Study,
    Other,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::Type,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Approval {
    Pending,
    Approved,
    Rejected,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::Type,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Granted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub department: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub manager_approval: Approval,
    pub hr_approval: Approval,
    pub status: LeaveStatus,
}

impl LeaveRequest {
    /// Classify the stored (manager, hr, status) triple. Rows written by
    /// this service always match one of the five states; anything else is
    /// corrupt data in the store.
    pub fn state(&self) -> Result<LeaveState, ApiError> {
        LeaveState::from_fields(self.manager_approval, self.hr_approval, self.status).ok_or_else(
            || {
                ApiError::Inconsistent(format!(
                    "leave request {} holds approval fields ({}, {}, {}) matching no known state",
                    self.id, self.manager_approval, self.hr_approval, self.status
                ))
            },
        )
    }

    /// Overall label for listings, derived directly from the stored fields
    /// so it stays total even on rows `state` would refuse: rejected status
    /// wins, then HR approval, then manager approval.
    pub fn label(&self) -> &'static str {
        if self.status == LeaveStatus::Rejected {
            "Rejected"
        } else if self.hr_approval == Approval::Approved {
            "Granted"
        } else if self.manager_approval == Approval::Approved {
            "Manager Approved (awaiting HR)"
        } else {
            "Pending"
        }
    }
}

/// Who is deciding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReviewStage {
    Manager,
    Hr,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

/// Lifecycle of a leave request. The stored (manager_approval,
/// hr_approval, status) triple is a projection of this enum; every write
/// goes through `apply`, so an inconsistent triple cannot be produced.
///
/// ```text
/// Submitted ──manager approve──▶ ManagerApproved ──hr approve──▶ Granted
///     │                                │
///     └──manager reject──▶ ManagerRejected (terminal)
///                                      └──hr reject──▶ HrRejected (terminal)
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LeaveState {
    Submitted,
    ManagerApproved,
    ManagerRejected,
    Granted,
    HrRejected,
}

impl LeaveState {
    pub fn from_fields(
        manager: Approval,
        hr: Approval,
        status: LeaveStatus,
    ) -> Option<LeaveState> {
        use Approval::*;
        match (manager, hr, status) {
            (Pending, Pending, LeaveStatus::Pending) => Some(LeaveState::Submitted),
            (Approved, Pending, LeaveStatus::Pending) => Some(LeaveState::ManagerApproved),
            (Rejected, Pending, LeaveStatus::Rejected) => Some(LeaveState::ManagerRejected),
            (Approved, Approved, LeaveStatus::Granted) => Some(LeaveState::Granted),
            (Approved, Rejected, LeaveStatus::Rejected) => Some(LeaveState::HrRejected),
            _ => None,
        }
    }

    /// The stored projection of this state.
    pub fn fields(self) -> (Approval, Approval, LeaveStatus) {
        match self {
            LeaveState::Submitted => (Approval::Pending, Approval::Pending, LeaveStatus::Pending),
            LeaveState::ManagerApproved => {
                (Approval::Approved, Approval::Pending, LeaveStatus::Pending)
            }
            LeaveState::ManagerRejected => {
                (Approval::Rejected, Approval::Pending, LeaveStatus::Rejected)
            }
            LeaveState::Granted => (Approval::Approved, Approval::Approved, LeaveStatus::Granted),
            LeaveState::HrRejected => {
                (Approval::Approved, Approval::Rejected, LeaveStatus::Rejected)
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveState::Submitted | LeaveState::ManagerApproved)
    }

    /// The only way a request moves between states. Returns the next state
    /// or the reason the action is not allowed. A manager can only decide a
    /// freshly submitted request; HR can only decide a manager-approved
    /// one; terminal states accept nothing.
    pub fn apply(self, stage: ReviewStage, decision: Decision) -> Result<LeaveState, ApiError> {
        match (self, stage, decision) {
            (LeaveState::Submitted, ReviewStage::Manager, Decision::Approve) => {
                Ok(LeaveState::ManagerApproved)
            }
            (LeaveState::Submitted, ReviewStage::Manager, Decision::Reject) => {
                Ok(LeaveState::ManagerRejected)
            }
            (LeaveState::Submitted, ReviewStage::Hr, _) => Err(ApiError::IllegalTransition(
                "manager has not decided this request yet".into(),
            )),
            (LeaveState::ManagerApproved, ReviewStage::Hr, Decision::Approve) => {
                Ok(LeaveState::Granted)
            }
            (LeaveState::ManagerApproved, ReviewStage::Hr, Decision::Reject) => {
                Ok(LeaveState::HrRejected)
            }
            (LeaveState::ManagerApproved, ReviewStage::Manager, _) => Err(
                ApiError::IllegalTransition("request already approved by manager".into()),
            ),
            (state, _, _) => {
                debug_assert!(state.is_terminal());
                Err(ApiError::IllegalTransition(
                    "request has already been processed".into(),
                ))
            }
        }
    }

    /// Overall label shown in listings, combining both approval stages.
    pub fn label(self) -> &'static str {
        match self {
            LeaveState::Submitted => "Pending",
            LeaveState::ManagerApproved => "Manager Approved (awaiting HR)",
            LeaveState::ManagerRejected | LeaveState::HrRejected => "Rejected",
            LeaveState::Granted => "Granted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [LeaveState; 5] = [
        LeaveState::Submitted,
        LeaveState::ManagerApproved,
        LeaveState::ManagerRejected,
        LeaveState::Granted,
        LeaveState::HrRejected,
    ];

    #[test]
    fn fields_round_trip() {
        for state in ALL_STATES {
            let (m, h, s) = state.fields();
            assert_eq!(LeaveState::from_fields(m, h, s), Some(state));
        }
    }

    #[test]
    fn unknown_triples_do_not_classify() {
        // e.g. hr approved while manager is still pending
        assert_eq!(
            LeaveState::from_fields(Approval::Pending, Approval::Approved, LeaveStatus::Granted),
            None
        );
        assert_eq!(
            LeaveState::from_fields(Approval::Pending, Approval::Pending, LeaveStatus::Granted),
            None
        );
    }

    #[test]
    fn manager_decides_submitted_request() {
        let approved = LeaveState::Submitted
            .apply(ReviewStage::Manager, Decision::Approve)
            .unwrap();
        assert_eq!(approved, LeaveState::ManagerApproved);
        assert_eq!(
            approved.fields(),
            (Approval::Approved, Approval::Pending, LeaveStatus::Pending)
        );

        let rejected = LeaveState::Submitted
            .apply(ReviewStage::Manager, Decision::Reject)
            .unwrap();
        assert_eq!(rejected, LeaveState::ManagerRejected);
        // hr_approval stays pending, overall status flips to rejected
        assert_eq!(
            rejected.fields(),
            (Approval::Rejected, Approval::Pending, LeaveStatus::Rejected)
        );
    }

    #[test]
    fn hr_cannot_act_before_manager() {
        for decision in [Decision::Approve, Decision::Reject] {
            let err = LeaveState::Submitted
                .apply(ReviewStage::Hr, decision)
                .unwrap_err();
            assert!(matches!(err, ApiError::IllegalTransition(_)));
        }
        // the stored projection is untouched by a failed action
        assert_eq!(
            LeaveState::Submitted.fields(),
            (Approval::Pending, Approval::Pending, LeaveStatus::Pending)
        );
    }

    #[test]
    fn hr_decides_manager_approved_request() {
        let granted = LeaveState::ManagerApproved
            .apply(ReviewStage::Hr, Decision::Approve)
            .unwrap();
        assert_eq!(granted, LeaveState::Granted);

        let rejected = LeaveState::ManagerApproved
            .apply(ReviewStage::Hr, Decision::Reject)
            .unwrap();
        assert_eq!(
            rejected.fields(),
            (Approval::Approved, Approval::Rejected, LeaveStatus::Rejected)
        );
    }

    #[test]
    fn manager_cannot_redecide() {
        let err = LeaveState::ManagerApproved
            .apply(ReviewStage::Manager, Decision::Approve)
            .unwrap_err();
        assert!(matches!(err, ApiError::IllegalTransition(_)));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for state in [
            LeaveState::ManagerRejected,
            LeaveState::Granted,
            LeaveState::HrRejected,
        ] {
            assert!(state.is_terminal());
            for stage in [ReviewStage::Manager, ReviewStage::Hr] {
                for decision in [Decision::Approve, Decision::Reject] {
                    let err = state.apply(stage, decision).unwrap_err();
                    assert!(matches!(err, ApiError::IllegalTransition(_)));
                }
            }
        }
    }

    #[test]
    fn manager_rejection_is_final_for_hr() {
        let rejected = LeaveState::Submitted
            .apply(ReviewStage::Manager, Decision::Reject)
            .unwrap();
        let err = rejected.apply(ReviewStage::Hr, Decision::Approve).unwrap_err();
        assert!(matches!(err, ApiError::IllegalTransition(_)));
    }

    #[test]
    fn labels() {
        assert_eq!(LeaveState::Submitted.label(), "Pending");
        assert_eq!(
            LeaveState::ManagerApproved.label(),
            "Manager Approved (awaiting HR)"
        );
        assert_eq!(LeaveState::Granted.label(), "Granted");
        assert_eq!(LeaveState::ManagerRejected.label(), "Rejected");
        assert_eq!(LeaveState::HrRejected.label(), "Rejected");
    }

    #[test]
    fn row_label_agrees_with_state_label() {
        for state in ALL_STATES {
            let (manager_approval, hr_approval, status) = state.fields();
            let row = LeaveRequest {
                id: 1,
                user_id: 42,
                name: "Jane Doe".into(),
                department: "IT".into(),
                leave_type: LeaveType::Annual,
                start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
                reason: "Family trip".into(),
                manager_approval,
                hr_approval,
                status,
            };
            assert_eq!(row.label(), state.label());
            assert_eq!(row.state().unwrap(), state);
        }
    }

    #[test]
    fn submission_through_grant_scenario() {
        // employee submits: everything pending
        let mut state = LeaveState::Submitted;
        assert_eq!(state.label(), "Pending");

        // manager in the same department approves
        state = state.apply(ReviewStage::Manager, Decision::Approve).unwrap();
        assert_eq!(state.label(), "Manager Approved (awaiting HR)");

        // HR grants
        state = state.apply(ReviewStage::Hr, Decision::Approve).unwrap();
        assert_eq!(
            state.fields(),
            (Approval::Approved, Approval::Approved, LeaveStatus::Granted)
        );
        assert_eq!(state.label(), "Granted");
    }
}
