use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::errors::ApiError;
use crate::model::leave_request::{
    Approval, Decision, LeaveRequest, LeaveState, LeaveStatus, LeaveType, ReviewStage,
};

const LEAVE_COLUMNS: &str = "id, user_id, name, department, leave_type, start_date, end_date, \
                             reason, manager_approval, hr_approval, status";

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "Annual")]
    pub leave_type: LeaveType,
    #[schema(example = "2024-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family trip")]
    pub reason: String,
}

impl CreateLeave {
    /// Submission preconditions; nothing is written when these fail.
    fn validate(&self) -> Result<(), ApiError> {
        if self.end_date < self.start_date {
            return Err(ApiError::Validation(
                "End date cannot be before start date".into(),
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(ApiError::Validation("Reason must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Deserialize, ToSchema)]
pub struct DecisionReq {
    #[schema(example = "approve")]
    pub decision: Decision,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "IT")]
    pub department: String,
    pub leave_type: LeaveType,
    #[schema(example = "2024-06-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-06-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    pub manager_approval: Approval,
    pub hr_approval: Approval,
    pub status: LeaveStatus,
    /// Overall label combining both approval stages
    #[schema(example = "Manager Approved (awaiting HR)", value_type = String)]
    pub overall: &'static str,
}

impl From<LeaveRequest> for LeaveResponse {
    fn from(req: LeaveRequest) -> Self {
        let overall = req.label();
        LeaveResponse {
            id: req.id,
            user_id: req.user_id,
            name: req.name,
            department: req.department,
            leave_type: req.leave_type,
            start_date: req.start_date,
            end_date: req.end_date,
            reason: req.reason,
            manager_approval: req.manager_approval,
            hr_approval: req.hr_approval,
            status: req.status,
            overall,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
}

/// Decision outcome plus the reviewer's refreshed scope, mirroring the
/// post-write re-fetch the client would otherwise issue.
#[derive(Serialize, ToSchema)]
pub struct DecisionResponse {
    #[schema(example = "Leave request approved")]
    pub message: String,
    /// Display label of the request after this write
    #[schema(example = "Manager Approved (awaiting HR)", value_type = String)]
    pub state: &'static str,
    pub requests: Vec<LeaveResponse>,
}

async fn fetch_leave(pool: &MySqlPool, id: u64) -> Result<LeaveRequest, ApiError> {
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Leave request {} not found", id)))
}

/// Write the projection of a state back to the store. The state enum is the
/// only source of the stored triple.
async fn persist_state(pool: &MySqlPool, id: u64, state: LeaveState) -> Result<(), ApiError> {
    let (manager_approval, hr_approval, status) = state.fields();
    sqlx::query(
        r#"UPDATE leave_requests
           SET manager_approval = ?, hr_approval = ?, status = ?
           WHERE id = ?"#,
    )
    .bind(manager_approval)
    .bind(hr_approval)
    .bind(status)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn refreshed_requests(
    pool: &MySqlPool,
    auth: &AuthUser,
) -> Result<Vec<LeaveResponse>, ApiError> {
    let requests = auth.visibility().leave_requests(pool).await?;
    Ok(requests.into_iter().map(LeaveResponse::from).collect())
}

/// Role-scoped leave request listing
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    responses(
        (status = 200, description = "Leave requests visible to the caller", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let data = refreshed_requests(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(LeaveListResponse { data }))
}

/// Submit a leave request
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body = CreateLeave,
    responses(
        (status = 200, description = "Leave request submitted", body = DecisionResponse),
        (status = 400, description = "Invalid dates or empty reason"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    payload.validate()?;

    let (manager_approval, hr_approval, status) = LeaveState::Submitted.fields();
    sqlx::query(
        r#"INSERT INTO leave_requests
           (user_id, name, department, leave_type, start_date, end_date, reason,
            manager_approval, hr_approval, status)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(auth.user_id)
    .bind(auth.full_name())
    .bind(&auth.department)
    .bind(payload.leave_type)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.reason.trim())
    .bind(manager_approval)
    .bind(hr_approval)
    .bind(status)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    info!(user_id = auth.user_id, "Leave request submitted");

    let requests = refreshed_requests(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(DecisionResponse {
        message: "Leave request submitted successfully!".into(),
        state: LeaveState::Submitted.label(),
        requests,
    }))
}

/// Fetch one leave request
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 403, description = "Outside the caller's scope"),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = fetch_leave(pool.get_ref(), path.into_inner()).await?;

    if !auth
        .visibility()
        .allows(request.user_id, Some(&request.department))
    {
        return Err(actix_web::error::ErrorForbidden(
            "Request is outside your scope",
        ));
    }

    Ok(HttpResponse::Ok().json(LeaveResponse::from(request)))
}

/// Manager decision (first approval stage)
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/manager",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to decide")
    ),
    request_body = DecisionReq,
    responses(
        (status = 200, description = "Decision applied", body = DecisionResponse),
        (status = 400, description = "Request already decided or not pending"),
        (status = 403, description = "Not a manager, or different department"),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn manager_decision(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DecisionReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager()?;

    let leave_id = path.into_inner();
    let request = fetch_leave(pool.get_ref(), leave_id).await?;

    // a manager only reviews requests from their own department
    if !auth
        .visibility()
        .allows(request.user_id, Some(&request.department))
    {
        return Err(actix_web::error::ErrorForbidden(
            "You can only review requests from your own department",
        ));
    }

    let next = request.state()?.apply(ReviewStage::Manager, payload.decision)?;
    persist_state(pool.get_ref(), leave_id, next).await?;

    info!(leave_id, decision = ?payload.decision, "Manager decision applied");

    let requests = refreshed_requests(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(DecisionResponse {
        message: match payload.decision {
            Decision::Approve => "Leave request approved".into(),
            Decision::Reject => "Leave request rejected".into(),
        },
        state: next.label(),
        requests,
    }))
}

/// HR decision (final approval stage)
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/hr",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to decide")
    ),
    request_body = DecisionReq,
    responses(
        (status = 200, description = "Decision applied", body = DecisionResponse),
        (status = 400, description = "Manager has not approved yet, or already processed"),
        (status = 403, description = "HR only"),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn hr_decision(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DecisionReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr()?;

    let leave_id = path.into_inner();
    let request = fetch_leave(pool.get_ref(), leave_id).await?;

    let next = request.state()?.apply(ReviewStage::Hr, payload.decision)?;
    persist_state(pool.get_ref(), leave_id, next).await?;

    info!(leave_id, decision = ?payload.decision, "HR decision applied");

    let requests = refreshed_requests(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(DecisionResponse {
        message: match payload.decision {
            Decision::Approve => "Leave request granted".into(),
            Decision::Reject => "Leave request rejected".into(),
        },
        state: next.label(),
        requests,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> CreateLeave {
        CreateLeave {
            leave_type: LeaveType::Annual,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            reason: "Family trip".into(),
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn single_day_leave_is_valid() {
        let mut leave = draft();
        leave.end_date = leave.start_date;
        assert!(leave.validate().is_ok());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut leave = draft();
        leave.end_date = NaiveDate::from_ymd_opt(2024, 5, 30).unwrap();
        let err = leave.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn blank_reason_is_rejected() {
        let mut leave = draft();
        leave.reason = "   ".into();
        let err = leave.validate().unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
