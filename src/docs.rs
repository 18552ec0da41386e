use crate::api::attendance::{AttendanceListResponse, AttendanceResponse, ClockResponse};
use crate::api::leave_request::{
    CreateLeave, DecisionReq, DecisionResponse, LeaveListResponse, LeaveResponse,
};
use crate::api::users::{DirectoryUser, UserListResponse};
use crate::model::attendance::NoticeLevel;
use crate::model::leave_request::{Approval, Decision, LeaveStatus, LeaveType};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance & Leave API",
        version = "1.0.0",
        description = r#"
## Employee Attendance & Leave Management

This API tracks daily attendance and runs the two-stage leave approval
workflow within an organization.

### 🔹 Key Features
- **Attendance**
  - Daily clock-in / clock-out with one cycle per day
  - Role-scoped attendance history (own / department / all)
- **Leave Management**
  - Submit leave requests with typed leave categories
  - Manager approval followed by HR approval, with rejection at either stage
- **User Directory**
  - Department membership lookups for reviewers

### 🔐 Security
All non-auth endpoints are protected with **JWT Bearer authentication**.
What a caller can see is scoped by role: employees see their own records,
managers their department, HR everything.

### 📦 Response Format
- JSON-based RESTful responses
- Every write returns the caller's refreshed record set

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::manager_decision,
        crate::api::leave_request::hr_decision,

        crate::api::attendance::list_attendance,
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,

        crate::api::users::list_users
    ),
    components(
        schemas(
            CreateLeave,
            DecisionReq,
            DecisionResponse,
            LeaveResponse,
            LeaveListResponse,
            LeaveType,
            LeaveStatus,
            Approval,
            Decision,
            AttendanceResponse,
            AttendanceListResponse,
            ClockResponse,
            NoticeLevel,
            DirectoryUser,
            UserListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request and approval APIs"),
        (name = "Attendance", description = "Clocking and attendance history APIs"),
        (name = "Users", description = "User directory APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
