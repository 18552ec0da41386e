use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::warn;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::errors::ApiError;
use crate::model::role::Role;
use crate::model::user::User;

/// Directory entry; the password never leaves the store through this API.
#[derive(Serialize, ToSchema)]
pub struct DirectoryUser {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
    #[schema(example = "Jane")]
    pub name: String,
    #[schema(example = "Doe")]
    pub surname: String,
    #[schema(example = "manager", value_type = String)]
    pub role: Role,
    #[schema(example = "IT")]
    pub department: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<DirectoryUser>,
}

/// User directory, used by reviewers to resolve department membership
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 403, description = "Manager/HR only"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_hr()?;

    let rows: Vec<User> = sqlx::query_as(
        "SELECT id, email, password, name, surname, role_id, department FROM users ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    let data = rows
        .into_iter()
        .filter_map(|user| {
            let Some(role) = Role::from_id(user.role_id) else {
                warn!(
                    user_id = user.id,
                    role_id = user.role_id,
                    "Skipping user with unknown role id"
                );
                return None;
            };
            Some(DirectoryUser {
                id: user.id,
                email: user.email,
                name: user.name,
                surname: user.surname,
                role,
                department: user.department,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(UserListResponse { data }))
}
