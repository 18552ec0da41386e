use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    errors::ApiError,
    model::role::Role,
    model::user::User,
    models::{LoginReqDto, RegisterReq, TokenType},
    utils::email_cache,
    utils::email_filter,
};

// auth end points

const USER_COLUMNS: &str = "id, email, password, name, surname, role_id, department";

/// Inserts a new user row and updates the email filter and cache.
async fn insert_user(user: &RegisterReq, hashed: String, pool: &MySqlPool) -> Result<(), ApiError> {
    let result = sqlx::query(
        r#"INSERT INTO users (email, password, name, surname, role_id, department)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(user.email.trim().to_lowercase())
    .bind(hashed)
    .bind(user.name.trim())
    .bind(user.surname.trim())
    .bind(user.role.id())
    .bind(user.department.trim())
    .execute(pool)
    .await;

    match result {
        Ok(_) => {
            // keep the fast-path structures in sync with the store
            email_filter::insert(&user.email);
            email_cache::mark_taken(&user.email).await;
            Ok(())
        }
        Err(e) => {
            // unique key on users.email: a racing registration lost
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code() == Some("23000".into()) {
                    return Err(ApiError::EmailTaken);
                }
            }
            Err(ApiError::from(e))
        }
    }
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &MySqlPool) -> bool {
    let email = email.to_lowercase();

    // 1️⃣ Cuckoo filter — fast negative: if the filter has never seen the
    // email it is definitely available.
    if !email_filter::might_exist(&email) {
        return true;
    }

    // 2️⃣ Moka cache — fast positive
    if email_cache::is_taken(&email).await {
        return false;
    }

    // 3️⃣ Database fallback
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

/// User registration handler
pub async fn register(
    user: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let email = user.email.trim();

    if email.is_empty()
        || user.password.is_empty()
        || user.name.trim().is_empty()
        || user.surname.trim().is_empty()
        || user.department.trim().is_empty()
    {
        return Err(ApiError::Validation("All fields are required".into()).into());
    }

    if !is_email_available(email, pool.get_ref()).await {
        return Err(ApiError::EmailTaken.into());
    }

    let hashed = hash_password(&user.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // Safe to insert after DB check
    insert_user(&user, hashed, pool.get_ref()).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

#[derive(Serialize, Deserialize)]
struct PrincipalDto {
    id: u64,
    email: String,
    name: String,
    surname: String,
    role: Role,
    department: String,
}

impl From<&User> for PrincipalDto {
    fn from(user: &User) -> Self {
        PrincipalDto {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            // an unknown role id cannot be issued a token, checked at login
            role: Role::from_id(user.role_id).unwrap_or(Role::Employee),
            department: user.department.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: PrincipalDto,
}

#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::Validation("Email and password required".into()).into());
    }

    debug!("Fetching user from database");

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    let db_user = match sqlx::query_as::<_, User>(&sql)
        .bind(user.email.to_lowercase())
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::InvalidCredentials.into());
        }
        Err(e) => return Err(ApiError::from(e).into()),
    };

    if Role::from_id(db_user.role_id).is_none() {
        error!(role_id = db_user.role_id, "User row carries unknown role id");
        return Err(ApiError::InvalidCredentials.into());
    }

    debug!("Verifying password");

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::InvalidCredentials.into());
    }

    debug!("Password verified");

    let access_token = generate_access_token(&db_user, &config.jwt_secret, config.access_token_ttl);

    let (refresh_token, refresh_claims) =
        generate_refresh_token(&db_user, &config.jwt_secret, config.refresh_token_ttl);

    debug!(
        user_id = db_user.id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    sqlx::query(
        r#"INSERT INTO refresh_tokens (user_id, jti, expires_at)
           VALUES (?, ?, FROM_UNIXTIME(?))"#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    // last_login_at feeds the cache warmup window; not fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        user: PrincipalDto::from(&db_user),
    }))
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return Ok(HttpResponse::Unauthorized().body("No token")),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return Ok(HttpResponse::Unauthorized().body("Invalid token")),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return Ok(HttpResponse::Unauthorized().finish()),
    };

    if claims.token_type != TokenType::Refresh {
        return Ok(HttpResponse::Unauthorized().finish());
    }

    let record: Option<(u64, u64, bool)> = sqlx::query_as(
        r#"SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?"#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    let (record_id, user_id) = match record {
        Some((id, user_id, revoked)) if !revoked => (id, user_id),
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    // 🔥 revoke old refresh token
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    // tokens snapshot the principal; re-read the row so a role or
    // department change lands in the new pair
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    let db_user = match sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(ApiError::from)?
    {
        Some(u) => u,
        None => return Ok(HttpResponse::Unauthorized().finish()),
    };

    let (new_refresh_token, new_claims) =
        generate_refresh_token(&db_user, &config.jwt_secret, config.refresh_token_ttl);

    sqlx::query(
        r#"INSERT INTO refresh_tokens (user_id, jti, expires_at)
           VALUES (?, ?, FROM_UNIXTIME(?))"#,
    )
    .bind(db_user.id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    let access_token = generate_access_token(&db_user, &config.jwt_secret, config.access_token_ttl);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    })))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke refresh token (idempotent)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    // success (even if token didn't exist)
    HttpResponse::NoContent().finish()
}
