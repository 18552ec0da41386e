use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::errors::ApiError;
use crate::model::attendance::{self, Attendance, NoticeLevel};

#[derive(Serialize, ToSchema)]
pub struct AttendanceResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 42)]
    pub user_id: u64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "2024-06-03", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Weekday name derived from `date`
    #[schema(example = "Monday")]
    pub day: String,
    #[schema(example = "09:00:00", value_type = Option<String>)]
    pub clock_in_time: Option<NaiveTime>,
    #[schema(example = "17:30:00", value_type = Option<String>)]
    pub clock_out_time: Option<NaiveTime>,
    pub clock_in: bool,
    pub clock_out: bool,
    /// Worked time, present once both times are known and ordered
    #[schema(example = "8h 30m")]
    pub duration: Option<String>,
}

impl From<Attendance> for AttendanceResponse {
    fn from(record: Attendance) -> Self {
        let day = record.weekday();
        let duration =
            attendance::worked_duration(record.clock_in_time, record.clock_out_time);
        AttendanceResponse {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            date: record.date,
            day,
            clock_in_time: record.clock_in_time,
            clock_out_time: record.clock_out_time,
            clock_in: record.clock_in,
            clock_out: record.clock_out,
            duration,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceResponse>,
}

/// Outcome of a clock action plus the caller's refreshed record set, so the
/// client renders a consistent post-write snapshot without a second fetch.
#[derive(Serialize, ToSchema)]
pub struct ClockResponse {
    #[schema(example = "Clocked in successfully!")]
    pub message: String,
    pub notice: NoticeLevel,
    pub records: Vec<AttendanceResponse>,
}

async fn today_record(
    pool: &MySqlPool,
    user_id: u64,
    date: NaiveDate,
) -> Result<Option<Attendance>, ApiError> {
    Ok(sqlx::query_as::<_, Attendance>(
        r#"SELECT id, user_id, name, date, clock_in_time, clock_out_time, clock_in, clock_out
           FROM attendance WHERE user_id = ? AND date = ?"#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await?)
}

async fn persist_day_state(
    pool: &MySqlPool,
    auth: &AuthUser,
    existing: Option<&Attendance>,
    date: NaiveDate,
    state: attendance::DayState,
) -> Result<(), ApiError> {
    match existing {
        Some(record) => {
            sqlx::query(
                r#"UPDATE attendance
                   SET clock_in_time = ?, clock_out_time = ?, clock_in = ?, clock_out = ?
                   WHERE id = ?"#,
            )
            .bind(state.clock_in_time)
            .bind(state.clock_out_time)
            .bind(state.clock_in)
            .bind(state.clock_out)
            .bind(record.id)
            .execute(pool)
            .await?;
        }
        None => {
            sqlx::query(
                r#"INSERT INTO attendance
                   (user_id, name, date, clock_in_time, clock_out_time, clock_in, clock_out)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(auth.user_id)
            .bind(auth.full_name())
            .bind(date)
            .bind(state.clock_in_time)
            .bind(state.clock_out_time)
            .bind(state.clock_in)
            .bind(state.clock_out)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

async fn refreshed_records(
    pool: &MySqlPool,
    auth: &AuthUser,
) -> Result<Vec<AttendanceResponse>, ApiError> {
    let records = auth.visibility().attendance(pool).await?;
    Ok(records.into_iter().map(AttendanceResponse::from).collect())
}

/// Role-scoped attendance listing
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    responses(
        (status = 200, description = "Attendance records visible to the caller, newest first",
         body = AttendanceListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let data = refreshed_records(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(AttendanceListResponse { data }))
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/clock-in",
    responses(
        (status = 200, description = "Clocked in", body = ClockResponse),
        (status = 400, description = "Already clocked in today"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let now = Local::now().naive_local();
    let today = now.date();

    let existing = today_record(pool.get_ref(), auth.user_id, today).await?;
    let outcome = attendance::clock_in(existing.as_ref().map(Attendance::day_state), now.time())?;
    persist_day_state(pool.get_ref(), &auth, existing.as_ref(), today, outcome.state).await?;

    let records = refreshed_records(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(ClockResponse {
        message: outcome.message.to_string(),
        notice: outcome.level,
        records,
    }))
}

/// Clock-out endpoint. Clocking out with no record for today still creates
/// one, flagged with a warning-level notice.
#[utoipa::path(
    put,
    path = "/api/v1/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out", body = ClockResponse),
        (status = 400, description = "Not clocked in yet, or already clocked out"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let now = Local::now().naive_local();
    let today = now.date();

    let existing = today_record(pool.get_ref(), auth.user_id, today).await?;
    let outcome = attendance::clock_out(existing.as_ref().map(Attendance::day_state), now.time())?;
    persist_day_state(pool.get_ref(), &auth, existing.as_ref(), today, outcome.state).await?;

    let records = refreshed_records(pool.get_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(ClockResponse {
        message: outcome.message.to_string(),
        notice: outcome.level,
        records,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn response_derives_day_and_duration() {
        let record = Attendance {
            id: 1,
            user_id: 42,
            name: "Jane Doe".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            clock_in_time: NaiveTime::from_hms_opt(9, 0, 0),
            clock_out_time: NaiveTime::from_hms_opt(17, 30, 0),
            clock_in: true,
            clock_out: true,
        };
        let resp = AttendanceResponse::from(record);
        assert_eq!(resp.day, "Monday");
        assert_eq!(resp.duration.as_deref(), Some("8h 30m"));
    }

    #[test]
    fn open_day_has_no_duration() {
        let record = Attendance {
            id: 2,
            user_id: 42,
            name: "Jane Doe".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            clock_in_time: NaiveTime::from_hms_opt(9, 0, 0),
            clock_out_time: None,
            clock_in: true,
            clock_out: false,
        };
        assert_eq!(AttendanceResponse::from(record).duration, None);
    }
}
