use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// One row per (user_id, date). The weekday name shown in listings is
/// derived from `date`, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub date: NaiveDate,
    pub clock_in_time: Option<NaiveTime>,
    pub clock_out_time: Option<NaiveTime>,
    pub clock_in: bool,
    pub clock_out: bool,
}

impl Attendance {
    pub fn weekday(&self) -> String {
        self.date.format("%A").to_string()
    }

    pub fn day_state(&self) -> DayState {
        DayState {
            clock_in: self.clock_in,
            clock_out: self.clock_out,
            clock_in_time: self.clock_in_time,
            clock_out_time: self.clock_out_time,
        }
    }
}

/// Clock-in/out state of one user on one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayState {
    pub clock_in: bool,
    pub clock_out: bool,
    pub clock_in_time: Option<NaiveTime>,
    pub clock_out_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
}

/// Result of a successful clock action: the day state to persist plus the
/// notice shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOutcome {
    pub state: DayState,
    pub level: NoticeLevel,
    pub message: &'static str,
}

/// Clock in for the day. `existing` is today's record if one exists.
pub fn clock_in(existing: Option<DayState>, now: NaiveTime) -> Result<ClockOutcome, ApiError> {
    match existing {
        None => Ok(ClockOutcome {
            state: DayState {
                clock_in: true,
                clock_out: false,
                clock_in_time: Some(now),
                clock_out_time: None,
            },
            level: NoticeLevel::Success,
            message: "Clocked in successfully!",
        }),
        Some(state) if state.clock_in => Err(ApiError::AlreadyClockedIn),
        // Record exists but clock_in is false: the user clocked out first
        // earlier today, so fill in the missing clock-in.
        Some(state) => Ok(ClockOutcome {
            state: DayState {
                clock_in: true,
                clock_in_time: Some(now),
                ..state
            },
            level: NoticeLevel::Success,
            message: "Clock-in updated successfully!",
        }),
    }
}

/// Clock out for the day. Clocking out with no record at all succeeds with
/// a warning-level notice rather than an error.
pub fn clock_out(existing: Option<DayState>, now: NaiveTime) -> Result<ClockOutcome, ApiError> {
    match existing {
        None => Ok(ClockOutcome {
            state: DayState {
                clock_in: false,
                clock_out: true,
                clock_in_time: None,
                clock_out_time: Some(now),
            },
            level: NoticeLevel::Warning,
            message: "Clocked out without clocking in first",
        }),
        Some(state) if !state.clock_in => Err(ApiError::MustClockInFirst),
        Some(state) if state.clock_out => Err(ApiError::AlreadyClockedOut),
        Some(state) => Ok(ClockOutcome {
            state: DayState {
                clock_out: true,
                clock_out_time: Some(now),
                ..state
            },
            level: NoticeLevel::Success,
            message: "Clocked out successfully!",
        }),
    }
}

/// Elapsed time between clock-in and clock-out, formatted as "8h 30m".
/// Returns None when either time is missing or the difference is negative
/// (clock-out before clock-in is not a meaningful duration).
pub fn worked_duration(
    clock_in_time: Option<NaiveTime>,
    clock_out_time: Option<NaiveTime>,
) -> Option<String> {
    let (start, end) = (clock_in_time?, clock_out_time?);
    let secs = (end - start).num_seconds();
    if secs < 0 {
        return None;
    }
    let hours = secs / 3600;
    let minutes = ((secs % 3600) as f64 / 60.0).round() as i64;
    Some(format!("{}h {}m", hours, minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn clock_in_creates_fresh_record() {
        let outcome = clock_in(None, t(9, 0, 0)).unwrap();
        assert!(outcome.state.clock_in);
        assert!(!outcome.state.clock_out);
        assert_eq!(outcome.state.clock_in_time, Some(t(9, 0, 0)));
        assert_eq!(outcome.state.clock_out_time, None);
        assert_eq!(outcome.level, NoticeLevel::Success);
    }

    #[test]
    fn second_clock_in_is_rejected() {
        let first = clock_in(None, t(9, 0, 0)).unwrap().state;
        let err = clock_in(Some(first), t(9, 5, 0)).unwrap_err();
        assert!(matches!(err, ApiError::AlreadyClockedIn));
        // rejected call did not touch the state
        assert_eq!(first.clock_in_time, Some(t(9, 0, 0)));
    }

    #[test]
    fn clock_in_fills_out_first_record() {
        let out_first = clock_out(None, t(17, 0, 0)).unwrap().state;
        let outcome = clock_in(Some(out_first), t(17, 30, 0)).unwrap();
        assert!(outcome.state.clock_in);
        assert!(outcome.state.clock_out);
        assert_eq!(outcome.state.clock_in_time, Some(t(17, 30, 0)));
        assert_eq!(outcome.state.clock_out_time, Some(t(17, 0, 0)));
        assert_eq!(outcome.message, "Clock-in updated successfully!");
    }

    #[test]
    fn clock_out_without_record_warns() {
        let outcome = clock_out(None, t(17, 0, 0)).unwrap();
        assert_eq!(outcome.level, NoticeLevel::Warning);
        assert!(!outcome.state.clock_in);
        assert!(outcome.state.clock_out);
        assert_eq!(outcome.state.clock_in_time, None);
        assert_eq!(outcome.state.clock_out_time, Some(t(17, 0, 0)));
    }

    #[test]
    fn clock_out_requires_clock_in_on_existing_record() {
        let out_only = clock_out(None, t(17, 0, 0)).unwrap().state;
        let err = clock_out(Some(out_only), t(18, 0, 0)).unwrap_err();
        assert!(matches!(err, ApiError::MustClockInFirst));
    }

    #[test]
    fn double_clock_out_is_rejected() {
        let mut state = clock_in(None, t(9, 0, 0)).unwrap().state;
        state = clock_out(Some(state), t(17, 0, 0)).unwrap().state;
        let err = clock_out(Some(state), t(18, 0, 0)).unwrap_err();
        assert!(matches!(err, ApiError::AlreadyClockedOut));
    }

    #[test]
    fn full_day_duration() {
        assert_eq!(
            worked_duration(Some(t(9, 0, 0)), Some(t(17, 30, 0))),
            Some("8h 30m".to_string())
        );
    }

    #[test]
    fn negative_duration_is_undefined() {
        assert_eq!(worked_duration(Some(t(9, 0, 0)), Some(t(8, 0, 0))), None);
    }

    #[test]
    fn missing_times_have_no_duration() {
        assert_eq!(worked_duration(None, Some(t(17, 0, 0))), None);
        assert_eq!(worked_duration(Some(t(9, 0, 0)), None), None);
    }
}
