use axum::{extract::Query, Extension};
use chrono::{Duration, Utc};
use miette::Result;
use serde::{Deserialize, Serialize};

use crate::{
    api::{parse_date, students::Student, ApiConfig, ApiError, Json},
    auth::Identity,
    repository::{
        attendance::{self, AttendanceStatus},
        Repository,
    },
};

/// Handler for `POST /api/attendance`
///
/// `marked_by` is always the authenticated account; the body carries only
/// the student, date and status.
pub async fn mark(
    Extension(repository): Extension<Repository>,
    Extension(config): Extension<ApiConfig>,
    Extension(identity): Extension<Identity>,
    request: Json<MarkAttendance>,
) -> Result<Json<Student>, ApiError> {
    let request = request.0;
    let date = parse_date(&request.date)?;

    if let Some(days) = config.edit_window_days {
        let today = Utc::now().naive_utc().date();
        let earliest = today - Duration::days(days);
        if date < earliest || date > today {
            return Err(ApiError::Validation(format!(
                "date {} is outside the editable window of the last {} days",
                date, days
            )));
        }
    }

    let student: Student = repository
        .attendance()
        .mark(attendance::MarkAttendance {
            student_id: request.student_id,
            date,
            status: request.status,
            marked_by: identity.account_id,
        })
        .await?
        .into();

    Ok(student.into())
}

/// Handler for `GET /api/attendance/report?startDate&endDate`
pub async fn report(
    Extension(repository): Extension<Repository>,
    Query(params): Query<ReportParams>,
) -> Result<Json<Vec<ReportRow>>, ApiError> {
    let start = params
        .start_date
        .as_deref()
        .ok_or_else(|| ApiError::Validation("startDate is required".to_string()))?;
    let end = params
        .end_date
        .as_deref()
        .ok_or_else(|| ApiError::Validation("endDate is required".to_string()))?;

    let rows: Vec<ReportRow> = repository
        .attendance()
        .report(parse_date(start)?, parse_date(end)?)
        .await?
        .into_iter()
        .map(|r| r.into())
        .collect();

    Ok(rows.into())
}

impl From<attendance::ReportRow> for ReportRow {
    fn from(row: attendance::ReportRow) -> Self {
        Self {
            name: row.name,
            regno: row.regno,
            attendance_percentage: row.attendance_percentage,
            present_days: row.present_days,
            absent_days: row.absent_days,
        }
    }
}

/// Body for `POST /api/attendance`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    pub student_id: i64,
    pub date: String,
    pub status: AttendanceStatus,
}

/// Query parameters for `GET /api/attendance/report`
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportParams {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// One row of the attendance report.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportRow {
    pub name: String,
    pub regno: String,
    pub attendance_percentage: f64,
    pub present_days: i64,
    pub absent_days: i64,
}
