use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use miette::Result;
use serde::{Deserialize, Serialize};

use crate::{
    api::{date_or_today, ApiError, Json},
    repository::{attendance::AttendanceStatus, student, Repository},
};

/// Handler for `GET /api/students?date=YYYY-MM-DD`
pub async fn read_all(
    Extension(repository): Extension<Repository>,
    Query(params): Query<DateParam>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let date = date_or_today(params.date.as_deref())?;
    let students: Vec<Student> = repository
        .student()
        .read_for_date(date)
        .await?
        .into_iter()
        .map(|s| s.into())
        .collect();
    Ok(students.into())
}

/// Handler for `POST /api/students`
pub async fn create(
    Extension(repository): Extension<Repository>,
    request: Json<CreateStudent>,
) -> Result<impl IntoResponse, ApiError> {
    let request = request.0;

    if request.name.trim().is_empty() || request.regno.trim().is_empty() {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    }

    let student: Student = repository
        .student()
        .create(student::CreateStudent {
            name: request.name,
            regno: request.regno,
        })
        .await?
        .into();

    Ok((StatusCode::CREATED, Json(student)))
}

/// Handler for `DELETE /api/students/:id`
pub async fn delete(
    Path(id): Path<i64>,
    Extension(repository): Extension<Repository>,
) -> Result<impl IntoResponse, ApiError> {
    repository.student().delete(id).await?;
    Ok(StatusCode::OK)
}

/// Handler for `GET /api/stats?date=YYYY-MM-DD`
pub async fn stats(
    Extension(repository): Extension<Repository>,
    Query(params): Query<DateParam>,
) -> Result<Json<Stats>, ApiError> {
    let date = date_or_today(params.date.as_deref())?;
    let stats: Stats = repository.student().stats(date).await?.into();
    Ok(stats.into())
}

impl From<student::Student> for Student {
    fn from(student: student::Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            regno: student.regno,
            attendance_percentage: student.attendance_percentage,
            today_status: student.today_status,
        }
    }
}

impl From<student::Stats> for Stats {
    fn from(stats: student::Stats) -> Self {
        Self {
            total_students: stats.total_students,
            present_today: stats.present_today,
            average_percentage: stats.average_percentage,
        }
    }
}

/// Query parameters carrying an optional date, defaulting to today (UTC).
#[derive(Debug, Deserialize)]
pub struct DateParam {
    pub date: Option<String>,
}

/// Body for `POST /api/students`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateStudent {
    pub name: String,
    pub regno: String,
}

/// An API [`Student`] type.
#[derive(Debug, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub regno: String,
    pub attendance_percentage: f64,
    pub today_status: AttendanceStatus,
}

/// Response for `GET /api/stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
    pub total_students: i64,
    pub present_today: i64,
    pub average_percentage: f64,
}
