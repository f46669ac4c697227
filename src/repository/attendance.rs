use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    database::Database,
    repository::{student::Student, RepositoryError, Result},
};

const ENTITY_STUDENT: &str = "student";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

pub struct MarkAttendance {
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub marked_by: i64,
}

/// One row of the range report: lifetime percentage plus day counts
/// within the requested range.
#[derive(Debug, sqlx::FromRow)]
pub struct ReportRow {
    pub name: String,
    pub regno: String,
    pub attendance_percentage: f64,
    pub present_days: i64,
    pub absent_days: i64,
}

#[derive(Clone)]
pub struct AttendanceRepository {
    database: Database,
}

impl AttendanceRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Writes or overwrites the single record for (student, date), then
    /// recomputes the student's percentage over its entire history in the
    /// same transaction. Returns the refreshed student row with the status
    /// for the submitted date.
    ///
    /// The unique key on (student_id, date) is what resolves concurrent
    /// submissions: last writer wins.
    pub async fn mark(&self, request: MarkAttendance) -> Result<Student> {
        let mut tx = self.database.transaction().await?;

        let sql = r"
            SELECT
                id
            FROM
                students
            WHERE
                id = ?
        ";

        let student: Option<(i64,)> = sqlx::query_as(sql)
            .bind(request.student_id)
            .fetch_optional(&mut tx)
            .await?;
        if student.is_none() {
            return Err(RepositoryError::not_found(
                ENTITY_STUDENT,
                request.student_id,
            ));
        }

        let sql = r"
            INSERT INTO attendance_records (
                student_id,
                date,
                status,
                marked_by
            ) VALUES (
                ?,
                ?,
                ?,
                ?
            )
            ON CONFLICT (student_id, date) DO UPDATE SET
                status = excluded.status,
                marked_by = excluded.marked_by,
                updated_at = CURRENT_TIMESTAMP
        ";

        sqlx::query(sql)
            .bind(request.student_id)
            .bind(request.date)
            .bind(request.status)
            .bind(request.marked_by)
            .execute(&mut tx)
            .await?;

        // Full re-aggregation rather than counter maintenance; zero records
        // must land on exactly 0, not NULL.
        let sql = r"
            UPDATE students
            SET
                attendance_percentage = (
                    SELECT ROUND(
                        COALESCE(
                            SUM(CASE WHEN status = 'present' THEN 1 ELSE 0 END) * 100.0
                                / COUNT(*),
                            0
                        ),
                        2
                    )
                    FROM attendance_records
                    WHERE student_id = ?
                ),
                updated_at = CURRENT_TIMESTAMP
            WHERE
                id = ?
        ";

        sqlx::query(sql)
            .bind(request.student_id)
            .bind(request.student_id)
            .execute(&mut tx)
            .await?;

        let sql = r"
            SELECT
                s.id,
                s.name,
                s.regno,
                s.attendance_percentage,
                COALESCE(
                    (SELECT ar.status
                     FROM attendance_records ar
                     WHERE ar.student_id = s.id
                     AND ar.date = ?
                     LIMIT 1),
                    'absent'
                ) AS today_status
            FROM
                students s
            WHERE
                s.id = ?
        ";

        let student: Student = sqlx::query_as(sql)
            .bind(request.date)
            .bind(request.student_id)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;

        tracing::trace!(
            student_id = request.student_id,
            date = request.date.to_string(),
            marked_by = request.marked_by,
            "attendance marked"
        );

        Ok(student)
    }

    /// Per-student present/absent day counts within [start, end]. The date
    /// filter lives in the join condition so students without any records
    /// in range still appear with zero counts.
    pub async fn report(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ReportRow>> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            SELECT
                s.name,
                s.regno,
                s.attendance_percentage,
                COUNT(CASE WHEN ar.status = 'present' THEN 1 END) AS present_days,
                COUNT(CASE WHEN ar.status = 'absent' THEN 1 END) AS absent_days
            FROM
                students s
            LEFT JOIN
                attendance_records ar
                ON ar.student_id = s.id
                AND ar.date BETWEEN ? AND ?
            GROUP BY
                s.id, s.name, s.regno, s.attendance_percentage
            ORDER BY
                s.name
        ";

        Ok(sqlx::query_as(sql)
            .bind(start)
            .bind(end)
            .fetch_all(&mut conn)
            .await?)
    }
}
