use chrono::NaiveDate;

use crate::{
    database::Database,
    repository::{attendance::AttendanceStatus, RepositoryError, Result},
};

const ENTITY_STUDENT: &str = "student";

/// A student row as the API serves it: the stored percentage plus the
/// attendance status for one queried date.
#[derive(Debug, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub regno: String,
    pub attendance_percentage: f64,
    pub today_status: AttendanceStatus,
}

pub struct CreateStudent {
    pub name: String,
    pub regno: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Stats {
    pub total_students: i64,
    pub present_today: i64,
    pub average_percentage: f64,
}

#[derive(Clone)]
pub struct StudentRepository {
    database: Database,
}

impl StudentRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Creates a student, failing with a conflict when the registration
    /// number is already taken. New students start at 0% with no records.
    pub async fn create(&self, request: CreateStudent) -> Result<Student> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            INSERT INTO students (
                name,
                regno
            ) VALUES (
                ?,
                ?
            ) RETURNING
                id,
                name,
                regno,
                CAST(attendance_percentage AS REAL) AS attendance_percentage,
                'absent' AS today_status
        ";

        let student: Student = sqlx::query_as(sql)
            .bind(&request.name)
            .bind(&request.regno)
            .fetch_one(&mut conn)
            .await
            .map_err(|e| {
                RepositoryError::from(e).or_conflict("Registration number already exists")
            })?;

        tracing::trace!(
            id = student.id,
            regno = student.regno.as_str(),
            "student created"
        );

        Ok(student)
    }

    /// Lists all students ordered by name, resolving each one's status for
    /// the given date. Students without a record for that date read as
    /// absent.
    pub async fn read_for_date(&self, date: NaiveDate) -> Result<Vec<Student>> {
        let mut conn = self.database.connection().await?;

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
            ORDER BY
                s.name
        ";

        Ok(sqlx::query_as(sql).bind(date).fetch_all(&mut conn).await?)
    }

    /// Deletes a student; attendance records go with it via the cascading
    /// foreign key.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.database.transaction().await?;

        let sql = r"
            DELETE FROM students
            WHERE
                id = ?
        ";

        let deleted = sqlx::query(sql).bind(id).execute(&mut tx).await?.rows_affected() > 0;

        tx.commit().await?;

        if deleted {
            tracing::trace!(id = id, "student deleted");
            Ok(())
        } else {
            Err(RepositoryError::not_found(ENTITY_STUDENT, id))
        }
    }

    /// Roll-level aggregates for one date. Derived per request, never
    /// persisted.
    pub async fn stats(&self, date: NaiveDate) -> Result<Stats> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            SELECT
                (SELECT COUNT(*) FROM students) AS total_students,
                (SELECT COUNT(*)
                 FROM attendance_records
                 WHERE date = ? AND status = 'present') AS present_today,
                (SELECT ROUND(COALESCE(AVG(attendance_percentage), 0), 2)
                 FROM students) AS average_percentage
        ";

        Ok(sqlx::query_as(sql).bind(date).fetch_one(&mut conn).await?)
    }
}
