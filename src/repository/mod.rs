use thiserror::Error;

use crate::database::Database;

pub mod account;
pub mod attendance;
pub mod session;
pub mod student;

use account::AccountRepository;
use attendance::AttendanceRepository;
use session::SessionRepository;
use student::StudentRepository;

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity_type} with ID {id} does not exist")]
    NotFound { entity_type: String, id: i64 },
    #[error("{0}")]
    Conflict(String),
    #[error("query failed: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    pub fn not_found(entity_type: &str, id: i64) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub fn is_unique_constraint_violation(&self) -> bool {
        if let Self::Database(sqlx::Error::Database(e)) = self {
            e.message().contains("UNIQUE constraint failed")
        } else {
            false
        }
    }

    /// Turns a UNIQUE constraint failure into a conflict carrying the given
    /// message; any other error passes through unchanged.
    pub fn or_conflict(self, message: &str) -> Self {
        if self.is_unique_constraint_violation() {
            Self::Conflict(message.to_string())
        } else {
            self
        }
    }
}

#[derive(Clone)]
pub struct Repository {
    account: AccountRepository,
    attendance: AttendanceRepository,
    session: SessionRepository,
    student: StudentRepository,
}

impl Repository {
    pub fn new(database: Database) -> Self {
        Self {
            account: AccountRepository::new(database.clone()),
            attendance: AttendanceRepository::new(database.clone()),
            session: SessionRepository::new(database.clone()),
            student: StudentRepository::new(database),
        }
    }

    pub fn account(&self) -> &AccountRepository {
        &self.account
    }

    pub fn attendance(&self) -> &AttendanceRepository {
        &self.attendance
    }

    pub fn session(&self) -> &SessionRepository {
        &self.session
    }

    pub fn student(&self) -> &StudentRepository {
        &self.student
    }
}
