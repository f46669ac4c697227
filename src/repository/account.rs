use chrono::NaiveDateTime;

use crate::{
    database::Database,
    repository::{RepositoryError, Result},
};

#[derive(Debug, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

pub struct CreateAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Clone)]
pub struct AccountRepository {
    database: Database,
}

impl AccountRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Creates an account, failing with a conflict when the email address
    /// is already registered.
    pub async fn create(&self, request: CreateAccount) -> Result<Account> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            INSERT INTO accounts (
                name,
                email,
                password_hash
            ) VALUES (
                ?,
                ?,
                ?
            ) RETURNING *
        ";

        let account: Account = sqlx::query_as(sql)
            .bind(&request.name)
            .bind(&request.email)
            .bind(&request.password_hash)
            .fetch_one(&mut conn)
            .await
            .map_err(|e| RepositoryError::from(e).or_conflict("Email already exists"))?;

        tracing::trace!(
            id = account.id,
            email = account.email.as_str(),
            "account created"
        );

        Ok(account)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            SELECT
                *
            FROM
                accounts
            WHERE
                email = ?
        ";

        Ok(sqlx::query_as(sql)
            .bind(email)
            .fetch_optional(&mut conn)
            .await?)
    }
}
