use chrono::{Duration, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{database::Database, repository::Result};

#[derive(Debug, sqlx::FromRow)]
pub struct Session {
    pub token: String,
    pub account_id: i64,
    pub expires_at: NaiveDateTime,
}

/// The account a live session resolves to.
#[derive(Debug, sqlx::FromRow)]
pub struct SessionAccount {
    pub account_id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Clone)]
pub struct SessionRepository {
    database: Database,
}

impl SessionRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Issues a new opaque token for the account, valid for `ttl`.
    pub async fn create(&self, account_id: i64, ttl: Duration) -> Result<Session> {
        let mut tx = self.database.transaction().await?;

        let token = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now().naive_utc() + ttl;

        let sql = r"
            INSERT INTO sessions (
                token,
                account_id,
                expires_at
            ) VALUES (
                ?,
                ?,
                ?
            ) RETURNING
                token,
                account_id,
                expires_at
        ";

        let session: Session = sqlx::query_as(sql)
            .bind(&token)
            .bind(account_id)
            .bind(expires_at)
            .fetch_one(&mut tx)
            .await?;

        tx.commit().await?;

        tracing::trace!(
            account_id = account_id,
            expires_at = expires_at.to_string(),
            "session created"
        );

        Ok(session)
    }

    /// Resolves a token to its account, treating expired sessions as
    /// nonexistent.
    pub async fn find_account(
        &self,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<Option<SessionAccount>> {
        let mut conn = self.database.connection().await?;

        let sql = r"
            SELECT
                a.id AS account_id,
                a.name,
                a.email
            FROM
                sessions se
            INNER JOIN
                accounts a ON a.id = se.account_id
            WHERE
                se.token = ?
                AND
                se.expires_at > ?
        ";

        Ok(sqlx::query_as(sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&mut conn)
            .await?)
    }

    /// Revokes a session. Revoking an unknown token is not an error.
    pub async fn delete(&self, token: &str) -> Result<bool> {
        let mut tx = self.database.transaction().await?;

        let sql = r"
            DELETE FROM sessions
            WHERE
                token = ?
        ";

        let deleted = sqlx::query(sql)
            .bind(token)
            .execute(&mut tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;

        if deleted {
            tracing::trace!("session revoked");
        }

        Ok(deleted)
    }
}
