use crate::errors::StoreError;
use crate::StoreClient;
use chrono::Utc;
use gridx_domain_models::User;
use libsql::params;
use tracing::instrument;

#[derive(Clone)]
pub struct UsersRepository {
    store: StoreClient,
}

impl UsersRepository {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Registers a new user, or returns the existing row unchanged if the
    /// id is already taken (registration is idempotent by design, matching
    /// the session handshake's auto-registration-on-first-hello behavior).
    #[instrument(skip(self, credential_token))]
    pub async fn register(&self, user_id: &str, credential_token: &str) -> Result<User, StoreError> {
        if let Some(existing) = self.find(user_id).await? {
            return Ok(existing);
        }
        let conn = self.store.connection()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (user_id, credential_token, created_at, last_login_at) VALUES (?1, ?2, ?3, ?3)",
            params![user_id, credential_token, now.to_rfc3339()],
        )
        .await?;
        Ok(User {
            user_id: user_id.to_string(),
            credential_token: credential_token.to_string(),
            balance: 0.0,
            created_at: now,
            last_login_at: Some(now),
        })
    }

    #[instrument(skip(self))]
    pub async fn find(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT u.user_id, u.credential_token, COALESCE(c.balance, 0.0), u.created_at, u.last_login_at
                 FROM users u LEFT JOIN credits c ON c.user_id = u.user_id
                 WHERE u.user_id = ?1",
                params![user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(map_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Validates a hello handshake's credential against the stored token.
    #[instrument(skip(self, credential_token))]
    pub async fn verify_credential(&self, user_id: &str, credential_token: &str) -> Result<bool, StoreError> {
        match self.find(user_id).await? {
            Some(user) => Ok(user.credential_token == credential_token),
            None => Ok(false),
        }
    }

    /// All registered users, for the admin overview.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query(
                "SELECT u.user_id, u.credential_token, COALESCE(c.balance, 0.0), u.created_at, u.last_login_at
                 FROM users u LEFT JOIN credits c ON c.user_id = u.user_id
                 ORDER BY u.created_at ASC",
                (),
            )
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(map_user(&row)?);
        }
        Ok(users)
    }

    #[instrument(skip(self))]
    pub async fn touch_login(&self, user_id: &str) -> Result<(), StoreError> {
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE users SET last_login_at = ?1 WHERE user_id = ?2",
            params![Utc::now().to_rfc3339(), user_id],
        )
        .await?;
        Ok(())
    }
}

fn map_user(row: &libsql::Row) -> Result<User, StoreError> {
    let created_raw: String = row.get(3)?;
    let last_login_raw: Option<String> = row.get(4)?;
    Ok(User {
        user_id: row.get(0)?,
        credential_token: row.get(1)?,
        balance: row.get(2)?,
        created_at: created_raw
            .parse()
            .map_err(|e| StoreError::MappingError(format!("bad created_at: {e}")))?,
        last_login_at: last_login_raw
            .map(|s| s.parse())
            .transpose()
            .map_err(|e| StoreError::MappingError(format!("bad last_login_at: {e}")))?,
    })
}
