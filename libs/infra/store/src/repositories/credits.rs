use crate::errors::StoreError;
use crate::StoreClient;
use libsql::params;
use tracing::{instrument, warn};

/// Token-credit ledger. `deduct` is the only write path that can fail on
/// business grounds (insufficient balance); every other mutation either
/// succeeds or the store itself is broken.
#[derive(Clone)]
pub struct CreditsRepository {
    store: StoreClient,
}

impl CreditsRepository {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn ensure_user(&self, user_id: &str, initial_balance: f64) -> Result<f64, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query("SELECT balance FROM credits WHERE user_id = ?1", params![user_id])
            .await?;
        if let Some(row) = rows.next().await? {
            return Ok(row.get::<f64>(0)?);
        }
        conn.execute(
            "INSERT INTO credits (user_id, balance) VALUES (?1, ?2)",
            params![user_id, initial_balance],
        )
        .await?;
        Ok(initial_balance)
    }

    #[instrument(skip(self))]
    pub async fn balance(&self, user_id: &str) -> Result<f64, StoreError> {
        let conn = self.store.connection()?;
        let mut rows = conn
            .query("SELECT balance FROM credits WHERE user_id = ?1", params![user_id])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<f64>(0)?),
            None => Ok(0.0),
        }
    }

    /// Atomically debits `amount` if and only if the balance covers it.
    /// Returns `true` on success, `false` if the balance was insufficient.
    /// Amounts `<= 0.0` are treated as a no-op success, matching the
    /// behavior of crediting nothing.
    #[instrument(skip(self))]
    pub async fn deduct(&self, user_id: &str, amount: f64) -> Result<bool, StoreError> {
        if amount <= 0.0 {
            return Ok(true);
        }
        let conn = self.store.connection()?;
        let affected = conn
            .execute(
                "UPDATE credits SET balance = balance - ?1 WHERE user_id = ?2 AND balance >= ?1",
                params![amount, user_id],
            )
            .await?;
        if affected == 0 {
            warn!(user_id, amount, "debit rejected: insufficient balance");
        }
        Ok(affected > 0)
    }

    /// Unconditionally credits `amount`, creating the account at zero
    /// first if it does not exist yet. Amounts `<= 0.0` are a no-op.
    #[instrument(skip(self))]
    pub async fn credit(&self, user_id: &str, amount: f64) -> Result<(), StoreError> {
        if amount <= 0.0 {
            return Ok(());
        }
        self.ensure_user(user_id, 0.0).await?;
        let conn = self.store.connection()?;
        conn.execute(
            "UPDATE credits SET balance = balance + ?1 WHERE user_id = ?2",
            params![amount, user_id],
        )
        .await?;
        Ok(())
    }
}
