use anyhow::Result;

use super::schema::Database;

impl Database {
    // ========================================================================
    // Key/Value Operations
    // ========================================================================

    /// Get a single value by key.
    ///
    /// # Returns
    ///
    /// The stored value if the key exists, or `None` if not set.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM local_storage WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Read several keys in one transaction so they describe the same moment.
    ///
    /// The result is positionally aligned with `keys`.
    pub async fn get_values(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        let mut tx = self.pool.begin().await?;
        let mut values = Vec::with_capacity(keys.len());

        for key in keys {
            let row: Option<(String,)> =
                sqlx::query_as("SELECT value FROM local_storage WHERE key = ?")
                    .bind(*key)
                    .fetch_optional(&mut *tx)
                    .await?;
            values.push(row.map(|(value,)| value));
        }

        tx.commit().await?;
        Ok(values)
    }

    /// Set a value (UPSERT).
    pub async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.set_values(&[(key, value)]).await
    }

    /// Write several keys atomically: either all of them land or none do.
    pub async fn set_values(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (key, value) in pairs {
            sqlx::query(
                r#"
                INSERT INTO local_storage (key, value, updated_at)
                VALUES (?, ?, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            )
            .bind(*key)
            .bind(*value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Remove keys atomically. Missing keys are ignored.
    ///
    /// Returns the number of rows actually deleted.
    pub async fn remove_values(&self, keys: &[&str]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for key in keys {
            let result = sqlx::query("DELETE FROM local_storage WHERE key = ?")
                .bind(*key)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Read-modify-write a single key inside one transaction.
    ///
    /// `f` receives the current value (if any) and returns the value to store
    /// together with a result handed back to the caller. If `f` fails, nothing
    /// is written.
    pub async fn update_value<F, T>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<(String, T)>,
    {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM local_storage WHERE key = ?")
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?;

        let (new_value, output) = f(row.as_ref().map(|(value,)| value.as_str()))?;

        sqlx::query(
            r#"
            INSERT INTO local_storage (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(&new_value)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(output)
    }
}
