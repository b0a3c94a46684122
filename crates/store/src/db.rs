//! SQLite-backed alert store.

use crate::alert::{Direction, PriceAlert, VolumeAlert};
use coinseer_core::{AssetId, Fiat, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("invalid alert parameter: {0}")]
    InvalidParameter(String),
}

/// Database handle for persisted user state.
///
/// Every mutation is a single-row statement, so concurrent calls from
/// command handlers and the evaluation jobs stay safe without any
/// cross-component locking.
#[derive(Clone)]
pub struct AlertStore {
    pool: SqlitePool,
}

impl AlertStore {
    /// Connect to SQLite at the given URL and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                preferred_fiat TEXT NOT NULL DEFAULT 'usd',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_alerts (
                alert_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                asset_id TEXT NOT NULL,
                target_price REAL NOT NULL,
                direction TEXT NOT NULL,
                recurring INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users (user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS volume_alerts (
                alert_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                asset_id TEXT NOT NULL,
                multiplier REAL NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users (user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watchlist (
                user_id INTEGER NOT NULL,
                asset_id TEXT NOT NULL,
                UNIQUE(user_id, asset_id),
                FOREIGN KEY (user_id) REFERENCES users (user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_active_price_alerts ON price_alerts(is_active)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // --- Users ---

    /// Register a user with default preferences if not present.
    pub async fn ensure_user(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_preferred_fiat(&self, user_id: UserId, fiat: Fiat) -> Result<(), StoreError> {
        self.ensure_user(user_id).await?;
        sqlx::query("UPDATE users SET preferred_fiat = ? WHERE user_id = ?")
            .bind(fiat.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn preferred_fiat(&self, user_id: UserId) -> Result<Fiat, StoreError> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT preferred_fiat FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|s| Fiat::parse(&s)).unwrap_or_default())
    }

    // --- Price alerts ---

    /// Create a price alert, active by default. Fails on a non-positive
    /// target price.
    pub async fn create_price_alert(
        &self,
        owner: UserId,
        asset: &AssetId,
        target_price: f64,
        direction: Direction,
        recurring: bool,
    ) -> Result<i64, StoreError> {
        if !(target_price > 0.0) {
            return Err(StoreError::InvalidParameter(format!(
                "target price must be positive, got {target_price}"
            )));
        }

        self.ensure_user(owner).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO price_alerts (user_id, asset_id, target_price, direction, recurring)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner)
        .bind(asset.as_str())
        .bind(target_price)
        .bind(direction.as_str())
        .bind(recurring)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All active price alerts joined with each owner's preferred quote
    /// currency, ordered by alert id.
    pub async fn active_price_alerts(&self) -> Result<Vec<PriceAlert>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, f64, String, bool, String)>(
            r#"
            SELECT pa.alert_id, pa.user_id, pa.asset_id, pa.target_price,
                   pa.direction, pa.recurring, u.preferred_fiat
            FROM price_alerts pa
            JOIN users u ON pa.user_id = u.user_id
            WHERE pa.is_active = 1
            ORDER BY pa.alert_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(map_price_alert_row).collect())
    }

    /// Active price alerts owned by one user.
    pub async fn price_alerts_for_user(
        &self,
        owner: UserId,
    ) -> Result<Vec<PriceAlert>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, f64, String, bool, String)>(
            r#"
            SELECT pa.alert_id, pa.user_id, pa.asset_id, pa.target_price,
                   pa.direction, pa.recurring, u.preferred_fiat
            FROM price_alerts pa
            JOIN users u ON pa.user_id = u.user_id
            WHERE pa.is_active = 1 AND pa.user_id = ?
            ORDER BY pa.alert_id
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(map_price_alert_row).collect())
    }

    /// Set a price alert inactive. Idempotent: already-inactive or
    /// missing ids are a no-op.
    pub async fn deactivate_price_alert(&self, alert_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE price_alerts SET is_active = 0 WHERE alert_id = ?")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a price alert, but only if `owner` owns it. Returns true
    /// when a row was removed.
    pub async fn delete_price_alert(&self, owner: UserId, alert_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM price_alerts WHERE alert_id = ? AND user_id = ?")
            .bind(alert_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Volume alerts ---

    /// Create a volume-spike alert. The multiplier must exceed 1.0.
    pub async fn create_volume_alert(
        &self,
        owner: UserId,
        asset: &AssetId,
        multiplier: f64,
    ) -> Result<i64, StoreError> {
        if !(multiplier > 1.0) {
            return Err(StoreError::InvalidParameter(format!(
                "multiplier must be greater than 1.0, got {multiplier}"
            )));
        }

        self.ensure_user(owner).await?;
        let result = sqlx::query(
            "INSERT INTO volume_alerts (user_id, asset_id, multiplier) VALUES (?, ?, ?)",
        )
        .bind(owner)
        .bind(asset.as_str())
        .bind(multiplier)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All active volume alerts with the owner's preferred quote
    /// currency joined in, ordered by alert id.
    pub async fn active_volume_alerts(&self) -> Result<Vec<VolumeAlert>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, f64, String)>(
            r#"
            SELECT va.alert_id, va.user_id, va.asset_id, va.multiplier, u.preferred_fiat
            FROM volume_alerts va
            JOIN users u ON va.user_id = u.user_id
            WHERE va.is_active = 1
            ORDER BY va.alert_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(map_volume_alert_row).collect())
    }

    /// Active volume alerts owned by one user.
    pub async fn volume_alerts_for_user(
        &self,
        owner: UserId,
    ) -> Result<Vec<VolumeAlert>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, i64, String, f64, String)>(
            r#"
            SELECT va.alert_id, va.user_id, va.asset_id, va.multiplier, u.preferred_fiat
            FROM volume_alerts va
            JOIN users u ON va.user_id = u.user_id
            WHERE va.is_active = 1 AND va.user_id = ?
            ORDER BY va.alert_id
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(map_volume_alert_row).collect())
    }

    /// Idempotent, same semantics as [`Self::deactivate_price_alert`].
    pub async fn deactivate_volume_alert(&self, alert_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE volume_alerts SET is_active = 0 WHERE alert_id = ?")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Owner-scoped delete, true when a row was removed.
    pub async fn delete_volume_alert(
        &self,
        owner: UserId,
        alert_id: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM volume_alerts WHERE alert_id = ? AND user_id = ?")
            .bind(alert_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Watchlist ---

    /// Add to the watchlist. Returns false when the asset was already
    /// watched.
    pub async fn add_to_watchlist(&self, owner: UserId, asset: &AssetId) -> Result<bool, StoreError> {
        self.ensure_user(owner).await?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO watchlist (user_id, asset_id) VALUES (?, ?)",
        )
        .bind(owner)
        .bind(asset.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove from the watchlist. Returns false when the asset was not
    /// watched.
    pub async fn remove_from_watchlist(
        &self,
        owner: UserId,
        asset: &AssetId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = ? AND asset_id = ?")
            .bind(owner)
            .bind(asset.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn watchlist(&self, owner: UserId) -> Result<Vec<AssetId>, StoreError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT asset_id FROM watchlist WHERE user_id = ? ORDER BY asset_id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(AssetId::new).collect())
    }
}

/// Map a joined price-alert row, skipping malformed rows so one bad row
/// never aborts a batch.
fn map_price_alert_row(
    (id, owner, asset, target_price, direction, recurring, fiat): (
        i64,
        i64,
        String,
        f64,
        String,
        bool,
        String,
    ),
) -> Option<PriceAlert> {
    let Some(direction) = Direction::parse(&direction) else {
        warn!(alert_id = id, direction, "skipping price alert with unknown direction");
        return None;
    };
    let Some(fiat) = Fiat::parse(&fiat) else {
        warn!(alert_id = id, fiat, "skipping price alert with unknown quote currency");
        return None;
    };

    Some(PriceAlert {
        id,
        owner,
        asset: AssetId::new(asset),
        target_price,
        direction,
        recurring,
        active: true,
        fiat,
    })
}

fn map_volume_alert_row(
    (id, owner, asset, multiplier, fiat): (i64, i64, String, f64, String),
) -> Option<VolumeAlert> {
    let Some(fiat) = Fiat::parse(&fiat) else {
        warn!(alert_id = id, fiat, "skipping volume alert with unknown quote currency");
        return None;
    };

    Some(VolumeAlert {
        id,
        owner,
        asset: AssetId::new(asset),
        multiplier,
        active: true,
        fiat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn memory_store() -> AlertStore {
        AlertStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_price_alert() {
        let store = memory_store().await;
        let btc = AssetId::new("bitcoin");

        let id = store
            .create_price_alert(1, &btc, 50000.0, Direction::Above, false)
            .await
            .unwrap();

        let alerts = store.active_price_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, id);
        assert_eq!(alerts[0].owner, 1);
        assert_eq!(alerts[0].asset, btc);
        assert_eq!(alerts[0].direction, Direction::Above);
        assert!(!alerts[0].recurring);
        // Default quote currency joined from the users table.
        assert_eq!(alerts[0].fiat, Fiat::Usd);
    }

    #[tokio::test]
    async fn test_list_joins_preferred_fiat() {
        let store = memory_store().await;
        store.set_preferred_fiat(7, Fiat::Eur).await.unwrap();
        store
            .create_price_alert(7, &AssetId::new("ethereum"), 3000.0, Direction::Below, true)
            .await
            .unwrap();

        let alerts = store.active_price_alerts().await.unwrap();
        assert_eq!(alerts[0].fiat, Fiat::Eur);
    }

    #[tokio::test]
    async fn test_create_price_alert_rejects_non_positive_target() {
        let store = memory_store().await;
        let err = store
            .create_price_alert(1, &AssetId::new("bitcoin"), 0.0, Direction::Above, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_deactivate_is_idempotent() {
        let store = memory_store().await;
        let id = store
            .create_price_alert(1, &AssetId::new("bitcoin"), 50000.0, Direction::Above, false)
            .await
            .unwrap();

        store.deactivate_price_alert(id).await.unwrap();
        store.deactivate_price_alert(id).await.unwrap();
        // Unknown id is also a no-op.
        store.deactivate_price_alert(9999).await.unwrap();

        assert!(store.active_price_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_enforces_owner_isolation() {
        let store = memory_store().await;
        let id = store
            .create_price_alert(1, &AssetId::new("bitcoin"), 50000.0, Direction::Above, false)
            .await
            .unwrap();

        // Owner 2 cannot delete owner 1's alert.
        assert!(!store.delete_price_alert(2, id).await.unwrap());
        assert_eq!(store.active_price_alerts().await.unwrap().len(), 1);

        assert!(store.delete_price_alert(1, id).await.unwrap());
        assert!(store.active_price_alerts().await.unwrap().is_empty());
        // Second delete finds nothing.
        assert!(!store.delete_price_alert(1, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_volume_alert_lifecycle() {
        let store = memory_store().await;
        let err = store
            .create_volume_alert(1, &AssetId::new("dogecoin"), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidParameter(_)));

        let id = store
            .create_volume_alert(1, &AssetId::new("dogecoin"), 2.5)
            .await
            .unwrap();

        let alerts = store.active_volume_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].multiplier, 2.5);

        assert!(!store.delete_volume_alert(2, id).await.unwrap());
        assert!(store.delete_volume_alert(1, id).await.unwrap());
        assert!(store.active_volume_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alerts_for_user_filters_by_owner() {
        let store = memory_store().await;
        let btc = AssetId::new("bitcoin");
        store
            .create_price_alert(1, &btc, 50000.0, Direction::Above, false)
            .await
            .unwrap();
        store
            .create_price_alert(2, &btc, 40000.0, Direction::Below, false)
            .await
            .unwrap();

        let mine = store.price_alerts_for_user(1).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].owner, 1);
    }

    #[tokio::test]
    async fn test_malformed_row_is_skipped() {
        let store = memory_store().await;
        store.ensure_user(1).await.unwrap();
        // Bypass validation to simulate a corrupt row.
        sqlx::query(
            "INSERT INTO price_alerts (user_id, asset_id, target_price, direction) VALUES (1, 'bitcoin', 1.0, 'sideways')",
        )
        .execute(&store.pool)
        .await
        .unwrap();
        store
            .create_price_alert(1, &AssetId::new("ethereum"), 3000.0, Direction::Above, false)
            .await
            .unwrap();

        let alerts = store.active_price_alerts().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].asset, AssetId::new("ethereum"));
    }

    #[tokio::test]
    async fn test_watchlist() {
        let store = memory_store().await;
        let btc = AssetId::new("bitcoin");

        assert!(store.add_to_watchlist(1, &btc).await.unwrap());
        // Duplicate add reports false.
        assert!(!store.add_to_watchlist(1, &btc).await.unwrap());

        assert_eq!(store.watchlist(1).await.unwrap(), vec![btc.clone()]);

        assert!(store.remove_from_watchlist(1, &btc).await.unwrap());
        assert!(!store.remove_from_watchlist(1, &btc).await.unwrap());
        assert!(store.watchlist(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preferred_fiat_defaults_to_usd() {
        let store = memory_store().await;
        assert_eq!(store.preferred_fiat(42).await.unwrap(), Fiat::Usd);

        store.set_preferred_fiat(42, Fiat::Gbp).await.unwrap();
        assert_eq!(store.preferred_fiat(42).await.unwrap(), Fiat::Gbp);
    }
}
