//! SQLite-backed repository for accounts, executions, settlements, and prices.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Currency, Decimal, DerivativeSettlement, FiatPricePoint, Side,
    SpotExecution,
};
use crate::storage::{StoreError, TaxStore};

/// Repository wrapping the SQLite connection pool.
///
/// Decimals are stored as canonical strings and timestamps as epoch
/// milliseconds; reads parse them back strictly. A row that fails to parse
/// surfaces as [`StoreError::Corrupt`] instead of being skipped, since a
/// dropped execution would silently shift every later FIFO match.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

fn parse_decimal(table: &str, column: &str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str_canonical(raw)
        .map_err(|e| StoreError::Corrupt(format!("{table}.{column} = {raw:?}: {e}")))
}

fn parse_currency(table: &str, column: &str, raw: &str) -> Result<Currency, StoreError> {
    Currency::parse(raw)
        .map_err(|e| StoreError::Corrupt(format!("{table}.{column} = {raw:?}: {e}")))
}

fn parse_side(table: &str, raw: &str) -> Result<Side, StoreError> {
    Side::parse(raw).ok_or_else(|| StoreError::Corrupt(format!("{table}.side = {raw:?}")))
}

fn parse_time_ms(table: &str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("{table}.time_ms = {ms}")))
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Liveness probe for the readiness endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create an account and return it with its assigned id.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate name).
    pub async fn insert_account(
        &self,
        name: &str,
        reporting_fiat: &Currency,
    ) -> Result<Account, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (name, reporting_fiat, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(reporting_fiat.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(Account {
            id: AccountId::new(result.last_insert_rowid()),
            name: name.to_string(),
            reporting_fiat: reporting_fiat.clone(),
        })
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query("SELECT id, name, reporting_fiat FROM accounts ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let fiat: String = row.get("reporting_fiat");
                Ok(Account {
                    id: AccountId::new(row.get("id")),
                    name: row.get("name"),
                    reporting_fiat: parse_currency("accounts", "reporting_fiat", &fiat)?,
                })
            })
            .collect()
    }

    /// Insert spot executions idempotently; duplicates on exec_id are
    /// ignored. Returns the number of newly inserted rows.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_spot_executions_batch(
        &self,
        executions: &[SpotExecution],
    ) -> Result<usize, sqlx::Error> {
        if executions.is_empty() {
            return Ok(0);
        }

        let created_at = Utc::now().timestamp_millis();
        let mut total_inserted = 0usize;
        let mut tx = self.pool.begin().await?;

        for exec in executions {
            let result = sqlx::query(
                r#"
                INSERT INTO spot_executions (
                    exec_id, account_id, base, quote, side, qty, price, fees,
                    time_ms, is_manual, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(exec_id) DO NOTHING
                "#,
            )
            .bind(&exec.exec_id)
            .bind(exec.account_id.as_i64())
            .bind(exec.base.as_str())
            .bind(exec.quote.as_str())
            .bind(exec.side.to_string())
            .bind(exec.qty.to_canonical_string())
            .bind(exec.price.to_canonical_string())
            .bind(exec.fees.to_canonical_string())
            .bind(exec.timestamp.timestamp_millis())
            .bind(exec.is_manual as i64)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                total_inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    /// Insert derivative settlements idempotently on pnl_id.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_derivative_settlements_batch(
        &self,
        settlements: &[DerivativeSettlement],
    ) -> Result<usize, sqlx::Error> {
        if settlements.is_empty() {
            return Ok(0);
        }

        let created_at = Utc::now().timestamp_millis();
        let mut total_inserted = 0usize;
        let mut tx = self.pool.begin().await?;

        for settlement in settlements {
            let result = sqlx::query(
                r#"
                INSERT INTO derivative_closed_pnls (
                    pnl_id, account_id, symbol, side, qty, closed_pnl, fees,
                    entry_price, exit_price, time_ms, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(pnl_id) DO NOTHING
                "#,
            )
            .bind(&settlement.pnl_id)
            .bind(settlement.account_id.as_i64())
            .bind(&settlement.symbol)
            .bind(settlement.side.to_string())
            .bind(settlement.qty.to_canonical_string())
            .bind(settlement.closed_pnl.to_canonical_string())
            .bind(settlement.fees.to_canonical_string())
            .bind(settlement.entry_price.map(|p| p.to_canonical_string()))
            .bind(settlement.exit_price.map(|p| p.to_canonical_string()))
            .bind(settlement.timestamp.timestamp_millis())
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                total_inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    /// Insert price points idempotently on (coin, fiat, time_ms).
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub async fn insert_fiat_prices_batch(
        &self,
        points: &[FiatPricePoint],
    ) -> Result<usize, sqlx::Error> {
        if points.is_empty() {
            return Ok(0);
        }

        let created_at = Utc::now().timestamp_millis();
        let mut total_inserted = 0usize;
        let mut tx = self.pool.begin().await?;

        for point in points {
            let result = sqlx::query(
                r#"
                INSERT INTO historical_fiat_prices (coin, fiat, price, time_ms, created_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(coin, fiat, time_ms) DO NOTHING
                "#,
            )
            .bind(point.coin.as_str())
            .bind(point.fiat.as_str())
            .bind(point.price.to_canonical_string())
            .bind(point.timestamp.timestamp_millis())
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                total_inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    /// Record a manually entered spot execution under a generated id.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_manual_execution(
        &self,
        account_id: AccountId,
        base: Currency,
        quote: Currency,
        side: Side,
        qty: Decimal,
        price: Decimal,
        fees: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Result<SpotExecution, sqlx::Error> {
        let exec = SpotExecution {
            exec_id: format!("manual:{}", Uuid::new_v4()),
            account_id,
            base,
            quote,
            side,
            qty,
            price,
            fees,
            timestamp,
            is_manual: true,
        };
        self.insert_spot_executions_batch(std::slice::from_ref(&exec))
            .await?;
        Ok(exec)
    }
}

#[async_trait]
impl TaxStore for Repository {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT id, name, reporting_fiat FROM accounts WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let fiat: String = row.get("reporting_fiat");
            Ok(Account {
                id: AccountId::new(row.get("id")),
                name: row.get("name"),
                reporting_fiat: parse_currency("accounts", "reporting_fiat", &fiat)?,
            })
        })
        .transpose()
    }

    async fn list_spot_executions(
        &self,
        account_id: AccountId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SpotExecution>, StoreError> {
        let from_ms = start.map_or(i64::MIN, |s| s.timestamp_millis());
        let to_ms = end.map_or(i64::MAX, |e| e.timestamp_millis());

        let rows = sqlx::query(
            r#"
            SELECT exec_id, account_id, base, quote, side, qty, price, fees,
                   time_ms, is_manual
            FROM spot_executions
            WHERE account_id = ? AND time_ms >= ? AND time_ms <= ?
            ORDER BY time_ms ASC, exec_id ASC
            "#,
        )
        .bind(account_id.as_i64())
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let base: String = row.get("base");
                let quote: String = row.get("quote");
                let side: String = row.get("side");
                let qty: String = row.get("qty");
                let price: String = row.get("price");
                let fees: String = row.get("fees");

                Ok(SpotExecution {
                    exec_id: row.get("exec_id"),
                    account_id: AccountId::new(row.get("account_id")),
                    base: parse_currency("spot_executions", "base", &base)?,
                    quote: parse_currency("spot_executions", "quote", &quote)?,
                    side: parse_side("spot_executions", &side)?,
                    qty: parse_decimal("spot_executions", "qty", &qty)?,
                    price: parse_decimal("spot_executions", "price", &price)?,
                    fees: parse_decimal("spot_executions", "fees", &fees)?,
                    timestamp: parse_time_ms("spot_executions", row.get("time_ms"))?,
                    is_manual: row.get::<i64, _>("is_manual") != 0,
                })
            })
            .collect()
    }

    async fn list_derivative_settlements(
        &self,
        account_id: AccountId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DerivativeSettlement>, StoreError> {
        let from_ms = start.map_or(i64::MIN, |s| s.timestamp_millis());
        let to_ms = end.map_or(i64::MAX, |e| e.timestamp_millis());

        let rows = sqlx::query(
            r#"
            SELECT pnl_id, account_id, symbol, side, qty, closed_pnl, fees,
                   entry_price, exit_price, time_ms
            FROM derivative_closed_pnls
            WHERE account_id = ? AND time_ms >= ? AND time_ms <= ?
            ORDER BY time_ms ASC, pnl_id ASC
            "#,
        )
        .bind(account_id.as_i64())
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let side: String = row.get("side");
                let qty: String = row.get("qty");
                let closed_pnl: String = row.get("closed_pnl");
                let fees: String = row.get("fees");
                let entry_price: Option<String> = row.get("entry_price");
                let exit_price: Option<String> = row.get("exit_price");

                Ok(DerivativeSettlement {
                    pnl_id: row.get("pnl_id"),
                    account_id: AccountId::new(row.get("account_id")),
                    symbol: row.get("symbol"),
                    side: parse_side("derivative_closed_pnls", &side)?,
                    qty: parse_decimal("derivative_closed_pnls", "qty", &qty)?,
                    closed_pnl: parse_decimal("derivative_closed_pnls", "closed_pnl", &closed_pnl)?,
                    fees: parse_decimal("derivative_closed_pnls", "fees", &fees)?,
                    entry_price: entry_price
                        .map(|p| parse_decimal("derivative_closed_pnls", "entry_price", &p))
                        .transpose()?,
                    exit_price: exit_price
                        .map(|p| parse_decimal("derivative_closed_pnls", "exit_price", &p))
                        .transpose()?,
                    timestamp: parse_time_ms("derivative_closed_pnls", row.get("time_ms"))?,
                })
            })
            .collect()
    }

    async fn load_fiat_prices(&self, fiat: &Currency) -> Result<Vec<FiatPricePoint>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT coin, fiat, price, time_ms
            FROM historical_fiat_prices
            WHERE fiat = ?
            ORDER BY coin ASC, time_ms ASC
            "#,
        )
        .bind(fiat.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let coin: String = row.get("coin");
                let fiat: String = row.get("fiat");
                let price: String = row.get("price");

                Ok(FiatPricePoint {
                    coin: parse_currency("historical_fiat_prices", "coin", &coin)?,
                    fiat: parse_currency("historical_fiat_prices", "fiat", &fiat)?,
                    price: parse_decimal("historical_fiat_prices", "price", &price)?,
                    timestamp: parse_time_ms("historical_fiat_prices", row.get("time_ms"))?,
                })
            })
            .collect()
    }
}
