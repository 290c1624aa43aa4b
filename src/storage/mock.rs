//! In-memory store for testing without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{StoreError, TaxStore};
use crate::domain::{
    Account, AccountId, Currency, DerivativeSettlement, FiatPricePoint, SpotExecution,
};

/// Mock store that serves predefined data.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    accounts: Vec<Account>,
    executions: Vec<SpotExecution>,
    settlements: Vec<DerivativeSettlement>,
    prices: Vec<FiatPricePoint>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_execution(mut self, execution: SpotExecution) -> Self {
        self.executions.push(execution);
        self
    }

    pub fn with_executions(mut self, executions: Vec<SpotExecution>) -> Self {
        self.executions.extend(executions);
        self
    }

    pub fn with_settlement(mut self, settlement: DerivativeSettlement) -> Self {
        self.settlements.push(settlement);
        self
    }

    pub fn with_settlements(mut self, settlements: Vec<DerivativeSettlement>) -> Self {
        self.settlements.extend(settlements);
        self
    }

    pub fn with_price(mut self, price: FiatPricePoint) -> Self {
        self.prices.push(price);
        self
    }

    pub fn with_prices(mut self, prices: Vec<FiatPricePoint>) -> Self {
        self.prices.extend(prices);
        self
    }
}

fn within(
    ts: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.map_or(true, |s| ts >= s) && end.map_or(true, |e| ts <= e)
}

#[async_trait]
impl TaxStore for MockStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_spot_executions(
        &self,
        account_id: AccountId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SpotExecution>, StoreError> {
        let mut rows: Vec<SpotExecution> = self
            .executions
            .iter()
            .filter(|e| e.account_id == account_id && within(e.timestamp, start, end))
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.timestamp);
        Ok(rows)
    }

    async fn list_derivative_settlements(
        &self,
        account_id: AccountId,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DerivativeSettlement>, StoreError> {
        let mut rows: Vec<DerivativeSettlement> = self
            .settlements
            .iter()
            .filter(|s| s.account_id == account_id && within(s.timestamp, start, end))
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.timestamp);
        Ok(rows)
    }

    async fn load_fiat_prices(&self, fiat: &Currency) -> Result<Vec<FiatPricePoint>, StoreError> {
        let mut rows: Vec<FiatPricePoint> = self
            .prices
            .iter()
            .filter(|p| p.fiat == *fiat)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (&a.coin, a.timestamp).cmp(&(&b.coin, b.timestamp)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, Side};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn cur(code: &str) -> Currency {
        Currency::parse(code).unwrap()
    }

    fn exec(id: &str, account: i64, secs: i64) -> SpotExecution {
        SpotExecution {
            exec_id: id.to_string(),
            account_id: AccountId::new(account),
            base: cur("BTC"),
            quote: cur("EUR"),
            side: Side::Buy,
            qty: Decimal::one(),
            price: Decimal::one(),
            fees: Decimal::zero(),
            timestamp: ts(secs),
            is_manual: false,
        }
    }

    #[tokio::test]
    async fn test_mock_store_filters_by_account() {
        let store = MockStore::new()
            .with_execution(exec("e1", 1, 100))
            .with_execution(exec("e2", 2, 200));

        let rows = store
            .list_spot_executions(AccountId::new(1), None, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].exec_id, "e1");
    }

    #[tokio::test]
    async fn test_mock_store_window_is_inclusive() {
        let store = MockStore::new()
            .with_execution(exec("e1", 1, 100))
            .with_execution(exec("e2", 1, 200))
            .with_execution(exec("e3", 1, 300));

        let rows = store
            .list_spot_executions(AccountId::new(1), Some(ts(100)), Some(ts(200)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].exec_id, "e2");
    }

    #[tokio::test]
    async fn test_mock_store_sorts_ascending() {
        let store = MockStore::new()
            .with_execution(exec("late", 1, 500))
            .with_execution(exec("early", 1, 100));

        let rows = store
            .list_spot_executions(AccountId::new(1), None, None)
            .await
            .unwrap();
        assert_eq!(rows[0].exec_id, "early");
        assert_eq!(rows[1].exec_id, "late");
    }

    #[tokio::test]
    async fn test_mock_store_prices_filtered_by_fiat() {
        let store = MockStore::new()
            .with_price(FiatPricePoint {
                coin: cur("BTC"),
                fiat: cur("EUR"),
                price: Decimal::one(),
                timestamp: ts(0),
            })
            .with_price(FiatPricePoint {
                coin: cur("BTC"),
                fiat: cur("USD"),
                price: Decimal::one(),
                timestamp: ts(0),
            });

        let rows = store.load_fiat_prices(&cur("EUR")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fiat, cur("EUR"));
    }

    #[tokio::test]
    async fn test_mock_store_prices_sorted_by_coin_then_time() {
        fn price(coin: &str, secs: i64) -> FiatPricePoint {
            FiatPricePoint {
                coin: Currency::parse(coin).unwrap(),
                fiat: Currency::parse("EUR").unwrap(),
                price: Decimal::one(),
                timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            }
        }

        let store = MockStore::new()
            .with_price(price("ETH", 200))
            .with_price(price("BTC", 300))
            .with_price(price("ETH", 100));

        let rows = store.load_fiat_prices(&cur("EUR")).await.unwrap();
        let order: Vec<(String, i64)> = rows
            .iter()
            .map(|p| (p.coin.as_str().to_string(), p.timestamp.timestamp()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("BTC".to_string(), 300),
                ("ETH".to_string(), 100),
                ("ETH".to_string(), 200),
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_store_missing_account() {
        let store = MockStore::new();
        assert!(store.get_account(AccountId::new(9)).await.unwrap().is_none());
    }
}
