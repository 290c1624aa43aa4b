use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use taxlot::domain::{
    Account, AccountId, Currency, Decimal, DerivativeSettlement, FiatPricePoint, Side,
    SpotExecution,
};
use taxlot::engine::TaxError;
use taxlot::orchestration::CalcFailure;
use taxlot::{Category, MockStore, TaxService};

fn dec(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn cur(code: &str) -> Currency {
    Currency::parse(code).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn account() -> Account {
    Account {
        id: AccountId::new(1),
        name: "main".to_string(),
        reporting_fiat: cur("EUR"),
    }
}

fn spot(
    id: &str,
    side: Side,
    qty: &str,
    price: &str,
    fees: &str,
    timestamp: DateTime<Utc>,
) -> SpotExecution {
    SpotExecution {
        exec_id: id.to_string(),
        account_id: AccountId::new(1),
        base: cur("BTC"),
        quote: cur("EUR"),
        side,
        qty: dec(qty),
        price: dec(price),
        fees: dec(fees),
        timestamp,
        is_manual: false,
    }
}

fn settlement(id: &str, closed_pnl: &str, fees: &str, timestamp: DateTime<Utc>) -> DerivativeSettlement {
    DerivativeSettlement {
        pnl_id: id.to_string(),
        account_id: AccountId::new(1),
        symbol: "BTCUSDT".to_string(),
        side: Side::Sell,
        qty: dec("0.1"),
        closed_pnl: dec(closed_pnl),
        fees: dec(fees),
        entry_price: Some(dec("30000")),
        exit_price: Some(dec("31000")),
        timestamp,
    }
}

fn usdt_price(price: &str, timestamp: DateTime<Utc>) -> FiatPricePoint {
    FiatPricePoint {
        coin: cur("USDT"),
        fiat: cur("EUR"),
        price: dec(price),
        timestamp,
    }
}

fn service(store: MockStore) -> TaxService {
    TaxService::new(Arc::new(store))
}

#[tokio::test]
async fn test_spot_gain_within_holding_period_is_taxable() {
    let open = at(2023, 1, 10);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "1", "20000", "0", open))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "1",
            "25000",
            "0",
            open + Duration::days(10),
        ));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    let totals = &report.by_year[&2023][&Category::Spot];
    assert_eq!(totals.gains, dec("5000"));
    assert_eq!(totals.taxable_gains, dec("5000"));
    assert_eq!(totals.losses, Decimal::zero());
    assert_eq!(totals.taxable_losses, Decimal::zero());
}

#[tokio::test]
async fn test_spot_gain_after_holding_period_is_exempt() {
    let open = at(2022, 1, 10);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "1", "20000", "0", open))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "1",
            "25000",
            "0",
            open + Duration::days(400),
        ));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    let totals = &report.by_year[&2023][&Category::Spot];
    assert_eq!(totals.gains, dec("5000"));
    assert_eq!(totals.taxable_gains, Decimal::zero());
}

#[tokio::test]
async fn test_exactly_365_days_is_exempt() {
    let open = at(2022, 3, 1);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "1", "20000", "0", open))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "1",
            "25000",
            "0",
            open + Duration::days(365),
        ));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    let totals = &report.by_year[&2023][&Category::Spot];
    assert_eq!(totals.gains, dec("5000"));
    assert_eq!(totals.taxable_gains, Decimal::zero());
}

#[tokio::test]
async fn test_disposal_spanning_two_lots() {
    let open = at(2023, 1, 10);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "0.5", "20000", "0", open))
        .with_execution(spot(
            "b2",
            Side::Buy,
            "0.5",
            "30000",
            "0",
            open + Duration::days(1),
        ))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "0.7",
            "40000",
            "0",
            open + Duration::days(2),
        ));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    // 0.5 * (40000 - 20000) + 0.2 * (40000 - 30000)
    let totals = &report.by_year[&2023][&Category::Spot];
    assert_eq!(totals.gains, dec("12000"));
    assert_eq!(totals.taxable_gains, dec("12000"));

    let events = &report.events_by_year[&2023][&Category::Spot];
    let pnl_count = events
        .iter()
        .filter(|e| matches!(e, taxlot::engine::RealizationEvent::Pnl { .. }))
        .count();
    assert_eq!(pnl_count, 2);
}

#[tokio::test]
async fn test_oversell_aborts_with_insufficient_inventory() {
    let open = at(2023, 1, 10);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "1", "20000", "0", open))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "2",
            "25000",
            "0",
            open + Duration::days(1),
        ));

    let err = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CalcFailure::Tax(TaxError::InsufficientInventory { .. })
    ));
}

#[tokio::test]
async fn test_derivative_loss_without_price_data_aborts() {
    let store = MockStore::new()
        .with_account(account())
        .with_settlement(settlement("p1", "-50", "0", at(2023, 5, 1)));

    let err = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CalcFailure::Tax(TaxError::MissingPriceData { .. })
    ));
}

#[tokio::test]
async fn test_derivative_stale_price_data_aborts() {
    let when = at(2023, 5, 1);
    let store = MockStore::new()
        .with_account(account())
        .with_price(usdt_price("0.9", when - Duration::hours(13)))
        .with_settlement(settlement("p1", "100", "0", when));

    let err = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CalcFailure::Tax(TaxError::StalePriceData { .. })
    ));
}

#[tokio::test]
async fn test_derivative_settlements_round_trip() {
    let first = at(2023, 5, 1);
    let second = first + Duration::days(1);
    let store = MockStore::new()
        .with_account(account())
        .with_price(usdt_price("0.9", first))
        .with_price(usdt_price("0.9", second))
        .with_settlement(settlement("p1", "100", "0", first))
        .with_settlement(settlement("p2", "-50", "0", second));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    // +100 USDT at 0.9 acquires a derivative lot and books a 90 EUR gain;
    // the -50 USDT settlement books a 45 EUR loss and disposes quote
    // currency at its own cost basis (no extra gain or loss).
    let totals = &report.by_year[&2023][&Category::Derivative];
    assert_eq!(totals.gains, dec("90"));
    assert_eq!(totals.losses, dec("45"));
    assert_eq!(totals.taxable_gains, dec("90"));
    assert_eq!(totals.taxable_losses, dec("45"));
}

#[tokio::test]
async fn test_derivative_fee_recorded_only_when_positive() {
    let when = at(2023, 5, 1);
    let store = MockStore::new()
        .with_account(account())
        .with_price(usdt_price("1", when))
        .with_settlement(settlement("p1", "100", "2", when));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();
    assert_eq!(report.by_year[&2023][&Category::Derivative].fees, dec("2"));

    let store = MockStore::new()
        .with_account(account())
        .with_price(usdt_price("1", when))
        .with_settlement(settlement("p1", "100", "0", when));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();
    assert_eq!(
        report.by_year[&2023][&Category::Derivative].fees,
        Decimal::zero()
    );
}

#[tokio::test]
async fn test_spot_fee_recorded_even_when_zero_sales() {
    let open = at(2023, 1, 10);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "1", "20000", "15", open));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();
    assert_eq!(report.by_year[&2023][&Category::Spot].fees, dec("15"));
}

#[tokio::test]
async fn test_mixed_spot_and_derivative_categories_stay_separate() {
    let open = at(2023, 1, 10);
    let when = at(2023, 5, 1);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "1", "20000", "0", open))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "1",
            "25000",
            "0",
            open + Duration::days(5),
        ))
        .with_price(usdt_price("1", when))
        .with_settlement(settlement("p1", "100", "0", when));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    assert_eq!(report.by_year[&2023][&Category::Spot].gains, dec("5000"));
    assert_eq!(
        report.by_year[&2023][&Category::Derivative].gains,
        dec("100")
    );
}

#[tokio::test]
async fn test_report_serialization_is_idempotent() {
    let open = at(2023, 1, 10);
    let when = at(2023, 5, 1);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "0.5", "20000", "1", open))
        .with_execution(spot(
            "b2",
            Side::Buy,
            "0.5",
            "30000",
            "1",
            open + Duration::days(1),
        ))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "0.7",
            "40000",
            "2",
            open + Duration::days(2),
        ))
        .with_price(usdt_price("0.9", when))
        .with_settlement(settlement("p1", "100", "0.5", when));

    let service = service(store);
    let first = service
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();
    let second = service
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json, "reports must be byte-identical");
}

#[tokio::test]
async fn test_zero_filled_categories_present_for_every_year() {
    let open = at(2023, 1, 10);
    let store = MockStore::new()
        .with_account(account())
        .with_execution(spot("b1", Side::Buy, "1", "20000", "0", open))
        .with_execution(spot(
            "s1",
            Side::Sell,
            "1",
            "25000",
            "0",
            open + Duration::days(5),
        ));

    let report = service(store)
        .calculate(AccountId::new(1), None, None)
        .await
        .unwrap();

    let derivative = &report.by_year[&2023][&Category::Derivative];
    assert_eq!(derivative.gains, Decimal::zero());
    assert_eq!(derivative.fees, Decimal::zero());
}
