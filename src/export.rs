//! Flat CSV export of the per-event realization log.

use std::io;

use serde::Serialize;

use crate::engine::{RealizationEvent, TaxReport};

/// One CSV line. Pnl and fee events share the layout; fields that do not
/// apply stay empty.
#[derive(Debug, Serialize)]
struct EventRow<'a> {
    year: i32,
    category: &'a str,
    kind: &'a str,
    asset: &'a str,
    qty: String,
    quote: &'a str,
    open_ts: String,
    close_ts: String,
    open_price: String,
    close_price: String,
    fiat_value: String,
    taxable: String,
    fiat_fee: String,
}

/// Write every realization event of the report, ordered by year, category,
/// then recording order. The ordering is deterministic, so identical
/// reports export byte-identical CSVs.
pub fn write_events_csv<W: io::Write>(report: &TaxReport, writer: W) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);

    for (year, by_category) in &report.events_by_year {
        for (category, events) in by_category {
            for event in events {
                let row = match event {
                    RealizationEvent::Pnl {
                        asset,
                        qty,
                        quote,
                        open_ts,
                        close_ts,
                        open_price,
                        close_price,
                        fiat_value,
                        taxable,
                        ..
                    } => EventRow {
                        year: *year,
                        category: category.as_str(),
                        kind: "pnl",
                        asset: asset.as_str(),
                        qty: qty.to_canonical_string(),
                        quote: quote.as_str(),
                        open_ts: open_ts.to_rfc3339(),
                        close_ts: close_ts.to_rfc3339(),
                        open_price: open_price
                            .map(|p| p.to_canonical_string())
                            .unwrap_or_default(),
                        close_price: close_price
                            .map(|p| p.to_canonical_string())
                            .unwrap_or_default(),
                        fiat_value: fiat_value.to_canonical_string(),
                        taxable: taxable.to_string(),
                        fiat_fee: String::new(),
                    },
                    RealizationEvent::Fee { ts, fiat_fee, .. } => EventRow {
                        year: *year,
                        category: category.as_str(),
                        kind: "fee",
                        asset: "",
                        qty: String::new(),
                        quote: "",
                        open_ts: String::new(),
                        close_ts: ts.to_rfc3339(),
                        open_price: String::new(),
                        close_price: String::new(),
                        fiat_value: String::new(),
                        taxable: String::new(),
                        fiat_fee: fiat_fee.to_canonical_string(),
                    },
                };
                w.serialize(row)?;
            }
        }
    }

    w.flush()?;
    Ok(())
}
