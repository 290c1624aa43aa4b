//! Merging spot executions and derivative settlements into one event stream.

use chrono::{DateTime, Utc};

use crate::domain::{DerivativeSettlement, SpotExecution};

/// One entry of the merged, ascending-by-timestamp calculation timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TaxEvent {
    Spot(SpotExecution),
    Derivative(DerivativeSettlement),
}

impl TaxEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TaxEvent::Spot(exec) => exec.timestamp,
            TaxEvent::Derivative(settlement) => settlement.timestamp,
        }
    }
}

/// Stable merge of two independently ascending sequences into one ascending
/// timeline. Spot executions win timestamp ties so repeated runs always see
/// the identical ordering.
pub fn merge_timeline(
    spot: Vec<SpotExecution>,
    derivative: Vec<DerivativeSettlement>,
) -> Vec<TaxEvent> {
    let mut events = Vec::with_capacity(spot.len() + derivative.len());
    let mut spot = spot.into_iter().peekable();
    let mut derivative = derivative.into_iter().peekable();

    loop {
        match (spot.peek(), derivative.peek()) {
            (Some(s), Some(d)) => {
                if s.timestamp <= d.timestamp {
                    events.push(TaxEvent::Spot(spot.next().expect("peeked")));
                } else {
                    events.push(TaxEvent::Derivative(derivative.next().expect("peeked")));
                }
            }
            (Some(_), None) => events.push(TaxEvent::Spot(spot.next().expect("peeked"))),
            (None, Some(_)) => {
                events.push(TaxEvent::Derivative(derivative.next().expect("peeked")))
            }
            (None, None) => break,
        }
    }

    events
}
