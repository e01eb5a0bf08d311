use chrono::{DateTime, Datelike, Utc};

use crate::models::{RevenuePayment, RevenueTotals};

/// Sums completed payments. The monthly figure covers payments created in
/// the calendar month of `now`.
pub fn revenue_totals(payments: &[RevenuePayment], now: DateTime<Utc>) -> RevenueTotals {
    payments.iter().fold(RevenueTotals::default(), |mut totals, payment| {
        totals.total += payment.amount;
        if payment.created_at.year() == now.year() && payment.created_at.month() == now.month() {
            totals.monthly += payment.amount;
        }
        totals
    })
}
