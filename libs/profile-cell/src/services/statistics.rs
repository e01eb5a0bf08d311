use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::models::{DoctorStatistics, StatsBooking};

/// Session and earnings totals for one doctor, as of `now`.
///
/// Upcoming counts CONFIRMED sessions still ahead. Earnings only include
/// COMPLETED payments; the monthly figure keys on the payment's creation
/// date falling in the current calendar month.
pub fn compute_statistics(doctor_id: Uuid, bookings: &[StatsBooking], now: DateTime<Utc>) -> DoctorStatistics {
    let total_sessions = bookings.len() as i64;
    let completed_sessions = bookings.iter().filter(|b| b.status == "COMPLETED").count() as i64;
    let upcoming_sessions = bookings
        .iter()
        .filter(|b| b.status == "CONFIRMED" && b.session_date > now)
        .count() as i64;

    let paid = bookings
        .iter()
        .filter_map(|b| b.payment.as_ref())
        .filter(|p| p.status == "COMPLETED");

    let mut total_earnings = 0.0;
    let mut monthly_earnings = 0.0;
    for payment in paid {
        total_earnings += payment.amount;
        if payment.created_at.year() == now.year() && payment.created_at.month() == now.month() {
            monthly_earnings += payment.amount;
        }
    }

    DoctorStatistics {
        doctor_id,
        total_sessions,
        completed_sessions,
        upcoming_sessions,
        total_earnings,
        monthly_earnings,
        last_updated: now,
    }
}
