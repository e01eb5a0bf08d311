use tracing::{debug, warn};

use shared_models::auth::Role;

use crate::models::{BookingError, BookingStatus};

const DOCTOR_TARGETS: &[BookingStatus] = &[
    BookingStatus::Confirmed,
    BookingStatus::Declined,
    BookingStatus::Completed,
];

const CLIENT_TARGETS: &[BookingStatus] = &[BookingStatus::Cancelled];

/// Statuses each role may request. The stored status is not consulted:
/// any booking the actor owns can be moved to one of these.
pub fn allowed_targets(role: Role) -> &'static [BookingStatus] {
    match role {
        Role::Doctor => DOCTOR_TARGETS,
        Role::Client => CLIENT_TARGETS,
        Role::Admin => &[],
    }
}

/// Validate the raw status an actor asked for.
pub fn check_requested_status(role: Role, requested: &str) -> Result<BookingStatus, BookingError> {
    if role == Role::Admin {
        return Err(BookingError::RoleNotAllowed(role));
    }

    let target: BookingStatus = requested
        .parse()
        .map_err(|_| BookingError::InvalidStatus(role))?;

    if !allowed_targets(role).contains(&target) {
        warn!("{} attempted to set booking status {}", role, target);
        return Err(BookingError::InvalidStatus(role));
    }

    debug!("{} may set booking status {}", role, target);
    Ok(target)
}

/// COMPLETED requires a payment that the doctor has already verified.
pub fn check_payment_gate(payment_status: Option<&str>) -> Result<(), BookingError> {
    match payment_status {
        None => Err(BookingError::PaymentRequired),
        Some("COMPLETED") => Ok(()),
        Some(other) => Err(BookingError::PaymentNotCompleted(other.to_string())),
    }
}

pub fn check_reschedulable(current: BookingStatus) -> Result<(), BookingError> {
    match current {
        BookingStatus::Completed | BookingStatus::Cancelled => Err(BookingError::CannotReschedule(current)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn doctor_targets() {
        for status in ["CONFIRMED", "DECLINED", "COMPLETED"] {
            assert!(check_requested_status(Role::Doctor, status).is_ok());
        }
        assert_matches!(
            check_requested_status(Role::Doctor, "CANCELLED"),
            Err(BookingError::InvalidStatus(Role::Doctor))
        );
        assert_matches!(
            check_requested_status(Role::Doctor, "PENDING"),
            Err(BookingError::InvalidStatus(Role::Doctor))
        );
    }

    #[test]
    fn client_may_only_cancel() {
        assert_eq!(check_requested_status(Role::Client, "CANCELLED").unwrap(), BookingStatus::Cancelled);
        for status in ["CONFIRMED", "DECLINED", "COMPLETED", "PENDING"] {
            assert_matches!(
                check_requested_status(Role::Client, status),
                Err(BookingError::InvalidStatus(Role::Client))
            );
        }
    }

    #[test]
    fn unknown_status_is_invalid_not_fatal() {
        assert_matches!(
            check_requested_status(Role::Doctor, "FINISHED"),
            Err(BookingError::InvalidStatus(_))
        );
    }

    #[test]
    fn admins_do_not_transition_bookings() {
        assert_matches!(
            check_requested_status(Role::Admin, "CONFIRMED"),
            Err(BookingError::RoleNotAllowed(Role::Admin))
        );
    }

    #[test]
    fn payment_gate_distinguishes_missing_from_unverified() {
        assert_matches!(check_payment_gate(None), Err(BookingError::PaymentRequired));
        assert_matches!(
            check_payment_gate(Some("PENDING")),
            Err(BookingError::PaymentNotCompleted(s)) if s == "PENDING"
        );
        assert!(check_payment_gate(Some("COMPLETED")).is_ok());
    }

    #[test]
    fn reschedule_blocked_only_for_completed_and_cancelled() {
        assert!(check_reschedulable(BookingStatus::Pending).is_ok());
        assert!(check_reschedulable(BookingStatus::Confirmed).is_ok());
        assert!(check_reschedulable(BookingStatus::Declined).is_ok());
        assert_matches!(
            check_reschedulable(BookingStatus::Completed),
            Err(BookingError::CannotReschedule(BookingStatus::Completed))
        );
        assert_matches!(
            check_reschedulable(BookingStatus::Cancelled),
            Err(BookingError::CannotReschedule(BookingStatus::Cancelled))
        );
    }
}
