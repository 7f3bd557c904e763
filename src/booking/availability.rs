use std::collections::BTreeSet;

use time::{macros::format_description, Date};

use crate::db::bookings::{Booking, BookingStatus};

pub fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Nights taken by active bookings. A stay occupies `check_in <= night < check_out`,
/// so a new guest may arrive on the day another leaves.
pub fn unavailable_dates<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> BTreeSet<Date> {
    let mut taken = BTreeSet::new();
    for booking in bookings {
        if booking.status == BookingStatus::Cancelled {
            continue;
        }

        let mut night = booking.check_in;
        while night < booking.check_out {
            taken.insert(night);
            match night.next_day() {
                Some(next) => night = next,
                None => break,
            }
        }
    }
    taken
}

/// First taken night inside the requested stay, if any.
pub fn first_conflict(taken: &BTreeSet<Date>, check_in: Date, check_out: Date) -> Option<Date> {
    if check_in >= check_out {
        return None;
    }
    taken.range(check_in..check_out).next().copied()
}

pub fn nights(check_in: Date, check_out: Date) -> i64 {
    (check_out - check_in).whole_days()
}

pub fn total_cost(nightly: f64, check_in: Date, check_out: Date) -> f64 {
    nightly * nights(check_in, check_out).max(0) as f64
}

#[cfg(test)]
mod tests {
    use time::{macros::date, OffsetDateTime};

    use super::*;

    fn booking(check_in: Date, check_out: Date, status: BookingStatus) -> Booking {
        Booking {
            id: 1,
            room_id: 1,
            guest_name: "Ada".to_owned(),
            guest_email: "ada@example.com".to_owned(),
            guest_phone: "555".to_owned(),
            check_in,
            check_out,
            guests: 1,
            special_requests: String::new(),
            status,
            total_cost: 0.0,
            payment_proof_url: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn expands_active_stays_into_nights() {
        let bookings = [
            booking(date!(2025 - 03 - 30), date!(2025 - 04 - 02), BookingStatus::Confirmed),
            booking(date!(2025 - 04 - 01), date!(2025 - 04 - 03), BookingStatus::Pending),
            booking(date!(2025 - 05 - 01), date!(2025 - 05 - 09), BookingStatus::Cancelled),
        ];

        let taken: Vec<_> = unavailable_dates(&bookings).into_iter().collect();
        assert_eq!(
            taken,
            vec![date!(2025 - 03 - 30), date!(2025 - 03 - 31), date!(2025 - 04 - 01), date!(2025 - 04 - 02)]
        );
    }

    #[test]
    fn back_to_back_stays_do_not_conflict() {
        let taken = unavailable_dates(&[booking(date!(2025 - 06 - 10), date!(2025 - 06 - 12), BookingStatus::Confirmed)]);

        assert_eq!(first_conflict(&taken, date!(2025 - 06 - 12), date!(2025 - 06 - 15)), None);
        assert_eq!(first_conflict(&taken, date!(2025 - 06 - 08), date!(2025 - 06 - 10)), None);
        assert_eq!(
            first_conflict(&taken, date!(2025 - 06 - 08), date!(2025 - 06 - 11)),
            Some(date!(2025 - 06 - 10))
        );
        assert_eq!(first_conflict(&taken, date!(2025 - 06 - 11), date!(2025 - 06 - 11)), None);
    }

    #[test]
    fn cost_is_nightly_rate_times_nights() {
        assert_eq!(nights(date!(2025 - 12 - 30), date!(2026 - 01 - 02)), 3);
        assert_eq!(total_cost(120.0, date!(2025 - 12 - 30), date!(2026 - 01 - 02)), 360.0);
        assert_eq!(total_cost(120.0, date!(2026 - 01 - 02), date!(2025 - 12 - 30)), 0.0);
    }

    #[test]
    fn parses_form_dates() {
        assert_eq!(parse_date("2025-07-04"), Some(date!(2025 - 07 - 04)));
        assert_eq!(parse_date("07/04/2025"), None);
        assert_eq!(parse_date(""), None);
    }
}
