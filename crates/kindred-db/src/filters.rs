use chrono::{Datelike, Months, NaiveDate};

use crate::pagination::PageRequest;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserOrder {
    Created,
    #[default]
    LastActive,
}

impl UserOrder {
    /// `"created"` sorts by sign-up time; anything else by last activity.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("created") => Self::Created,
            _ => Self::LastActive,
        }
    }
}

/// Browse filter for the user list. `user_id` is the requester, who is
/// never part of the result.
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub user_id: i64,
    pub gender: String,
    pub min_age: u32,
    pub max_age: u32,
    pub order: UserOrder,
    /// Only users who liked the requester.
    pub likers: bool,
    /// Only users the requester liked.
    pub likees: bool,
    pub today: NaiveDate,
    pub page: PageRequest,
}

impl UserFilter {
    /// Inclusive `(earliest, latest)` birth dates of someone whose age on
    /// `today` lies in `min_age..=max_age`.
    pub fn birth_date_window(&self) -> (NaiveDate, NaiveDate) {
        birth_date_window(self.today, self.min_age, self.max_age)
    }
}

pub fn birth_date_window(today: NaiveDate, min_age: u32, max_age: u32) -> (NaiveDate, NaiveDate) {
    let latest = years_before(today, min_age);
    // Born one day after the (max_age + 1)th birthday cutoff.
    let earliest = years_before(today, max_age.saturating_add(1))
        .succ_opt()
        .unwrap_or(NaiveDate::MIN);
    (earliest, latest)
}

/// Completed years between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

// Feb 29 clamps to Feb 28 in non-leap years.
fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageContainer {
    Inbox,
    Outbox,
    #[default]
    Unread,
}

impl MessageContainer {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("Inbox") => Self::Inbox,
            Some("Outbox") => Self::Outbox,
            _ => Self::Unread,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageFilter {
    pub user_id: i64,
    pub container: MessageContainer,
    pub page: PageRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_years() {
        let today = date(2026, 10, 16);
        assert_eq!(age_on(date(2000, 10, 16), today), 26);
        assert_eq!(age_on(date(2000, 10, 17), today), 25);
        assert_eq!(age_on(date(2000, 1, 1), today), 26);
    }

    #[test]
    fn leap_day_birthday() {
        assert_eq!(age_on(date(2000, 2, 29), date(2026, 2, 28)), 25);
        assert_eq!(age_on(date(2000, 2, 29), date(2026, 3, 1)), 26);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let today = date(2026, 10, 16);
        let (earliest, latest) = birth_date_window(today, 18, 30);

        // Exactly 18 today.
        assert_eq!(latest, date(2008, 10, 16));
        assert_eq!(age_on(latest, today), 18);
        assert_eq!(age_on(latest.succ_opt().unwrap(), today), 17);

        // Still 30 until tomorrow.
        assert_eq!(earliest, date(1995, 10, 17));
        assert_eq!(age_on(earliest, today), 30);
        assert_eq!(age_on(earliest.pred_opt().unwrap(), today), 31);
    }

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        assert_eq!(UserOrder::parse(Some("created")), UserOrder::Created);
        assert_eq!(UserOrder::parse(Some("Created")), UserOrder::LastActive);
        assert_eq!(UserOrder::parse(None), UserOrder::LastActive);

        assert_eq!(MessageContainer::parse(Some("Inbox")), MessageContainer::Inbox);
        assert_eq!(MessageContainer::parse(Some("Outbox")), MessageContainer::Outbox);
        assert_eq!(MessageContainer::parse(Some("inbox")), MessageContainer::Unread);
        assert_eq!(MessageContainer::parse(None), MessageContainer::Unread);
    }
}
