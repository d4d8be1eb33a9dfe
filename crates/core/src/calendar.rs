//! Reference calendar.
//!
//! Billing cycles and invoice buckets compare calendar days, never instants.
//! All timestamps are projected onto days in one fixed time zone.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Projects UTC instants onto calendar days of a fixed zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceCalendar {
    tz: Tz,
}

impl ReferenceCalendar {
    /// Creates a calendar for the given zone.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// The zone used for day boundaries.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Calendar day the instant falls on.
    #[must_use]
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    /// First instant of `day`.
    ///
    /// When midnight does not exist (a DST gap) the first existing hour of
    /// the day is used.
    #[must_use]
    pub fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        for hour in 0..4 {
            let local = day.and_time(NaiveTime::MIN) + chrono::Duration::hours(hour);
            if let Some(at) = self.tz.from_local_datetime(&local).earliest() {
                return at.with_timezone(&Utc);
            }
        }
        day.and_time(NaiveTime::MIN).and_utc()
    }
}

impl Default for ReferenceCalendar {
    fn default() -> Self {
        Self::new(chrono_tz::America::Sao_Paulo)
    }
}

/// Number of days in the month containing `date`.
#[must_use]
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first = first_of_month(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(31, |last| last.day())
}

/// First day of the month containing `date`.
#[must_use]
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The `day` of the month starting at `month`, clamped to the month's last day.
#[must_use]
pub fn clamped_day(month: NaiveDate, day: u32) -> NaiveDate {
    let first = first_of_month(month);
    let day = day.clamp(1, days_in_month(first));
    first.with_day(day).unwrap_or(first)
}

/// `date` moved `months` months forward, keeping the day when it exists.
#[must_use]
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(months))
        .map_or(NaiveDate::MAX, |month| clamped_day(month, date.day()))
}
