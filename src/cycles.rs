use std::fmt;

use serde::Serialize;
use time::{Date, Month, OffsetDateTime};

/// The four fixed seasonal application windows of the farm year. Each
/// cycle spans exactly two calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cycle {
    FebMar,
    MayJun,
    AugSep,
    NovDec,
}

impl Cycle {
    pub fn number(self) -> u8 {
        match self {
            Cycle::FebMar => 1,
            Cycle::MayJun => 2,
            Cycle::AugSep => 3,
            Cycle::NovDec => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Cycle::FebMar => "Feb-Mar",
            Cycle::MayJun => "May-Jun",
            Cycle::AugSep => "Aug-Sep",
            Cycle::NovDec => "Nov-Dec",
        }
    }

    pub fn months(self) -> (Month, Month) {
        match self {
            Cycle::FebMar => (Month::February, Month::March),
            Cycle::MayJun => (Month::May, Month::June),
            Cycle::AugSep => (Month::August, Month::September),
            Cycle::NovDec => (Month::November, Month::December),
        }
    }

    /// Strict month-pair membership: only the eight canonical months map.
    /// The deferral flow uses this and rejects anything else.
    pub fn for_month(month: Month) -> Option<Cycle> {
        match month {
            Month::February | Month::March => Some(Cycle::FebMar),
            Month::May | Month::June => Some(Cycle::MayJun),
            Month::August | Month::September => Some(Cycle::AugSep),
            Month::November | Month::December => Some(Cycle::NovDec),
            _ => None,
        }
    }

    /// Month-pair membership plus the fallback table that snaps off
    /// months to the nearest subsequent cycle. Every month maps; the
    /// `Option` exists only to mirror the strict variant's shape.
    pub fn for_month_with_fallback(month: Month) -> Option<Cycle> {
        Cycle::for_month(month).or(match month {
            Month::January => Some(Cycle::FebMar),
            Month::April => Some(Cycle::MayJun),
            Month::July => Some(Cycle::AugSep),
            Month::October => Some(Cycle::NovDec),
            _ => None,
        })
    }

    pub fn for_date(moment: OffsetDateTime) -> Option<Cycle> {
        Cycle::for_month_with_fallback(moment.month())
    }

    /// Inclusive window for a given year: first day of the first month at
    /// midnight through the last day of the second month at 23:59:59.
    pub fn date_range(self, year: i32) -> (OffsetDateTime, OffsetDateTime) {
        let (start_month, end_month) = self.months();
        let end_day = match self {
            Cycle::FebMar | Cycle::NovDec => 31,
            Cycle::MayJun | Cycle::AugSep => 30,
        };
        (
            day_start(year, start_month, 1),
            day_end(year, end_month, end_day),
        )
    }

    /// Half-open window used by the reorganizer's fetch: first day of the
    /// first month up to (exclusive) the first day of the month after the
    /// second month. For Nov-Dec the exclusive bound is Jan 1 next year.
    pub fn month_range_exclusive(self, year: i32) -> (OffsetDateTime, OffsetDateTime) {
        let (start_month, _) = self.months();
        let (end_year, end_month) = match self {
            Cycle::FebMar => (year, Month::April),
            Cycle::MayJun => (year, Month::July),
            Cycle::AugSep => (year, Month::October),
            Cycle::NovDec => (year + 1, Month::January),
        };
        (
            day_start(year, start_month, 1),
            day_start(end_year, end_month, 1),
        )
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `{name, number}` pair surfaced in completion outcomes.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CycleInfo {
    pub name: &'static str,
    pub number: u8,
}

impl From<Cycle> for CycleInfo {
    fn from(value: Cycle) -> Self {
        Self {
            name: value.name(),
            number: value.number(),
        }
    }
}

fn day_start(year: i32, month: Month, day: u8) -> OffsetDateTime {
    Date::from_calendar_date(year, month, day)
        .expect("cycle boundary date should be valid")
        .with_hms(0, 0, 0)
        .expect("midnight should be a valid time")
        .assume_utc()
}

fn day_end(year: i32, month: Month, day: u8) -> OffsetDateTime {
    Date::from_calendar_date(year, month, day)
        .expect("cycle boundary date should be valid")
        .with_hms(23, 59, 59)
        .expect("end of day should be a valid time")
        .assume_utc()
}
