use time::{Duration, OffsetDateTime, Weekday};

/// Weekly rest-day rule for calendar stepping. The calendar shifter and
/// the cycle reorganizer each carry their own configured instance because
/// the two flows historically defined working days independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkdayRule {
    rest_day: Weekday,
}

impl WorkdayRule {
    pub fn new(rest_day: Weekday) -> Self {
        Self { rest_day }
    }

    pub fn is_working_day(self, moment: OffsetDateTime) -> bool {
        moment.weekday() != self.rest_day
    }

    /// One calendar day forward, then keep stepping while the cursor sits
    /// on the rest day. Time-of-day is preserved.
    pub fn next_workday(self, moment: OffsetDateTime) -> OffsetDateTime {
        let mut next = moment + Duration::days(1);
        while next.weekday() == self.rest_day {
            next += Duration::days(1);
        }
        next
    }

    pub fn previous_workday(self, moment: OffsetDateTime) -> OffsetDateTime {
        let mut previous = moment - Duration::days(1);
        while previous.weekday() == self.rest_day {
            previous -= Duration::days(1);
        }
        previous
    }

    /// Advance the cursor to a working day without moving it if it is
    /// already on one.
    pub fn snap_to_working_day(self, moment: OffsetDateTime) -> OffsetDateTime {
        let mut current = moment;
        while !self.is_working_day(current) {
            current = self.next_workday(current);
        }
        current
    }

    /// Signed count of workday steps from `start` to `end`, computed by
    /// iterative stepping so behavior around rest days matches repeated
    /// single-step application exactly.
    pub fn working_days_between(self, start: OffsetDateTime, end: OffsetDateTime) -> i64 {
        let mut current = start;
        let mut days = 0i64;

        if start > end {
            while current > end {
                current = self.previous_workday(current);
                days -= 1;
            }
        } else {
            while current < end {
                current = self.next_workday(current);
                days += 1;
            }
        }

        days
    }

    /// Apply `offset` workday steps, forward or backward per sign.
    pub fn step(self, moment: OffsetDateTime, offset: i64) -> OffsetDateTime {
        let mut current = moment;
        if offset < 0 {
            for _ in 0..offset.unsigned_abs() {
                current = self.previous_workday(current);
            }
        } else {
            for _ in 0..offset {
                current = self.next_workday(current);
            }
        }
        current
    }
}
