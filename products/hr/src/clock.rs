//! Organization-timezone clock.
//!
//! Every date boundary in the core ("today", work start/end, month windows)
//! is resolved in one fixed timezone, independent of the server locale.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::period::SalaryPeriod;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Phnom_Penh;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock, shared between clones.
#[derive(Clone, Debug)]
pub struct FixedClock {
    instant: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Arc::new(Mutex::new(instant)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.instant.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.instant.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Debug)]
pub struct OrgClock {
    tz: Tz,
    clock: Arc<dyn Clock>,
}

impl OrgClock {
    pub fn new(tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self { tz, clock }
    }

    pub fn system(tz: Tz) -> Self {
        Self::new(tz, Arc::new(SystemClock))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.tz)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Wall-clock `time` on `date` in the organization timezone.
    pub fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
        local_instant(self.tz, date.and_time(time))
    }

    /// The calendar month before the current one.
    pub fn previous_period(&self) -> SalaryPeriod {
        SalaryPeriod::containing(self.today()).previous()
    }
}

/// Resolves a local wall-clock time. Ambiguous times take the earlier
/// instant; times inside a DST gap move to the first valid minute after it.
pub fn local_instant(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => (1..=180)
            .find_map(|minutes| {
                tz.from_local_datetime(&(naive + Duration::minutes(minutes)))
                    .earliest()
            })
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}
