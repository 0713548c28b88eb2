use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use tracing::warn;

use shared_config::AppConfig;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Wall-clock view of the clinic. Appointment and schedule dates/times are
/// clinic-local, so every "now" and "today" check goes through here.
#[derive(Clone)]
pub struct ClinicClock {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl ClinicClock {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { clock, offset }
    }

    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, offset_from_minutes(config.clinic_utc_offset_minutes))
    }

    pub fn system(config: &AppConfig) -> Self {
        Self::from_config(config, Arc::new(SystemClock))
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now().with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes.checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            warn!("Clinic UTC offset of {} minutes is out of range, using UTC", minutes);
            Utc.fix()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    #[test]
    fn clinic_clock_applies_offset() {
        let utc_now = Utc.with_ymd_and_hms(2030, 1, 7, 20, 30, 0).unwrap();
        let clock = Arc::new(FixedClock::new(utc_now));
        let hanoi = ClinicClock::new(clock, FixedOffset::east_opt(7 * 3600).unwrap());

        assert_eq!(hanoi.today(), NaiveDate::from_ymd_opt(2030, 1, 8).unwrap());
        assert_eq!(hanoi.now().time(), NaiveTime::from_hms_opt(3, 30, 0).unwrap());
    }

    #[test]
    fn config_offset_is_honored() {
        let utc_now = Utc.with_ymd_and_hms(2030, 1, 7, 20, 30, 0).unwrap();
        let config = AppConfig { clinic_utc_offset_minutes: 420, ..AppConfig::default() };
        let clinic = ClinicClock::from_config(&config, Arc::new(FixedClock::new(utc_now)));

        assert_eq!(clinic.offset().local_minus_utc(), 25_200);
        assert_eq!(clinic.now_utc(), utc_now);
        assert_eq!(clinic.now(), utc_now.with_timezone(&clinic.offset()).naive_local());
    }

    #[test]
    fn fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2030, 1, 7, 8, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start + Duration::hours(2));
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        assert_eq!(offset_from_minutes(100_000).local_minus_utc(), 0);
        assert_eq!(offset_from_minutes(-300).local_minus_utc(), -18_000);
    }
}
